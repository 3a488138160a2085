//! warplink — Rotur device-code account linking
//!
//! Requests a short link code from the Rotur identity API, polls until the
//! user redeems it on another device, then fetches the linked account. A QR
//! code for the link page can be shown through a host-provided overlay.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use warplink::prelude::*;
//!
//! # async fn example() -> warplink::error::Result<()> {
//! let session = LinkSession::from_config(LinkConfig::from_env()?)?;
//! session.request_code().await;
//! println!("code: {}", session.code());
//! session.wait_until_linked(Duration::from_secs(300)).await?;
//! println!("hello, {}", session.username());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod overlay;
pub mod plugin;
pub mod prelude;
pub mod qr;

#[cfg(feature = "cli")]
pub mod cli;
