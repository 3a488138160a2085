//! Device-code account linking against the Rotur identity API.

pub mod account;
pub mod client;
pub mod session;
pub mod status;

pub use account::Account;
pub use client::{CodeResponse, HttpLinkClient, LinkApi, UserResponse};
pub use session::{LinkSession, LinkSnapshot};
pub use status::LinkStatus;
