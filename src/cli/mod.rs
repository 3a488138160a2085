//! CLI entry point for warplink.

pub mod link;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::plugin::args::DEFAULT_QR_TEXT;

/// Rotur account linking CLI
#[derive(Parser, Debug)]
#[command(name = "warplink", version, about = "Link a Rotur account with a device code")]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request a link code and wait until it is redeemed
    Link(LinkArgs),
    /// Check an existing link code once
    Check(CheckArgs),
    /// Print a QR code for some text
    Qr(QrArgs),
}

/// Arguments for `warplink link`.
#[derive(Parser, Debug)]
pub struct LinkArgs {
    /// Seconds to wait for the code to be redeemed
    #[arg(short, long, default_value_t = 300)]
    pub timeout: u64,

    /// Do not print the QR code
    #[arg(long)]
    pub no_qr: bool,

    /// Page the QR code points at
    #[arg(long, default_value = DEFAULT_QR_TEXT)]
    pub link_page: String,
}

/// Arguments for `warplink check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Link code to check
    pub code: String,
}

/// Arguments for `warplink qr`.
#[derive(Parser, Debug)]
pub struct QrArgs {
    /// Text to encode
    pub text: String,
}

impl Cli {
    /// Log filter implied by `-v` flags, if any.
    pub fn verbosity_filter(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("warplink=debug"),
            _ => Some("warplink=trace"),
        }
    }
}
