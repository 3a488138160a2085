//! warplink CLI binary entry point.

use clap::Parser;
use warplink::cli::{Cli, Commands};
use warplink::config::LinkConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match LinkConfig::from_env_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    warplink::logging::init(cli.verbosity_filter().unwrap_or(&config.log_level));

    let result = match &cli.command {
        Commands::Link(args) => warplink::cli::link::handle_link(config, args).await,
        Commands::Check(args) => warplink::cli::link::handle_check(config, args).await,
        Commands::Qr(args) => warplink::cli::link::handle_qr(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
