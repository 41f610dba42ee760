//! CLI entry point for chord-rs.

use chord_cli::{CliConfig, CommandResult};
use clap::Parser;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = CliConfig::parse();
    match config.run().await? {
        CommandResult::Stopped => {}
        result => println!("{}", result),
    }
    Ok(())
}
