use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;

mod output;
mod scan;
mod store;
mod telemetry;
mod util;
mod youtube;

#[derive(Parser)]
#[command(name = "subaudit", about = "Find subscribed channels that stopped uploading")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan (default) or, with --apply, run a resumable inactivity scan
    Scan(scan::ScanCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and SUBAUDIT_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Scan(args) => scan::run(args).await?,
    }

    Ok(())
}
