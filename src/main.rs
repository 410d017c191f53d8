use clap::Parser;
use splitopt::{CancellationToken, Cli};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.verbosity.as_filter().to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling solve");
            interrupt.cancel();
        }
    });

    if let Err(e) = splitopt::run(cli, cancel).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}
