use clap::Parser;
use devpulse::{ApiServer, ApiServerConfig, Settings};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "devpulse")]
#[command(about = "AI-assisted triage service for code-review activity", long_about = None)]
struct Cli {
    /// Port to listen on (overrides DEVPULSE_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr so stdout stays clean for tooling
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("devpulse={}", cli.log_level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let port = cli.port.unwrap_or(settings.port);

    let config = ApiServerConfig {
        addr: SocketAddr::from(([127, 0, 0, 1], port)),
        ..Default::default()
    };

    tracing::info!("Starting devpulse on port {}", port);
    ApiServer::new(config, &settings).serve().await
}
