use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use driverkit_fixtures::FixtureServer;
use driverkit_harness::HarnessConfig;

/// Serve the example pages used by DriverKit test suites
#[derive(Parser, Debug)]
#[command(name = "driverkit-fixtures")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Harness configuration file
    #[arg(short, long, default_value = "driverkit.toml")]
    config: PathBuf,

    /// Address to bind (overrides [fixtures].host)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 = auto (overrides [fixtures].port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = HarnessConfig::load(&args.config)?;
    config.apply_env_overrides()?;
    let mut fixtures = config.fixtures;
    if let Some(host) = args.host {
        fixtures.host = host;
    }
    if let Some(port) = args.port {
        fixtures.port = port;
    }

    if !fixtures.enabled {
        info!("Example page serving is disabled in {}", args.config.display());
        return Ok(());
    }

    let handle = FixtureServer::new(fixtures).start().await?;
    println!("{}", handle.base_url());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown().await?;
    Ok(())
}
