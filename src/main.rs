// Main binary that starts the metadata server
use std::io::stderr;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

use roost_server::{run as run_server, ServerConfig};

// Define the command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Roost instance metadata service", long_about = None)]
struct Cli {
    /// Address for the HTTP listener
    #[arg(long, default_value = "169.254.169.254:80")]
    listen: SocketAddr,

    /// Base directory holding one metadata subtree per client address
    #[arg(long, default_value = "/var/lib/roost/metadata")]
    base_dir: PathBuf,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Respect RUST_LOG, fall back to verbose/info for our crates
    let default_level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "roost={level},roost_server={level},roost_metadata={level},tower_http={level},hyper=warn",
        level = default_level
    );
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry().with(filter).with(fmt::layer().with_writer(stderr)).init();

    let config = ServerConfig::new(cli.listen, cli.base_dir);
    if let Err(e) = run_server(config).await {
        error!("server failed to run: {:#}", e);
        eprintln!("Error running metadata server: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
