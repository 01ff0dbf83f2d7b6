//! Vigil Server Binary
//!
//! Runs the authentication and RBAC service: configuration loading,
//! database setup and the REST API behind one process.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use vigil_config::{ConfigLoader, VigilConfig};
use vigil_server::Server;

#[derive(Parser)]
#[command(name = "vigil", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Print a sample configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Print the OpenAPI document and exit
    #[arg(long)]
    print_openapi: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Print default configuration if requested
    if cli.print_config {
        print!("{}", VigilConfig::generate_sample());
        return Ok(());
    }

    if cli.print_openapi {
        println!("{}", serde_json::to_string_pretty(&vigil_rest_api::openapi_spec())?);
        return Ok(());
    }

    // Load configuration; validation failures abort startup here.
    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli);

    // Create and start server
    let server = Server::new(config).await?;
    server.start().await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut VigilConfig, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
}
