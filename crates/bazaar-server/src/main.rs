//! Bazaar - multi-vendor marketplace API server.
//!
//! Commands:
//! - `bazaar serve` - Run the HTTP API
//! - `bazaar create-admin` - Create or promote an admin account

use anyhow::{Context, Result};
use bazaar_auth::Registration;
use bazaar_server::config::Config;
use bazaar_server::state::AppState;
use bazaar_server::{serve, telemetry};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

/// Bazaar - multi-vendor marketplace API server
#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file path (defaults to ./bazaar.toml when present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Create an admin account, or promote an existing one
    CreateAdmin(CreateAdminArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::resolve(cli.config.as_deref())?;
    telemetry::init(config.logging.format);

    match cli.command {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            serve(AppState::new(config).await?).await
        }
        Commands::CreateAdmin(args) => {
            if config.database.data_dir.is_none() {
                warn!("No data directory configured; the admin account will not persist");
            }
            let state = AppState::new(config).await?;
            let admin = state
                .users
                .ensure_admin(Registration {
                    name: args.name,
                    email: args.email,
                    password: args.password,
                })
                .await
                .context("Failed to create admin")?;
            info!(user = %admin.id, email = %admin.email, "Admin account ready");
            Ok(())
        }
    }
}
