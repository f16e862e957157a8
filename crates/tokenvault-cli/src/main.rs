mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{AccessCommands, ClientCommands, Cli, Commands, GrantCommands};
use config::{AppConfig, Backend};
use output::print_error;
use tokenvault_auth::OAuthStorage;
use tokenvault_storage::DynDocumentStore;

#[tokio::main]
async fn main() {
    // .env is optional; only report it when it exists but cannot be read.
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let (config_path, source) = config::resolve_config_path(cli.config.as_deref());
    let mut cfg = config::load_config(&config_path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;
    if let Some(database) = &cli.database {
        cfg.database = database.clone();
    }
    if let Some(backend) = cli.backend {
        cfg.backend = backend;
    }

    observability::init_tracing(&cfg.log_level);
    info!(path = %config_path, source = %source, "Configuration loaded");

    let mut storage = open_storage(&cfg).await?;

    match &cli.command {
        Commands::Init => commands::init::init(&storage, &cfg.backend.to_string())?,
        Commands::Client(args) => match &args.command {
            ClientCommands::Get(args) => commands::client::get(&storage, &args.id).await?,
            ClientCommands::Set(args) => {
                commands::client::set(&storage, &args.id, args.file.as_deref()).await?;
            }
            ClientCommands::Remove(args) => commands::client::remove(&storage, &args.id).await?,
            ClientCommands::List(args) => {
                commands::client::list(&storage, args.filter.as_deref(), args.page_size, args.page)
                    .await?;
            }
        },
        Commands::Grant(args) => match &args.command {
            GrantCommands::Get(args) => commands::grant::get(&storage, &args.code).await?,
            GrantCommands::Remove(args) => commands::grant::remove(&storage, &args.code).await?,
        },
        Commands::Access(args) => match &args.command {
            AccessCommands::Get(args) => commands::access::get(&storage, &args.token).await?,
            AccessCommands::ByRefresh(args) => {
                commands::access::by_refresh(&storage, &args.token).await?;
            }
            AccessCommands::Remove(args) => commands::access::remove(&storage, &args.token).await?,
            AccessCommands::InvalidateRefresh(args) => {
                commands::access::invalidate_refresh(&storage, &args.token).await?;
            }
        },
    }

    storage.close();
    Ok(())
}

async fn open_storage(cfg: &AppConfig) -> Result<OAuthStorage> {
    let store: DynDocumentStore = match cfg.backend {
        Backend::Memory => tokenvault_db_memory::create_store(),
        Backend::Postgres => tokenvault_db_postgres::create_store(cfg.postgres.clone())
            .await
            .context("Failed to connect to PostgreSQL")?,
    };

    OAuthStorage::open(store, &cfg.database)
        .await
        .with_context(|| format!("Failed to open database '{}'", cfg.database))
}
