use clap::{Parser, Subcommand};

use crate::config::Backend;

#[derive(Parser)]
#[command(name = "tokenvault")]
#[command(about = "tokenvault - inspect and manage stored OAuth clients, grants and tokens")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: tokenvault.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Logical database to operate on (overrides config)
    #[arg(short, long, global = true, env = "TOKENVAULT_DATABASE")]
    pub database: Option<String>,

    /// Storage backend (overrides config)
    #[arg(short, long, global = true)]
    pub backend: Option<Backend>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the collections and the refresh-token index
    Init,
    /// Manage registered clients
    Client(ClientArgs),
    /// Inspect authorization grants
    Grant(GrantArgs),
    /// Inspect access/refresh records
    Access(AccessArgs),
}

#[derive(clap::Args)]
pub struct ClientArgs {
    #[command(subcommand)]
    pub command: ClientCommands,
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Show a client by id
    Get(IdArgs),
    /// Create or replace a client from JSON
    Set(SetClientArgs),
    /// Delete a client
    Remove(IdArgs),
    /// List clients page by page
    List(ListClientsArgs),
}

#[derive(clap::Args)]
pub struct IdArgs {
    /// Client id
    pub id: String,
}

#[derive(clap::Args)]
pub struct SetClientArgs {
    /// Client id
    pub id: String,
    /// Path to JSON file (reads from stdin if omitted)
    #[arg(long)]
    pub file: Option<String>,
}

#[derive(clap::Args)]
pub struct ListClientsArgs {
    /// Equality filter as a JSON object, e.g. '{"redirectUri":"https://app/cb"}'
    #[arg(long)]
    pub filter: Option<String>,
    /// Clients per page
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(clap::Args)]
pub struct GrantArgs {
    #[command(subcommand)]
    pub command: GrantCommands,
}

#[derive(Subcommand)]
pub enum GrantCommands {
    /// Show the grant issued under a code
    Get(CodeArgs),
    /// Delete the grant issued under a code
    Remove(CodeArgs),
}

#[derive(clap::Args)]
pub struct CodeArgs {
    /// Authorization code
    pub code: String,
}

#[derive(clap::Args)]
pub struct AccessArgs {
    #[command(subcommand)]
    pub command: AccessCommands,
}

#[derive(Subcommand)]
pub enum AccessCommands {
    /// Show the record for an access token
    Get(TokenArgs),
    /// Show a record carrying a refresh token
    ByRefresh(TokenArgs),
    /// Delete the record for an access token
    Remove(TokenArgs),
    /// Revoke a refresh token, keeping the access records
    InvalidateRefresh(TokenArgs),
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// Token value
    pub token: String,
}
