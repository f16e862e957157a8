use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use tokenvault_auth::{Client, DocumentFilter, OAuthStore};

use crate::output::{print_json, print_success};

fn read_body(file: Option<&str>) -> Result<Value> {
    let content = match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    serde_json::from_str(&content).context("Invalid JSON")
}

fn parse_filter(filter: Option<&str>) -> Result<DocumentFilter> {
    let Some(raw) = filter else {
        return Ok(DocumentFilter::new());
    };
    let value: Value = serde_json::from_str(raw).context("Invalid filter JSON")?;
    Ok(DocumentFilter::from_value(value)?)
}

pub async fn get(store: &dyn OAuthStore, id: &str) -> Result<()> {
    let client = store.get_client(id).await?;
    print_json(&client)
}

pub async fn set(store: &dyn OAuthStore, id: &str, file: Option<&str>) -> Result<()> {
    let body = read_body(file)?;
    let client: Client = serde_json::from_value(body).context("Invalid client JSON")?;
    store.set_client(id, &client).await?;
    print_success(&format!("Stored client {}", id.cyan()));
    Ok(())
}

pub async fn remove(store: &dyn OAuthStore, id: &str) -> Result<()> {
    store.remove_client(id).await?;
    print_success(&format!("Removed client {}", id.cyan()));
    Ok(())
}

pub async fn list(
    store: &dyn OAuthStore,
    filter: Option<&str>,
    page_size: u32,
    page: u32,
) -> Result<()> {
    let filter = parse_filter(filter)?;
    let clients = store.list_clients(&filter, page_size, page).await?;
    print_json(&clients)
}
