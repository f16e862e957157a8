use anyhow::Result;
use tokenvault_auth::OAuthStore;

use crate::output::{print_json, print_success};

pub async fn get(store: &dyn OAuthStore, code: &str) -> Result<()> {
    let grant = store.load_grant(code).await?;
    print_json(&grant)
}

pub async fn remove(store: &dyn OAuthStore, code: &str) -> Result<()> {
    store.remove_grant(code).await?;
    print_success("Removed grant");
    Ok(())
}
