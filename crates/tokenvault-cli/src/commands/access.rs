use anyhow::Result;
use tokenvault_auth::OAuthStore;

use crate::output::{print_json, print_success};

pub async fn get(store: &dyn OAuthStore, token: &str) -> Result<()> {
    let record = store.load_access_by_token(token).await?;
    print_json(&record)
}

pub async fn by_refresh(store: &dyn OAuthStore, refresh_token: &str) -> Result<()> {
    let record = store.load_access_by_refresh_token(refresh_token).await?;
    print_json(&record)
}

pub async fn remove(store: &dyn OAuthStore, token: &str) -> Result<()> {
    store.remove_access(token).await?;
    print_success("Removed access record");
    Ok(())
}

pub async fn invalidate_refresh(store: &dyn OAuthStore, refresh_token: &str) -> Result<()> {
    let updated = store.invalidate_refresh(refresh_token).await?;
    print_success(&format!(
        "Invalidated refresh token on {updated} record(s)"
    ));
    Ok(())
}
