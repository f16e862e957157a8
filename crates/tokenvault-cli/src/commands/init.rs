use anyhow::Result;
use colored::Colorize;
use tokenvault_auth::{ACCESSES, CLIENTS, GRANTS, OAuthStorage, REFRESH_TOKEN_INDEX};

use crate::output::print_success;

/// Reports what opening the storage set up.
///
/// The work itself happens in [`OAuthStorage::open`]; by the time this runs
/// the index exists.
pub fn init(storage: &OAuthStorage, backend: &str) -> Result<()> {
    print_success(&format!(
        "Initialized database {} on {}",
        storage.database().cyan(),
        backend.cyan()
    ));
    println!("{}: {CLIENTS}, {GRANTS}, {ACCESSES}", "Collections".cyan());
    println!("{}: {REFRESH_TOKEN_INDEX} ({ACCESSES}.refreshToken, sparse)", "Index".cyan());
    Ok(())
}
