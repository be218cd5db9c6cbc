//! CLI command implementations.

mod account;
mod posts;
mod users;

pub use account::{login, logout, me, profile_update, register, status};
pub use posts::{feed, post_comment, post_create, post_like, post_unlike, search};
pub use users::{users_follow, users_following, users_list, users_show};

use anyhow::{Context, Result};
use devconnect_config::{Config, Paths};
use devconnect_session::{ImageUpload, SessionClient};
use devconnect_storage::create_file_vault;
use std::io::{self, Write};
use std::path::Path;

/// Build the session client and restore any stored session.
pub async fn connect(config: &Config, paths: &Paths) -> Result<SessionClient> {
    let vault = create_file_vault(&paths.tokens_file())
        .with_context(|| format!("opening token store {}", paths.tokens_file().display()))?;
    Ok(SessionClient::create(config, vault).await?)
}

/// Prompt for a line of input on stdout.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Prompt for a password without echo.
fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", label))?)
}

async fn load_image(path: Option<&Path>) -> Result<Option<ImageUpload>> {
    match path {
        Some(path) => Ok(Some(ImageUpload::from_path(path).await?)),
        None => Ok(None),
    }
}
