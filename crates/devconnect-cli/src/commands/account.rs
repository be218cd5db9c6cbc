//! Account commands: login, register, logout, status, profile.

use super::{load_image, prompt, prompt_password};
use crate::output::{self, OutputFormat};
use anyhow::Result;
use devconnect_session::{ProfileUpdate, SessionClient, SessionStatus};
use std::path::Path;

/// Login with username and password.
pub async fn login(
    client: &SessionClient,
    username: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(user) = client.current_user() {
        output::print_success(&format!("Already logged in as {}", user.username), format);
        return Ok(());
    }

    let username = match username {
        Some(username) => username,
        None => prompt("Username")?,
    };
    let password = prompt_password("Password")?;

    let user = client.login(&username, &password).await?;
    output::print_success(&format!("Logged in as {}", user.username), format);
    Ok(())
}

/// Create an account. The new account still has to log in.
pub async fn register(
    client: &SessionClient,
    username: Option<String>,
    email: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt("Username")?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt("Email")?,
    };
    let password = prompt_password("Password")?;
    let confirm = prompt_password("Confirm password")?;

    let created = client.register(&username, &email, &password, &confirm).await?;
    let name = created.map(|u| u.username).unwrap_or(username);
    output::print_success(
        &format!("Account {} created. Run 'devconnect login' to sign in.", name),
        format,
    );
    Ok(())
}

pub async fn logout(client: &SessionClient, format: OutputFormat) -> Result<()> {
    client.logout();
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show session status.
pub async fn status(client: &SessionClient, format: OutputFormat) -> Result<()> {
    let snapshot = client.snapshot();

    match format {
        OutputFormat::Json => output::print_json(&snapshot)?,
        OutputFormat::Text => {
            println!("Server:   {}", client.base_url());
            match (&snapshot.status, &snapshot.current_user) {
                (SessionStatus::Authenticated, Some(user)) => {
                    println!("Auth:     logged in");
                    println!("User:     {} (id {})", user.username, user.id);
                }
                _ => println!("Auth:     not logged in"),
            }
        }
    }
    Ok(())
}

/// Re-fetch and show the logged-in user.
pub async fn me(client: &SessionClient, format: OutputFormat) -> Result<()> {
    let user = client.fetch_current_user().await?;
    output::print_profile(&user, format)
}

pub async fn profile_update(
    client: &SessionClient,
    bio: Option<String>,
    image: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut update = ProfileUpdate::default();
    if let Some(bio) = bio {
        update = update.with_bio(bio);
    }
    if let Some(image) = load_image(image).await? {
        update = update.with_image(image);
    }

    let user = client.update_profile(update).await?;
    match format {
        OutputFormat::Json => output::print_json(&user),
        OutputFormat::Text => {
            output::print_success("Profile updated", format);
            output::print_profile(&user, format)
        }
    }
}
