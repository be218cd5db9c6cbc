//! User directory and follow commands.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use devconnect_session::{FollowStatus, SessionClient};

pub async fn users_list(client: &SessionClient, format: OutputFormat) -> Result<()> {
    let users = client.social().list_users().await?;
    output::print_users(&users, format)
}

pub async fn users_show(client: &SessionClient, username: &str, format: OutputFormat) -> Result<()> {
    let user = client.social().get_profile(username).await?;
    output::print_profile(&user, format)
}

/// Follow or unfollow `username`, whichever applies.
pub async fn users_follow(
    client: &SessionClient,
    username: &str,
    format: OutputFormat,
) -> Result<()> {
    let social = client.social();
    let target = social.get_profile(username).await?;
    let result = social.toggle_follow(target.id).await?;

    match format {
        OutputFormat::Json => output::print_json(&result),
        OutputFormat::Text => {
            let verb = match result.status {
                FollowStatus::Followed => "Now following",
                FollowStatus::Unfollowed => "Unfollowed",
            };
            println!("{} {}", verb, target.username);
            output::print_row("Their followers", &result.followers_count.to_string());
            output::print_row("You follow", &result.following_count.to_string());
            Ok(())
        }
    }
}

pub async fn users_following(client: &SessionClient, format: OutputFormat) -> Result<()> {
    let users = client.social().following().await?;
    output::print_users(&users, format)
}
