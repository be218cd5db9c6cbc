//! Feed, post, and search commands.

use super::load_image;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use devconnect_session::SessionClient;
use std::path::Path;

pub async fn feed(client: &SessionClient, format: OutputFormat) -> Result<()> {
    let posts = client.social().feed().await?;
    output::print_posts(&posts, format)
}

pub async fn post_create(
    client: &SessionClient,
    content: &str,
    image: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let image = load_image(image).await?;
    let post = client.social().create_post(content, image).await?;

    match format {
        OutputFormat::Json => output::print_json(&post),
        OutputFormat::Text => {
            output::print_success(&format!("Post #{} created", post.id), format);
            Ok(())
        }
    }
}

pub async fn post_like(client: &SessionClient, post_id: u64, format: OutputFormat) -> Result<()> {
    client.social().like_post(post_id).await?;
    output::print_success(&format!("Liked post #{}", post_id), format);
    Ok(())
}

pub async fn post_unlike(client: &SessionClient, post_id: u64, format: OutputFormat) -> Result<()> {
    client.social().unlike_post(post_id).await?;
    output::print_success(&format!("Unliked post #{}", post_id), format);
    Ok(())
}

pub async fn post_comment(
    client: &SessionClient,
    post_id: u64,
    content: &str,
    format: OutputFormat,
) -> Result<()> {
    let comment = client.social().comment_on_post(post_id, content).await?;

    match format {
        OutputFormat::Json => output::print_json(&comment),
        OutputFormat::Text => {
            output::print_success(
                &format!("Comment #{} added to post #{}", comment.id, post_id),
                format,
            );
            Ok(())
        }
    }
}

pub async fn search(client: &SessionClient, query: &str, format: OutputFormat) -> Result<()> {
    let posts = client.social().search_posts(query).await?;
    output::print_posts(&posts, format)
}
