//! Output formatting for the CLI.

use clap::ValueEnum;
use devconnect_session::{Post, UserProfile};
use serde::Serialize;
use serde_json::json;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "success", "message": message }));
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!("{}", json!({ "status": "error", "message": message }));
        }
    }
}

/// Print a labelled row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

/// Print a full profile.
pub fn print_profile(user: &UserProfile, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(user);
    }

    print_heading(&format!("@{}", user.username));
    print_row("ID", &user.id.to_string());
    if !user.email.is_empty() {
        print_row("Email", &user.email);
    }
    print_row("Bio", user.bio.as_deref().unwrap_or("-"));
    print_row("Location", user.location.as_deref().unwrap_or("-"));
    if let Some(birth_date) = user.birth_date {
        print_row("Born", &birth_date.to_string());
    }
    print_row("Picture", user.profile_picture_url.as_deref().unwrap_or("-"));
    print_row("Followers", &user.followers_count.to_string());
    print_row("Following", &user.following_count.to_string());
    if user.is_followed_by_viewer {
        print_row("Followed", "yes");
    }
    Ok(())
}

/// Print a list of users as a table.
pub fn print_users(users: &[UserProfile], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(users);
    }

    if users.is_empty() {
        println!("No users found");
        return Ok(());
    }

    println!(
        "{:<8} {:<24} {:>10} {:>10} {}",
        "ID", "Username", "Followers", "Following", "Followed"
    );
    println!("{}", "-".repeat(66));
    for user in users {
        println!(
            "{:<8} {:<24} {:>10} {:>10} {}",
            user.id,
            user.username,
            user.followers_count,
            user.following_count,
            if user.is_followed_by_viewer { "yes" } else { "" }
        );
    }
    Ok(())
}

/// Print posts, newest first as the server returns them.
pub fn print_posts(posts: &[Post], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        return print_json(posts);
    }

    if posts.is_empty() {
        println!("No posts found");
        return Ok(());
    }

    for post in posts {
        println!(
            "#{} @{}  {}  ({} likes)",
            post.id,
            post.author,
            post.created_at.format("%Y-%m-%d %H:%M"),
            post.likes_count
        );
        println!("  {}", post.content);
        if let Some(image) = &post.image {
            println!("  [image] {}", image);
        }
        println!();
    }
    Ok(())
}
