//! DevConnect CLI - command-line client for the DevConnect social network.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use devconnect_config::{init_logging, Config, Paths};
use devconnect_session::SessionError;
use output::OutputFormat;
use std::path::PathBuf;
use tracing::debug;

/// DevConnect CLI - log in, browse the feed, and manage your profile.
#[derive(Parser)]
#[command(name = "devconnect")]
#[command(about = "DevConnect command-line client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with username and password
    Login {
        /// Username (prompted when omitted)
        username: Option<String>,
    },

    /// Create a new account
    Register {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Logout and clear stored tokens
    Logout,

    /// Show authentication status
    Status,

    /// Show your profile
    Me,

    /// Manage your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Browse and follow users
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Show the home feed
    Feed,

    /// Create and interact with posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Search posts
    Search {
        query: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update bio and/or profile picture
    Update {
        #[arg(long)]
        bio: Option<String>,
        /// Path to a JPEG, PNG, or GIF image
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users
    List,
    /// Show a user's profile
    Show { username: String },
    /// Follow or unfollow a user
    Follow { username: String },
    /// List users you follow
    Following,
}

#[derive(Subcommand)]
enum PostCommands {
    /// Create a post
    Create {
        #[arg(short, long)]
        content: String,
        /// Path to a JPEG, PNG, or GIF image
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Like a post
    Like { id: u64 },
    /// Remove your like from a post
    Unlike { id: u64 },
    /// Comment on a post
    Comment {
        id: u64,
        content: String,
    },
}

async fn run(cli: Cli, config: &Config, paths: &Paths) -> anyhow::Result<()> {
    let client = commands::connect(config, paths).await?;
    let format = cli.format;

    let result = match cli.command {
        Commands::Login { username } => commands::login(&client, username, format).await,
        Commands::Register { username, email } => {
            commands::register(&client, username, email, format).await
        }
        Commands::Logout => commands::logout(&client, format).await,
        Commands::Status => commands::status(&client, format).await,
        Commands::Me => commands::me(&client, format).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Update { bio, image } => {
                commands::profile_update(&client, bio, image.as_deref(), format).await
            }
        },
        Commands::Users { command } => match command {
            UserCommands::List => commands::users_list(&client, format).await,
            UserCommands::Show { username } => {
                commands::users_show(&client, &username, format).await
            }
            UserCommands::Follow { username } => {
                commands::users_follow(&client, &username, format).await
            }
            UserCommands::Following => commands::users_following(&client, format).await,
        },
        Commands::Feed => commands::feed(&client, format).await,
        Commands::Post { command } => match command {
            PostCommands::Create { content, image } => {
                commands::post_create(&client, &content, image.as_deref(), format).await
            }
            PostCommands::Like { id } => commands::post_like(&client, id, format).await,
            PostCommands::Unlike { id } => commands::post_unlike(&client, id, format).await,
            PostCommands::Comment { id, content } => {
                commands::post_comment(&client, id, &content, format).await
            }
        },
        Commands::Search { query } => commands::search(&client, &query, format).await,
    };

    client.destroy();
    result
}

/// Message shown to the user for a failed command.
fn error_text(err: &anyhow::Error) -> String {
    match err.downcast_ref::<SessionError>() {
        Some(session_err) => session_err.user_message(),
        None => format!("{:#}", err),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    let paths = match Paths::new() {
        Ok(paths) => paths,
        Err(e) => {
            output::print_error(&e.to_string(), format);
            std::process::exit(1);
        }
    };
    if let Err(e) = paths.ensure_dirs() {
        output::print_error(&e.to_string(), format);
        std::process::exit(1);
    }

    let config = match Config::load(&paths) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e.to_string(), format);
            std::process::exit(1);
        }
    };

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging("cli", &level, &paths, cli.verbose);
    debug!(api = %config.api_base_url, "Configuration loaded");

    if let Err(e) = run(cli, &config, &paths).await {
        debug!(error = ?e, "Command failed");
        output::print_error(&error_text(&e), format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_post_create() {
        let cli = Cli::try_parse_from([
            "devconnect",
            "--format",
            "json",
            "post",
            "create",
            "--content",
            "hello",
            "--image",
            "cat.png",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Post {
                command: PostCommands::Create { content, image },
            } => {
                assert_eq!(content, "hello");
                assert_eq!(image, Some(PathBuf::from("cat.png")));
            }
            _ => panic!("expected post create"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["devconnect", "feed", "--log-level", "debug", "-v"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_post_comment_requires_numeric_id() {
        assert!(Cli::try_parse_from(["devconnect", "post", "comment", "abc", "hi"]).is_err());
    }

    #[test]
    fn test_error_text_uses_user_message() {
        let err = anyhow::Error::new(SessionError::NotLoggedIn);
        assert_eq!(error_text(&err), "Please log in to continue.");

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(error_text(&err), "plain failure");
    }
}
