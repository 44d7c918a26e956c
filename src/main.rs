//! Minicord CLI - terminal client for the Minicord chat server
//!
//! Direct messages, group conversations and friend requests over the
//! Minicord REST API, from the command line or a full-screen TUI.

mod api;
mod auth;
mod config;
mod feed;
mod models;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minicord")]
#[command(about = "Terminal client for Minicord chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        username: String,

        /// Password (otherwise $MINICORD_PASSWORD or a prompt)
        #[arg(short, long)]
        password: Option<String>,

        /// Log in again even if a valid session exists
        #[arg(short, long)]
        force: bool,
    },

    /// Create an account and log in
    Signup {
        username: String,

        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear cached credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Check whether a username is still available
    CheckUsername { username: String },

    /// Show the logged-in user
    Whoami,

    /// Look up a user by id (or by username with --name)
    User {
        key: String,

        #[arg(short, long)]
        name: bool,
    },

    /// Profile pictures
    #[command(subcommand)]
    Avatar(AvatarCommand),

    /// List conversations
    Conversations {
        /// Maximum number of conversations to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Inspect and manage a conversation
    #[command(subcommand)]
    Conversation(ConversationCommand),

    /// Read one page of messages
    Read {
        conversation_id: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Only messages older than this message id
        #[arg(long, conflicts_with = "after")]
        before: Option<String>,

        /// Only messages newer than this message id
        #[arg(long)]
        after: Option<String>,
    },

    /// Show a single message
    Message {
        conversation_id: String,
        message_id: String,
    },

    /// Send a message
    Send {
        /// Conversation id
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,
    },

    /// Print new messages as they arrive until Ctrl-C
    Watch { conversation_id: String },

    /// List friends and pending requests
    Friends,

    /// Manage friends and friend requests
    #[command(subcommand)]
    Friend(FriendCommand),

    /// List pending friend requests
    Requests {
        /// Keep polling and reprint on change
        #[arg(short, long)]
        watch: bool,
    },

    /// Launch the terminal user interface
    Tui,
}

#[derive(Subcommand)]
enum AvatarCommand {
    /// Upload a new profile picture
    Upload { file: PathBuf },

    /// Save a user's profile picture to a file
    Download {
        key: String,

        #[arg(short, long)]
        name: bool,

        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConversationCommand {
    /// Show details and members
    Show { id: String },

    /// Create a conversation with the given usernames
    Create {
        #[arg(required = true)]
        usernames: Vec<String>,

        /// Create a group instead of a direct message
        #[arg(short, long)]
        group: bool,

        #[arg(short, long)]
        title: Option<String>,
    },

    /// Change a group's title
    Rename { id: String, title: String },

    /// List members
    Members { id: String },

    AddMember { id: String, username: String },

    RemoveMember { id: String, username: String },

    /// Open (or create) the direct message with a user
    Dm { username: String },
}

#[derive(Subcommand)]
enum FriendCommand {
    /// Send a friend request
    Add { username: String },

    /// Accept a pending request
    Accept { request_id: String },

    /// Reject a pending request
    Reject { request_id: String },

    /// Remove a friend
    Remove { relation_id: String },
}

/// Log to stderr, or into `capture` while the TUI owns the terminal.
fn init_logging(verbose: bool, capture: Option<tui::LogBuffer>) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    match capture {
        Some(logs) => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .without_time()
                    .with_writer(logs),
            )
            .init(),
        None => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logs = tui::LogBuffer::new();
    let capture = matches!(cli.command, Commands::Tui).then(|| logs.clone());
    init_logging(cli.verbose, capture);

    match cli.command {
        Commands::Login {
            username,
            password,
            force,
        } => {
            auth::login(&username, password, force).await?;
        }
        Commands::Signup { username, password } => {
            auth::signup(&username, password).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::CheckUsername { username } => {
            auth::check_username(&username).await?;
        }
        Commands::Whoami => {
            api::users::whoami().await?;
        }
        Commands::User { key, name } => {
            api::users::show_user(&key, name).await?;
        }
        Commands::Avatar(AvatarCommand::Upload { file }) => {
            api::users::upload_avatar(&file).await?;
        }
        Commands::Avatar(AvatarCommand::Download { key, name, out }) => {
            api::users::download_avatar(&key, name, &out).await?;
        }
        Commands::Conversations { limit } => {
            tracing::info!("Fetching conversations...");
            api::conversations::list_conversations(limit).await?;
        }
        Commands::Conversation(cmd) => match cmd {
            ConversationCommand::Show { id } => {
                api::conversations::show_conversation(&id).await?;
            }
            ConversationCommand::Create {
                usernames,
                group,
                title,
            } => {
                api::conversations::create_conversation(group, &usernames, title.as_deref())
                    .await?;
            }
            ConversationCommand::Rename { id, title } => {
                api::conversations::rename_conversation(&id, &title).await?;
            }
            ConversationCommand::Members { id } => {
                api::conversations::list_members(&id).await?;
            }
            ConversationCommand::AddMember { id, username } => {
                api::conversations::add_member(&id, &username).await?;
            }
            ConversationCommand::RemoveMember { id, username } => {
                api::conversations::remove_member(&id, &username).await?;
            }
            ConversationCommand::Dm { username } => {
                api::conversations::open_dm(&username).await?;
            }
        },
        Commands::Read {
            conversation_id,
            limit,
            before,
            after,
        } => {
            api::messages::read_messages(&conversation_id, limit, before, after).await?;
        }
        Commands::Message {
            conversation_id,
            message_id,
        } => {
            api::messages::show_message(&conversation_id, &message_id).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            api::messages::send_message(&to, &message).await?;
        }
        Commands::Watch { conversation_id } => {
            api::messages::watch(&conversation_id).await?;
        }
        Commands::Friends => {
            api::friends::list_friends().await?;
        }
        Commands::Friend(cmd) => match cmd {
            FriendCommand::Add { username } => api::friends::add_friend(&username).await?,
            FriendCommand::Accept { request_id } => {
                api::friends::accept_request(&request_id).await?
            }
            FriendCommand::Reject { request_id } => {
                api::friends::delete_relation(&request_id, "reject").await?
            }
            FriendCommand::Remove { relation_id } => {
                api::friends::delete_relation(&relation_id, "remove").await?
            }
        },
        Commands::Requests { watch } => {
            api::friends::list_requests(watch).await?;
        }
        Commands::Tui => {
            tui::run(logs).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_rejects_before_and_after() {
        let parsed = Cli::try_parse_from(["minicord", "read", "c1", "--before", "m1", "--after", "m2"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_conversation_create_parses() {
        let cli = Cli::try_parse_from([
            "minicord", "conversation", "create", "alice", "bob", "--group", "--title", "Team",
        ])
        .unwrap();
        match cli.command {
            Commands::Conversation(ConversationCommand::Create {
                usernames,
                group,
                title,
            }) => {
                assert_eq!(usernames, vec!["alice", "bob"]);
                assert!(group);
                assert_eq!(title.as_deref(), Some("Team"));
            }
            _ => panic!("wrong subcommand"),
        }
    }
}
