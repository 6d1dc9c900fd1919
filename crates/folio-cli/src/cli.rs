use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Keep a local portfolio content cache in sync with the content API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_path: Option<PathBuf>,

    /// Content API base URL (overrides FOLIO_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one reconciliation cycle against the content API
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Poll the content API until interrupted and report changes
    Watch,
    /// Print the cached portfolio
    Show {
        /// Output the full document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or maintain the local cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Manage cached contact messages
    #[command(alias = "msg")]
    Messages {
        #[command(subcommand)]
        command: MessageCommands,
    },
    /// Sign in as the portfolio admin
    Login {
        /// Admin email
        #[arg(long)]
        email: String,
        /// Admin password
        #[arg(long)]
        password: String,
    },
    /// Forget the stored admin session
    Logout,
    /// Publish a portfolio document and write it through to the cache
    Publish {
        /// JSON document to publish
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show freshness markers
    Markers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the cached snapshot and its timestamps
    Clear,
    /// Run the one-time cache migration if it is pending
    Migrate,
}

#[derive(Subcommand)]
pub enum MessageCommands {
    /// List contact messages
    List {
        /// Only show unread messages
        #[arg(long)]
        unread: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a contact message locally
    Add {
        /// Sender name
        #[arg(long)]
        name: String,
        /// Sender email
        #[arg(long)]
        email: String,
        /// Optional subject line
        #[arg(long)]
        subject: Option<String>,
        /// Message body
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Mark a message as read
    Read {
        /// Message id, or `#N` for the N-th message
        key: String,
    },
    /// Delete a message
    Delete {
        /// Message id, or `#N` for the N-th message
        key: String,
    },
}
