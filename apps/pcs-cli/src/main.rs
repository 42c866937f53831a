//! `pcs` command-line entry point.

mod adapter;
mod app;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pcs_client::{SortBy, SortOrder};
use pcs_protocol::OnDuplicate;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcs")]
#[command(about = "Command-line client for PCS cloud storage")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(long, global = true, env = "PCS_CONFIG")]
    config: Option<PathBuf>,

    /// Access token (overrides the configuration file)
    #[arg(long, global = true, env = "PCS_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show space quota
    Info,
    /// Upload a local file
    Upload {
        /// Local file, or `-` for stdin
        local: PathBuf,
        /// Absolute remote path
        remote: String,
        /// What to do when the remote path exists: fail, overwrite, rename
        #[arg(long, default_value_t = OnDuplicate::Fail)]
        on_duplicate: OnDuplicate,
        /// Maximum chunk size in bytes
        #[arg(long)]
        chunk_size: Option<u64>,
        /// Chunk uploads in flight
        #[arg(long)]
        concurrency: Option<usize>,
        /// Skip the rapid upload attempt
        #[arg(long)]
        no_rapid: bool,
        /// Stream stdin of this many bytes instead of buffering it
        #[arg(long)]
        size: Option<u64>,
    },
    /// Download a remote file
    Download {
        remote: String,
        local: PathBuf,
        /// Byte range, `start-` or `start-end` (inclusive)
        #[arg(long)]
        range: Option<String>,
    },
    /// Show metadata of a file or directory
    Meta { remote: String },
    /// List a directory
    Ls {
        remote: String,
        #[arg(long, value_enum)]
        by: Option<SortKey>,
        #[arg(long, value_enum)]
        order: Option<Order>,
    },
    /// Create a directory
    Mkdir { remote: String },
    /// Delete a file or directory
    Rm { remote: String },
    /// Exchange the refresh token for a new access token and save it
    Refresh {
        #[arg(long, env = "PCS_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,
        #[arg(long, env = "PCS_CLIENT_ID")]
        client_id: Option<String>,
        #[arg(long, env = "PCS_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
        /// Space-separated scopes
        #[arg(long)]
        scope: Option<String>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(crate) enum SortKey {
    Name,
    Time,
    Size,
}

impl From<SortKey> for SortBy {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Name => SortBy::Name,
            SortKey::Time => SortBy::Time,
            SortKey::Size => SortBy::Size,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(crate) enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(token) = cli.token {
        config.access_token = token;
    }

    let ctx = app::Context {
        config,
        config_path: cli.config,
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli.command, ctx))
}
