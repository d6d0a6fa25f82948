mod commands;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use switchos_core::{
    config::{self, AppConfig},
    FileStore, SwitchStorage,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "switchos", about = "Manage SwitchOS profiles and games")]
struct Cli {
    /// Profile to act on, by name or id (defaults to the selected profile)
    #[arg(long, short, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ContentArg {
    Url,
    Html,
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// List the games offered by the store
    List,
    /// Install a store game into the profile
    Install {
        /// Name of the game as listed
        name: String,
    },
}

#[derive(Subcommand)]
enum Commands {
    /// List profiles
    Profiles,
    /// List the games of a profile in carousel order
    Games,
    /// Create a profile holding only the store
    AddUser {
        /// Display name
        name: String,
        /// Image file used as the profile picture
        #[arg(long)]
        icon: PathBuf,
    },
    /// Build a game from its parts and print its JSON
    CreateGame {
        /// Display name
        #[arg(long)]
        name: String,
        /// Icon URL
        #[arg(long)]
        icon: String,
        /// Kind of content
        #[arg(long, value_enum, default_value = "url")]
        kind: ContentArg,
        /// Website URL or HTML markup
        #[arg(long)]
        content: String,
        /// Custom user agent
        #[arg(long)]
        user_agent: Option<String>,
        /// Also install the game into the profile
        #[arg(long)]
        install: bool,
    },
    /// Import games from a JSON file or a directory of JSON files
    Import {
        /// File or directory to read
        path: PathBuf,
    },
    /// Export the profile's games to a JSON file
    Export {
        /// Directory to write to (defaults to the configured export dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove games by id
    Remove {
        /// Ids of the games to remove
        ids: Vec<uuid::Uuid>,
    },
    /// Resolve a game the way the shell would launch it
    Launch {
        /// Name of the game
        name: String,
    },
    /// Browse the remote store
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// Erase all profiles and games and restore the default profile
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;

    info!("using data directory {}", config.data_dir.display());
    let store = Arc::new(FileStore::new(&config.data_dir));
    let storage = SwitchStorage::initialize(store);
    if let Some(selector) = cli.profile.as_deref() {
        let profile = commands::find_profile(&storage, selector)?;
        storage.select(profile.id)?;
    }

    commands::run(cli.command, &storage, &config).await
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("switchos.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
