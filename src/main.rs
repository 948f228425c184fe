use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod dashboard;
mod error;
mod library;
mod metadata;
mod places;
mod server;
mod sqlite_persistence;
mod user;

use config::{AppConfig, CliConfig, FileConfig};
use library::SqliteLibraryStore;
use places::SqlitePlaceStore;
use server::{run_server, RequestsLoggingLevel};
use user::{SqliteUserStore, UserManager, UserRole};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the SQLite database files.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Its values override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Grant the admin role to this username and exit.
    #[clap(long)]
    pub promote_admin: Option<String>,

    /// Number of days to retain unused auth tokens before pruning.
    /// Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub token_retention_days: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let file_config = cli_args.config.as_deref().map(FileConfig::load).transpose()?;
    let cli_config = CliConfig {
        db_dir: cli_args.db_dir,
        port: cli_args.port,
        logging_level: cli_args.logging_level,
        frontend_dir_path: cli_args.frontend_dir_path,
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening SQLite databases in {:?}...", app_config.db_dir);
    let library_store = Arc::new(SqliteLibraryStore::new(app_config.library_db_path())?);
    let user_store = Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let place_store = Arc::new(SqlitePlaceStore::new(app_config.places_db_path())?);

    if let Some(username) = cli_args.promote_admin {
        return promote_admin(user_store, &username);
    }

    if cli_args.token_retention_days > 0 {
        let retention_days = cli_args.token_retention_days;
        let pruning_store = user_store.clone();

        info!("Auth token pruning enabled: retaining {} days", retention_days);

        tokio::spawn(async move {
            let manager = UserManager::new(pruning_store);
            let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));

            // Skip the first immediate tick, wait for the first interval
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match manager.prune_unused_auth_tokens(retention_days) {
                    Ok(count) => {
                        if count > 0 {
                            info!("Pruned {} unused auth tokens", count);
                        }
                    }
                    Err(e) => {
                        error!("Failed to prune auth tokens: {}", e);
                    }
                }
            }
        });
    }

    info!("Ready to serve at port {}!", app_config.port);
    run_server(
        library_store,
        user_store,
        place_store,
        app_config.server_config(),
    )
    .await
}

fn promote_admin(user_store: Arc<SqliteUserStore>, username: &str) -> Result<()> {
    use user::UserStore;
    let user = user_store
        .get_user_by_username(username)?
        .with_context(|| format!("No user named {}", username))?;
    let manager = UserManager::new(user_store);
    manager.add_role(user.id, UserRole::Admin)?;
    info!("Granted admin role to {}", username);
    Ok(())
}
