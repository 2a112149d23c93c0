//! ballot-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the JSON API under `/api`.
//!
//! # First admin
//!
//! Sign-up only ever creates voters. To create the first admin account, run
//! once with `--bootstrap-admin` and type the password on stdin:
//!
//! ```text
//! ballot-server --bootstrap-admin admin@example.com --name "Returning Officer"
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use ballot_api::AppState;
use ballot_bus::{Bus, password::hash_password};
use ballot_core::{
  store::UserRepository,
  user::{NewUser, Role},
};
use ballot_server::ServerConfig;
use ballot_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Ballot voting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an admin account with this email, reading its password from
  /// stdin, and exit.
  #[arg(long, value_name = "EMAIL")]
  bootstrap_admin: Option<String>,

  /// Display name for `--bootstrap-admin`.
  #[arg(long, default_value = "Administrator", requires = "bootstrap_admin")]
  name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(config::Environment::with_prefix("BALLOT"))
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.database_path);
  if let Some(dir) = store_path.parent()
    && !dir.as_os_str().is_empty()
  {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(email) = cli.bootstrap_admin {
    return bootstrap_admin(&store, cli.name, email).await;
  }

  let state = AppState::new(Arc::new(Bus::new(store)));
  let app = ballot_server::app(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn bootstrap_admin(store: &SqliteStore, name: String, email: String) -> anyhow::Result<()> {
  let password = read_password()?;
  anyhow::ensure!(!password.is_empty(), "password must not be empty");

  let password_hash = hash_password(&password)?;
  let user = store
    .create_user(NewUser {
      name,
      email: email.clone(),
      role: Role::Admin,
      password_hash: Some(password_hash),
    })
    .await
    .with_context(|| format!("failed to create admin {email}"))?;

  tracing::info!(user_id = %user.user_id, email = %user.email, "admin created");
  Ok(())
}

/// Read one line from stdin without its line ending.
fn read_password() -> anyhow::Result<String> {
  use std::io::{BufRead as _, Write as _};
  eprint!("Password for the new admin: ");
  std::io::stderr().flush().ok();
  let mut line = String::new();
  std::io::stdin()
    .lock()
    .read_line(&mut line)
    .context("failed to read password from stdin")?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// `~/x` resolves against `$HOME`; anything else is used as given.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
