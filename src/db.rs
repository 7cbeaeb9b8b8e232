use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use tracing::debug;

pub type DbPool = SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
  #[error("Failed to create database directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("Database error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Open (creating if needed) the session database at `path` and run migrations
pub async fn initialize_db(path: &Path) -> Result<DbPool, DbError> {
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  let db_url = format!("sqlite://{}?mode=rwc", path.display());
  debug!("Opening session database at {}", path.display());

  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .connect(&db_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  Ok(pool)
}
