use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::db::{initialize_db, DbPool};
use crate::garmin::{login, refresh_session, GarminClient, GarminConfig, GarminError, GarminSession};
use crate::models::SyncState;

/// ---------------------------------------------------------------------------
/// Connect
/// ---------------------------------------------------------------------------

/// Open the session database and return an authenticated client
pub async fn open(config: &GarminConfig) -> anyhow::Result<(DbPool, GarminClient)> {
  let db = initialize_db(&config.session_db).await?;
  let client = connect(config, &db, prompt_mfa_code).await?;
  Ok((db, client))
}

/// Authenticated client, reusing the cached session where possible.
///
/// A cached session close to expiry is refreshed. A cached session the
/// server rejects is discarded and a fresh sign-in runs, once.
pub async fn connect<F>(config: &GarminConfig, db: &DbPool, prompt_mfa: F) -> Result<GarminClient, GarminError>
where
  F: FnOnce() -> Result<String, GarminError>,
{
  let mut prompt_mfa = Some(prompt_mfa);

  let cached = match load_session(db).await? {
    Some(session) if session.needs_refresh() => match refresh_session(config, &session.refresh_token).await {
      Ok(refreshed) => {
        save_session(db, &refreshed).await?;
        debug!("Garmin session refreshed");
        Some(refreshed)
      }
      Err(e) => {
        warn!("Session refresh failed, signing in again: {}", e);
        None
      }
    },
    other => other,
  };

  let (session, fresh) = match cached {
    Some(session) => (session, false),
    None => (sign_in(config, db, take_prompt(&mut prompt_mfa)).await?, true),
  };

  let client = GarminClient::new(&config.api_url, &session.access_token)?;
  match client.get_profile().await {
    Ok(profile) => {
      info!(
        "Connected to Garmin Connect as {}",
        profile.display_name.or(profile.full_name).unwrap_or_default()
      );
      Ok(client)
    }
    Err(GarminError::NotAuthenticated) if !fresh => {
      warn!("Cached Garmin session was rejected, signing in again");
      clear_session(db).await?;
      let session = sign_in(config, db, take_prompt(&mut prompt_mfa)).await?;
      let client = GarminClient::new(&config.api_url, &session.access_token)?;
      client.get_profile().await?;
      Ok(client)
    }
    Err(e) => Err(e),
  }
}

/// The MFA prompt can be asked for at most once per connect
fn take_prompt<F>(prompt: &mut Option<F>) -> impl FnOnce() -> Result<String, GarminError>
where
  F: FnOnce() -> Result<String, GarminError>,
{
  let prompt = prompt.take();
  move || match prompt {
    Some(prompt) => prompt(),
    None => Err(GarminError::Auth("MFA code already requested".into())),
  }
}

async fn sign_in<F>(config: &GarminConfig, db: &DbPool, prompt_mfa: F) -> Result<GarminSession, GarminError>
where
  F: FnOnce() -> Result<String, GarminError>,
{
  info!("Signing in to Garmin Connect as {}", config.email);
  let session = login(config, prompt_mfa).await?;
  save_session(db, &session).await?;
  Ok(session)
}

/// Ask for the one-time code on the terminal
pub fn prompt_mfa_code() -> Result<String, GarminError> {
  print!("Enter Garmin MFA code: ");
  io::stdout().flush().map_err(|e| GarminError::Auth(e.to_string()))?;

  let mut code = String::new();
  io::stdin()
    .lock()
    .read_line(&mut code)
    .map_err(|e| GarminError::Auth(format!("could not read MFA code: {}", e)))?;

  let code = code.trim();
  if code.is_empty() {
    return Err(GarminError::Auth("no MFA code entered".into()));
  }
  Ok(code.to_string())
}

/// ---------------------------------------------------------------------------
/// Logout
/// ---------------------------------------------------------------------------

pub async fn logout(session_db: &Path) -> anyhow::Result<bool> {
  let db = initialize_db(session_db).await?;
  clear_session(&db).await?;
  db.close().await;

  println!("Garmin session cleared");
  Ok(true)
}

/// ---------------------------------------------------------------------------
/// Database Helpers
/// ---------------------------------------------------------------------------

pub async fn save_session(db: &DbPool, session: &GarminSession) -> Result<(), GarminError> {
  sqlx::query(
    r#"
    INSERT INTO sync_state (source, access_token, refresh_token, token_expires_at)
    VALUES ('garmin', ?1, ?2, ?3)
    ON CONFLICT(source) DO UPDATE SET
      access_token = excluded.access_token,
      refresh_token = excluded.refresh_token,
      token_expires_at = excluded.token_expires_at
    "#,
  )
  .bind(&session.access_token)
  .bind(&session.refresh_token)
  .bind(session.expires_at)
  .execute(db)
  .await
  .map_err(|e| GarminError::Database(e.to_string()))?;

  Ok(())
}

pub async fn load_session(db: &DbPool) -> Result<Option<GarminSession>, GarminError> {
  let state: Option<SyncState> = sqlx::query_as("SELECT * FROM sync_state WHERE source = 'garmin'")
    .fetch_optional(db)
    .await
    .map_err(|e| GarminError::Database(e.to_string()))?;

  // A row may exist with only last_sync_at after a logout
  match state {
    Some(SyncState {
      access_token: Some(access_token),
      refresh_token: Some(refresh_token),
      token_expires_at: Some(expires_at),
      ..
    }) => Ok(Some(GarminSession { access_token, refresh_token, expires_at })),
    _ => Ok(None),
  }
}

pub async fn clear_session(db: &DbPool) -> Result<(), GarminError> {
  sqlx::query(
    "UPDATE sync_state SET access_token = NULL, refresh_token = NULL,
     token_expires_at = NULL WHERE source = 'garmin'",
  )
  .execute(db)
  .await
  .map_err(|e| GarminError::Database(e.to_string()))?;

  Ok(())
}

/// Stamp the end of a remote batch operation
pub async fn update_sync_time(db: &DbPool) -> Result<(), GarminError> {
  sqlx::query(
    r#"
    INSERT INTO sync_state (source, last_sync_at) VALUES ('garmin', CURRENT_TIMESTAMP)
    ON CONFLICT(source) DO UPDATE SET last_sync_at = excluded.last_sync_at
    "#,
  )
  .execute(db)
  .await
  .map_err(|e| GarminError::Database(e.to_string()))?;

  Ok(())
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
