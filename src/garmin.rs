//! Garmin Connect integration
//!
//! Session acquisition (SSO sign-in with optional MFA, ticket exchange,
//! refresh) and the workout-service endpoints the sync needs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use directories::BaseDirs;
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::models::{RemoteId, RemoteWorkout};
use crate::payload::WorkoutPayload;
use crate::sync::WorkoutApi;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_SSO_URL: &str = "https://sso.garmin.com";
const DEFAULT_API_URL: &str = "https://connectapi.garmin.com";
const USER_AGENT: &str = "GCM-iOS-5.7.2.1";
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 5;
const WORKOUT_LIST_LIMIT: u32 = 1000;
const SESSION_DB_FILE: &str = "plan-sync.db";

/// ---------------------------------------------------------------------------
/// Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GarminConfig {
  pub email: String,
  pub password: String,
  pub sso_url: String,
  pub api_url: String,
  pub session_db: PathBuf,
}

impl GarminConfig {
  pub fn from_env() -> Result<Self, GarminError> {
    Ok(Self {
      email: env::var("GARMIN_EMAIL").map_err(|_| GarminError::MissingConfig("GARMIN_EMAIL".into()))?,
      password: env::var("GARMIN_PASSWORD")
        .map_err(|_| GarminError::MissingConfig("GARMIN_PASSWORD".into()))?,
      sso_url: env::var("GARMIN_SSO_URL").unwrap_or_else(|_| DEFAULT_SSO_URL.to_string()),
      api_url: env::var("GARMIN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
      session_db: session_db_from_env()?,
    })
  }
}

/// Session database location; needs no credentials
pub fn session_db_from_env() -> Result<PathBuf, GarminError> {
  match env::var("GARMIN_SESSION_DB") {
    Ok(path) => Ok(PathBuf::from(path)),
    Err(_) => default_session_db(),
  }
}

/// `<home>/.garminconnect/plan-sync.db`
fn default_session_db() -> Result<PathBuf, GarminError> {
  let dirs = BaseDirs::new().ok_or_else(|| GarminError::MissingConfig("home directory".into()))?;
  Ok(dirs.home_dir().join(".garminconnect").join(SESSION_DB_FILE))
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GarminError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Authentication failed: {0}")]
  Auth(String),

  #[error("Garmin API error {status}: {message}")]
  Api { status: u16, message: String },

  #[error("Database error: {0}")]
  Database(String),

  #[error("Not authenticated with Garmin Connect")]
  NotAuthenticated,

  #[error("Unexpected response: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Session Tokens
/// ---------------------------------------------------------------------------

/// Response from the OAuth2 exchange endpoint
#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_in: i64, // seconds
  #[serde(default)]
  pub token_type: Option<String>,
}

/// Cached session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarminSession {
  pub access_token: String,
  pub refresh_token: String,
  pub expires_at: DateTime<Utc>,
}

impl GarminSession {
  pub fn from_response(resp: TokenResponse) -> Self {
    Self {
      access_token: resp.access_token,
      refresh_token: resp.refresh_token,
      expires_at: Utc::now() + Duration::seconds(resp.expires_in),
    }
  }

  pub fn needs_refresh(&self) -> bool {
    let buffer = Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES);
    Utc::now() + buffer >= self.expires_at
  }
}

/// ---------------------------------------------------------------------------
/// SSO Sign-in
/// ---------------------------------------------------------------------------

fn sso_client() -> Result<Client, GarminError> {
  Ok(Client::builder().cookie_store(true).user_agent(USER_AGENT).build()?)
}

/// Sign-in page URL with the embed-widget parameters the SSO service expects
fn sso_url(config: &GarminConfig, path: &str) -> Result<Url, GarminError> {
  let base = config.sso_url.trim_end_matches('/');
  let embed = format!("{}/sso/embed", base);
  let mut url = Url::parse(&format!("{}{}", base, path)).map_err(|e| GarminError::Auth(e.to_string()))?;

  url
    .query_pairs_mut()
    .append_pair("id", "gauth-widget")
    .append_pair("embedWidget", "true")
    .append_pair("gauthHost", &embed)
    .append_pair("service", &embed)
    .append_pair("source", &embed)
    .append_pair("redirectAfterAccountLoginUrl", &embed)
    .append_pair("redirectAfterAccountCreationUrl", &embed);

  Ok(url)
}

/// Full sign-in: CSRF token, credentials, optional MFA code, ticket exchange.
///
/// `prompt_mfa` is only called when the account asks for a one-time code.
pub async fn login<F>(config: &GarminConfig, prompt_mfa: F) -> Result<GarminSession, GarminError>
where
  F: FnOnce() -> Result<String, GarminError>,
{
  let client = sso_client()?;
  let signin_url = sso_url(config, "/sso/signin")?;

  let page = read_page(client.get(signin_url.clone())).await?;
  let csrf = extract_csrf(&page).ok_or_else(|| GarminError::Auth("sign-in page has no CSRF token".into()))?;

  let mut page = read_page(client.post(signin_url).form(&[
    ("username", config.email.as_str()),
    ("password", config.password.as_str()),
    ("embed", "true"),
    ("_csrf", csrf.as_str()),
  ]))
  .await?;

  if extract_title(&page).is_some_and(|t| t.contains("MFA")) {
    debug!("Garmin SSO requested an MFA code");
    let code = prompt_mfa()?;
    let csrf = extract_csrf(&page).ok_or_else(|| GarminError::Auth("MFA page has no CSRF token".into()))?;

    page = read_page(client.post(sso_url(config, "/sso/verifyMFA/loginEnterMfaCode")?).form(&[
      ("mfa-code", code.as_str()),
      ("embed", "true"),
      ("_csrf", csrf.as_str()),
      ("fromPage", "setupEnterMfaCode"),
    ]))
    .await?;
  }

  let title = extract_title(&page).unwrap_or_default();
  if title != "Success" {
    return Err(GarminError::Auth(format!("sign-in returned {:?}", title)));
  }

  let ticket = extract_ticket(&page).ok_or_else(|| GarminError::Auth("no service ticket in sign-in response".into()))?;
  exchange_token(config, &[("ticket", ticket.as_str())]).await
}

/// Trade a refresh token for a new session
pub async fn refresh_session(config: &GarminConfig, refresh_token: &str) -> Result<GarminSession, GarminError> {
  exchange_token(
    config,
    &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
  )
  .await
}

async fn exchange_token(config: &GarminConfig, form: &[(&str, &str)]) -> Result<GarminSession, GarminError> {
  let url = format!(
    "{}/oauth-service/oauth/exchange/user/2.0",
    config.api_url.trim_end_matches('/')
  );

  let response = sso_client()?.post(&url).form(form).send().await?;

  if !response.status().is_success() {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    return Err(GarminError::Auth(format!("token exchange failed ({}): {}", status, error_text)));
  }

  let token_response: TokenResponse = response
    .json()
    .await
    .map_err(|e| GarminError::Parse(format!("token response: {}", e)))?;
  Ok(GarminSession::from_response(token_response))
}

async fn read_page(request: RequestBuilder) -> Result<String, GarminError> {
  let response = request.send().await?;
  let status = response.status();

  if status == StatusCode::TOO_MANY_REQUESTS {
    return Err(GarminError::Auth("too many login attempts, wait before retrying".into()));
  }
  if !status.is_success() {
    let error_text = response.text().await.unwrap_or_default();
    return Err(GarminError::Auth(format!("SSO returned {}: {}", status, error_text)));
  }

  Ok(response.text().await?)
}

static CSRF_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"name="_csrf"\s+value="([^"]+)""#).expect("valid CSRF pattern"));
static TITLE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<title>([^<]*)</title>").expect("valid title pattern"));
static TICKET_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"embed\?ticket=([^"]+)""#).expect("valid ticket pattern"));

fn capture(re: &Regex, text: &str) -> Option<String> {
  re.captures(text)?.get(1).map(|m| m.as_str().to_string())
}

fn extract_csrf(page: &str) -> Option<String> {
  capture(&CSRF_RE, page)
}

fn extract_title(page: &str) -> Option<String> {
  capture(&TITLE_RE, page).map(|t| t.trim().to_string())
}

fn extract_ticket(page: &str) -> Option<String> {
  capture(&TICKET_RE, page)
}

/// ---------------------------------------------------------------------------
/// Workout Service Client
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedWorkout {
  workout_id: RemoteId,
}

/// Owner of the session, as reported by the profile service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub full_name: Option<String>,
}

pub struct GarminClient {
  http: Client,
  api_url: String,
  access_token: String,
}

impl GarminClient {
  pub fn new(api_url: &str, access_token: &str) -> Result<Self, GarminError> {
    Ok(Self {
      http: Client::builder().user_agent(USER_AGENT).build()?,
      api_url: api_url.trim_end_matches('/').to_string(),
      access_token: access_token.to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.api_url, path)
  }

  /// Send with the bearer token; 401 means the session is gone
  async fn send(&self, request: RequestBuilder) -> Result<Response, GarminError> {
    let response = request.bearer_auth(&self.access_token).send().await?;

    if response.status() == StatusCode::UNAUTHORIZED {
      return Err(GarminError::NotAuthenticated);
    }
    if !response.status().is_success() {
      let status = response.status().as_u16();
      let message = response.text().await.unwrap_or_default();
      return Err(GarminError::Api { status, message });
    }

    Ok(response)
  }

  pub async fn get_profile(&self) -> Result<UserProfile, GarminError> {
    let response = self
      .send(self.http.get(self.url("/userprofile-service/socialProfile")))
      .await?;
    response
      .json()
      .await
      .map_err(|e| GarminError::Parse(format!("profile: {}", e)))
  }

  /// Full workout document as stored remotely
  pub async fn get_workout(&self, id: RemoteId) -> Result<serde_json::Value, GarminError> {
    let response = self
      .send(self.http.get(self.url(&format!("/workout-service/workout/{}", id))))
      .await?;
    response
      .json()
      .await
      .map_err(|e| GarminError::Parse(format!("workout {}: {}", id, e)))
  }
}

#[async_trait]
impl WorkoutApi for GarminClient {
  async fn create_workout(&self, payload: &WorkoutPayload) -> Result<RemoteId, GarminError> {
    let response = self
      .send(self.http.post(self.url("/workout-service/workout")).json(payload))
      .await?;

    let created: CreatedWorkout = response
      .json()
      .await
      .map_err(|e| GarminError::Parse(format!("created workout: {}", e)))?;
    Ok(created.workout_id)
  }

  async fn schedule_workout(&self, id: RemoteId, date: NaiveDate) -> Result<(), GarminError> {
    let body = json!({ "date": date.format("%Y-%m-%d").to_string() });
    self
      .send(
        self
          .http
          .post(self.url(&format!("/workout-service/schedule/{}", id)))
          .json(&body),
      )
      .await?;
    Ok(())
  }

  async fn delete_workout(&self, id: RemoteId) -> Result<(), GarminError> {
    let result = self
      .send(self.http.delete(self.url(&format!("/workout-service/workout/{}", id))))
      .await;

    match result {
      Ok(_) => Ok(()),
      // Already gone is as good as deleted
      Err(GarminError::Api { status: 404, .. }) => {
        debug!(workout_id = id, "workout already absent");
        Ok(())
      }
      Err(e) => Err(e),
    }
  }

  async fn list_workouts(&self, name_prefix: &str) -> Result<Vec<RemoteWorkout>, GarminError> {
    let mut url = Url::parse(&self.url("/workout-service/workouts")).map_err(|e| GarminError::Parse(e.to_string()))?;
    url
      .query_pairs_mut()
      .append_pair("start", "0")
      .append_pair("limit", &WORKOUT_LIST_LIMIT.to_string());

    let response = self.send(self.http.get(url)).await?;
    let workouts: Vec<RemoteWorkout> = response
      .json()
      .await
      .map_err(|e| GarminError::Parse(format!("workout list: {}", e)))?;

    Ok(
      workouts
        .into_iter()
        .filter(|w| w.workout_name.starts_with(name_prefix))
        .collect(),
    )
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
