use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use model::stream::LiveSession;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum HelixError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("no access token returned: {0}")]
    MissingToken(String),
}

/// The calls the poller needs from the streaming provider.
#[async_trait]
pub trait StreamsApi: Send + Sync {
    /// Ok(false) means the provider rejected the token.
    async fn validate_token(&self, token: &str) -> Result<bool, HelixError>;

    /// Client-credentials exchange for a new app access token.
    async fn request_app_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, HelixError>;

    /// Streams currently live for `login`. Empty when offline.
    async fn live_streams(
        &self,
        client_id: &str,
        token: &str,
        login: &str,
    ) -> Result<Vec<LiveSession>, HelixError>;
}

pub struct HelixClient {
    client: reqwest::Client,
    helix_url: String,
    oauth_url: String,
}

impl HelixClient {
    pub fn new(helix_url: &str, oauth_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            helix_url: helix_url.trim_end_matches('/').to_string(),
            oauth_url: oauth_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    data: Vec<StreamData>,
}

#[derive(Debug, Deserialize)]
struct StreamData {
    id: String,
    user_login: String,
    user_name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    viewer_count: u64,
    #[serde(default)]
    game_name: String,
    #[serde(default)]
    thumbnail_url: String,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
}

impl From<StreamData> for LiveSession {
    fn from(s: StreamData) -> Self {
        Self {
            id: s.id,
            broadcaster_login: s.user_login,
            broadcaster_name: s.user_name,
            title: s.title,
            viewer_count: s.viewer_count,
            game_name: s.game_name,
            thumbnail_url: s.thumbnail_url,
            started_at: s.started_at,
        }
    }
}

#[async_trait]
impl StreamsApi for HelixClient {
    async fn validate_token(&self, token: &str) -> Result<bool, HelixError> {
        let response = self
            .client
            .get(format!("{}/validate", self.oauth_url))
            .header("Authorization", format!("OAuth {token}"))
            .send()
            .await?;

        debug!("Token validation returned {}", response.status());

        Ok(response.status() == StatusCode::OK)
    }

    async fn request_app_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, HelixError> {
        let response: TokenResponse = self
            .client
            .post(format!("{}/token", self.oauth_url))
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .json()
            .await?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(HelixError::MissingToken(
                response
                    .message
                    .unwrap_or_else(|| "Failed to get access token".into()),
            )),
        }
    }

    async fn live_streams(
        &self,
        client_id: &str,
        token: &str,
        login: &str,
    ) -> Result<Vec<LiveSession>, HelixError> {
        let response = self
            .client
            .get(format!("{}/streams", self.helix_url))
            .query(&[("user_login", login)])
            .header("Client-ID", client_id)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HelixError::Status(response.status()));
        }

        let body: StreamsResponse = response.json().await?;

        Ok(body.data.into_iter().map(LiveSession::from).collect())
    }
}
