use log::{error, info, warn};
use model::{
    creds::{TwitchCreds, TWITCH_ACCESS_TOKEN_KEY},
    env_file::EnvFile,
};

use crate::helix::StreamsApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Refreshed,
    /// The token could not be confirmed or replaced; the old one is still in use.
    Stale,
}

/// Holds the app access token and replaces it when the provider rejects it.
pub struct CredentialCache {
    client_id: String,
    client_secret: String,
    access_token: String,
    env_file: Option<EnvFile>,
}

impl CredentialCache {
    pub fn new(creds: &TwitchCreds, env_file: Option<EnvFile>) -> Self {
        Self {
            client_id: creds.client_id.clone(),
            client_secret: creds.client_secret.clone(),
            access_token: creds.access_token.clone(),
            env_file,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn token(&self) -> &str {
        &self.access_token
    }

    pub async fn ensure_valid(&mut self, api: &dyn StreamsApi) -> CredentialStatus {
        if !self.access_token.is_empty() {
            match api.validate_token(&self.access_token).await {
                Ok(true) => {
                    info!("Token is valid");
                    return CredentialStatus::Valid;
                }
                Ok(false) => info!("Token is invalid, generating a new one"),
                Err(e) => {
                    warn!("Unable to validate token, keeping the current one: {e}");
                    return CredentialStatus::Stale;
                }
            }
        }

        let token = match api
            .request_app_token(&self.client_id, &self.client_secret)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                error!("Unable to refresh token: {e}");
                return CredentialStatus::Stale;
            }
        };

        self.access_token = token;
        info!("Generated a new access token");

        if let Some(env_file) = &self.env_file {
            if let Err(e) = env_file
                .set(TWITCH_ACCESS_TOKEN_KEY, &self.access_token)
                .await
            {
                error!("Unable to persist refreshed token: {e:#}");
            }
        }

        CredentialStatus::Refreshed
    }
}
