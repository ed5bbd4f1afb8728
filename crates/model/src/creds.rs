use anyhow::Context;

pub const DISCORD_TOKEN_KEY: &str = "BOT_TOKEN";
pub const TWITCH_CLIENT_ID_KEY: &str = "TWITCH_CLIENT_ID";
pub const TWITCH_CLIENT_SECRET_KEY: &str = "TWITCH_SECRET";
pub const TWITCH_ACCESS_TOKEN_KEY: &str = "TWITCH_ACCESS_TOKEN";

#[derive(Clone)]
pub struct TwitchCreds {
    pub client_id: String,
    pub client_secret: String,
    /// May be empty, in which case a fresh token is requested on the first poll.
    pub access_token: String,
}

impl TwitchCreds {
    pub fn new(client_id: &str, client_secret: &str, access_token: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            access_token: access_token.to_string(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(
            &required_var(TWITCH_CLIENT_ID_KEY)?,
            &required_var(TWITCH_CLIENT_SECRET_KEY)?,
            &std::env::var(TWITCH_ACCESS_TOKEN_KEY).unwrap_or_default(),
        ))
    }
}

impl std::fmt::Debug for TwitchCreds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchCreds")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct DiscordCreds {
    pub token: String,
}

impl DiscordCreds {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(&required_var(DISCORD_TOKEN_KEY)?))
    }
}

fn required_var(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("Missing environment var {key}"))
}
