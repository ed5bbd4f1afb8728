use std::{path::Path, time::Duration};

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::settings::ReloadPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The duration to wait between checks of the central message bus.
    #[serde(default = "default_tick_duration")]
    pub tick_duration: f32,
    /// Seconds between two polls of the streaming provider.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// The minimum duration between automatic stream notifications for one
    /// broadcaster in one guild, in seconds.
    #[serde(default = "default_announce_cooldown_secs")]
    pub announce_cooldown_secs: u64,
    #[serde(default = "default_thumbnail_width")]
    pub thumbnail_width: u32,
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
    /// Used when a guild has no custom message. `{name}` is replaced with the broadcaster.
    #[serde(default = "default_announcement_format")]
    pub announcement_format: String,
    /// Prefix for the admin text commands.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Location of the JSON guild settings document.
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    /// Location of the `.env` file the refreshed access token is written back to.
    #[serde(default = "default_env_path")]
    pub env_path: String,
    #[serde(default)]
    pub settings_reload: ReloadPolicy,
    #[serde(default = "default_helix_url")]
    pub helix_url: String,
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,
}

impl Config {
    pub fn new() -> Self {
        Self {
            tick_duration: default_tick_duration(),
            poll_interval_secs: default_poll_interval_secs(),
            announce_cooldown_secs: default_announce_cooldown_secs(),
            thumbnail_width: default_thumbnail_width(),
            thumbnail_height: default_thumbnail_height(),
            announcement_format: default_announcement_format(),
            command_prefix: default_command_prefix(),
            settings_path: default_settings_path(),
            env_path: default_env_path(),
            settings_reload: ReloadPolicy::default(),
            helix_url: default_helix_url(),
            oauth_url: default_oauth_url(),
        }
    }

    /// Reads the config from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::new());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config {}", path.display()))?;

        let config: Self =
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {}", path.display()))?;

        Ok(config)
    }

    /// Rejects values the timers can't be built from.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.tick_duration.is_finite() && self.tick_duration > 0.0,
            "tick_duration must be a positive number of seconds, got {}",
            self.tick_duration
        );
        anyhow::ensure!(
            self.poll_interval_secs > 0,
            "poll_interval_secs must be at least 1"
        );

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn announce_cooldown(&self) -> Duration {
        Duration::from_secs(self.announce_cooldown_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_tick_duration() -> f32 {
    0.5
}

pub fn default_poll_interval_secs() -> u64 {
    600
}

fn default_announce_cooldown_secs() -> u64 {
    21600
}

fn default_thumbnail_width() -> u32 {
    320
}

fn default_thumbnail_height() -> u32 {
    180
}

fn default_announcement_format() -> String {
    "Hey @everyone, {name} is now live on Twitch! Come and support the stream! Leave a comment and chat with them!".into()
}

fn default_command_prefix() -> String {
    "?".into()
}

fn default_settings_path() -> String {
    "settings.json".into()
}

fn default_env_path() -> String {
    ".env".into()
}

fn default_helix_url() -> String {
    "https://api.twitch.tv/helix".into()
}

fn default_oauth_url() -> String {
    "https://id.twitch.tv/oauth2".into()
}
