use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One live stream as reported by the streaming provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSession {
    /// Opaque id, new for every stream start.
    pub id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
    pub title: String,
    pub viewer_count: u64,
    pub game_name: String,
    /// Preview image URL with `{width}` and `{height}` placeholders.
    pub thumbnail_url: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl LiveSession {
    /// Key used for the per-broadcaster cooldown.
    pub fn broadcaster_key(&self) -> String {
        self.broadcaster_login.to_lowercase()
    }

    pub fn stream_url(&self) -> String {
        format!("https://www.twitch.tv/{}", self.broadcaster_login)
    }
}

/// A notification ready to be delivered to a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub content: String,
    pub title: String,
    pub url: String,
    pub broadcaster_name: String,
    pub viewer_count: u64,
    pub game_name: String,
    pub image_url: String,
    pub sent_at: DateTime<Utc>,
}

/// Where announcements go.
#[async_trait]
pub trait AnnouncementSink: Send + Sync {
    /// Returns false if the channel no longer exists or cannot be seen by the bot.
    async fn resolve_channel(&self, channel_id: u64) -> bool;

    async fn deliver(&self, channel_id: u64, announcement: &Announcement) -> anyhow::Result<()>;
}
