#[derive(Debug, Clone)]
pub enum CentralMessage {
    Discord(DiscordMessage),
    Twitch(TwitchMessage),

    Shutdown,
}

#[derive(Debug, Clone)]
pub enum DiscordMessage {
    Error(String),

    Ready,
    /// An admin asked for an announcement regardless of the cooldown.
    ForceAnnounce {
        guild_id: u64,
        broadcaster: String,
        reply_channel: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedSession {
    pub guild_id: u64,
    pub broadcaster: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub enum TwitchMessage {
    Error(String),

    Ready,
    /// Everything announced during one tick.
    Announced(Vec<AnnouncedSession>),
    ForceResult {
        reply_channel: u64,
        text: String,
    },
    TokenRefreshed,
}
