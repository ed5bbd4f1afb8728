use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use model::{
    settings::{Settings, SettingsRepository},
    stream::{Announcement, AnnouncementSink, LiveSession},
};
use reqwest::StatusCode;

use crate::{
    clock::Clock,
    helix::{HelixError, StreamsApi},
};

pub fn session(id: &str, login: &str) -> LiveSession {
    LiveSession {
        id: id.into(),
        broadcaster_login: login.into(),
        broadcaster_name: login.into(),
        title: format!("{login} stream"),
        viewer_count: 10,
        game_name: "Just Chatting".into(),
        thumbnail_url: format!("https://cdn/live_user_{login}-{{width}}x{{height}}.jpg"),
        started_at: None,
    }
}

enum StreamState {
    Live(LiveSession),
    Failing,
}

pub struct FakeApi {
    valid_token: String,
    issued_token: Option<String>,
    validation_unreachable: bool,
    streams: Mutex<HashMap<String, StreamState>>,
    stream_queries: Mutex<Vec<(String, String)>>,
    validations: Mutex<usize>,
    token_requests: Mutex<usize>,
}

impl FakeApi {
    /// Accepts the token "good" and refuses to issue new ones.
    pub fn new() -> Self {
        Self {
            valid_token: "good".into(),
            issued_token: None,
            validation_unreachable: false,
            streams: Mutex::new(HashMap::new()),
            stream_queries: Mutex::new(Vec::new()),
            validations: Mutex::new(0),
            token_requests: Mutex::new(0),
        }
    }

    pub fn valid_token(mut self, token: &str) -> Self {
        self.valid_token = token.into();
        self
    }

    pub fn issues_token(mut self, token: &str) -> Self {
        self.issued_token = Some(token.into());
        self
    }

    pub fn validation_unreachable(mut self) -> Self {
        self.validation_unreachable = true;
        self
    }

    pub fn set_live(&self, login: &str, session: LiveSession) {
        self.streams
            .lock()
            .unwrap()
            .insert(login.into(), StreamState::Live(session));
    }

    pub fn set_failing(&self, login: &str) {
        self.streams
            .lock()
            .unwrap()
            .insert(login.into(), StreamState::Failing);
    }

    /// `(login, token)` for every stream query made so far.
    pub fn stream_queries(&self) -> Vec<(String, String)> {
        self.stream_queries.lock().unwrap().clone()
    }

    pub fn validations(&self) -> usize {
        *self.validations.lock().unwrap()
    }

    pub fn token_requests(&self) -> usize {
        *self.token_requests.lock().unwrap()
    }
}

#[async_trait]
impl StreamsApi for FakeApi {
    async fn validate_token(&self, token: &str) -> Result<bool, HelixError> {
        *self.validations.lock().unwrap() += 1;

        if self.validation_unreachable {
            return Err(HelixError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }

        Ok(token == self.valid_token)
    }

    async fn request_app_token(
        &self,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<String, HelixError> {
        *self.token_requests.lock().unwrap() += 1;

        self.issued_token
            .clone()
            .ok_or_else(|| HelixError::MissingToken("invalid client".into()))
    }

    async fn live_streams(
        &self,
        _client_id: &str,
        token: &str,
        login: &str,
    ) -> Result<Vec<LiveSession>, HelixError> {
        self.stream_queries
            .lock()
            .unwrap()
            .push((login.into(), token.into()));

        match self.streams.lock().unwrap().get(login) {
            Some(StreamState::Live(s)) => Ok(vec![s.clone()]),
            Some(StreamState::Failing) => Err(HelixError::Status(StatusCode::BAD_GATEWAY)),
            None => Ok(Vec::new()),
        }
    }
}

pub struct FakeSink {
    channels: Mutex<HashSet<u64>>,
    fail: Mutex<bool>,
    sent: Mutex<Vec<(u64, Announcement)>>,
}

impl FakeSink {
    pub fn with_channels(channels: &[u64]) -> Self {
        Self {
            channels: Mutex::new(channels.iter().copied().collect()),
            fail: Mutex::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn add_channel(&self, channel_id: u64) {
        self.channels.lock().unwrap().insert(channel_id);
    }

    pub fn remove_channel(&self, channel_id: u64) {
        self.channels.lock().unwrap().remove(&channel_id);
    }

    pub fn fail_deliveries(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<(u64, Announcement)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnnouncementSink for FakeSink {
    async fn resolve_channel(&self, channel_id: u64) -> bool {
        self.channels.lock().unwrap().contains(&channel_id)
    }

    async fn deliver(&self, channel_id: u64, announcement: &Announcement) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("Missing Access");
        }

        self.sent
            .lock()
            .unwrap()
            .push((channel_id, announcement.clone()));

        Ok(())
    }
}

pub struct FakeSettings {
    settings: Mutex<Settings>,
}

impl FakeSettings {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(Settings::default()),
        }
    }

    pub fn set_guild(&self, guild_id: u64, channel_id: Option<u64>, broadcasters: &[&str]) {
        let mut settings = self.settings.lock().unwrap();
        let guild = settings.get_or_create(guild_id);

        guild.channel_id = channel_id;
        for b in broadcasters {
            guild.add_broadcaster(b);
        }
    }
}

#[async_trait]
impl SettingsRepository for FakeSettings {
    async fn snapshot(&self) -> anyhow::Result<Settings> {
        Ok(self.settings.lock().unwrap().clone())
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
