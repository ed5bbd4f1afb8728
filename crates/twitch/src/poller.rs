use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use model::{
    config::Config,
    messages::AnnouncedSession,
    settings::{GuildConfig, SettingsRepository},
    stream::{AnnouncementSink, LiveSession},
};

use crate::{
    announcement,
    clock::{Clock, SystemClock},
    credentials::{CredentialCache, CredentialStatus},
    helix::{HelixError, StreamsApi},
    ledger::AnnouncementLedger,
};

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub credentials: CredentialStatus,
    pub announced: Vec<AnnouncedSession>,
    pub offline: usize,
    /// Live, but already announced or still in cooldown.
    pub suppressed: usize,
    /// Guilds with broadcasters but without a usable announcement channel.
    pub skipped_guilds: usize,
    /// `(guild_id, broadcaster)` pairs whose query or delivery failed.
    pub failures: Vec<(u64, String)>,
}

impl TickReport {
    fn new(credentials: CredentialStatus) -> Self {
        Self {
            credentials,
            announced: Vec::new(),
            offline: 0,
            suppressed: 0,
            skipped_guilds: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceOutcome {
    Announced { session_id: String },
    Offline,
    NotTracked,
    NoChannel,
}

impl ForceOutcome {
    /// Reply text for the admin that asked for the announcement.
    pub fn describe(&self, broadcaster: &str) -> String {
        match self {
            Self::Announced { .. } => format!("> Announced `{broadcaster}`."),
            Self::Offline => format!("> `{broadcaster}` is currently offline."),
            Self::NotTracked => format!(
                "> `{broadcaster}` is not in the list of broadcasters. Use `twitch add` to add this streamer."
            ),
            Self::NoChannel => {
                "> Announcement channel has not been set yet. Use `twitch channel` to get started."
                    .into()
            }
        }
    }
}

/// Polls the streaming provider for every tracked broadcaster and announces new
/// live sessions.
///
/// The poller owns the ledger, so whoever owns the poller serializes every
/// check-then-record, automatic or forced.
pub struct StreamPoller {
    config: Config,
    api: Arc<dyn StreamsApi>,
    credentials: CredentialCache,
    settings: Arc<dyn SettingsRepository>,
    sink: Arc<dyn AnnouncementSink>,
    clock: Arc<dyn Clock>,
    ledger: AnnouncementLedger,
}

impl StreamPoller {
    pub fn new(
        config: &Config,
        api: Arc<dyn StreamsApi>,
        credentials: CredentialCache,
        settings: Arc<dyn SettingsRepository>,
        sink: Arc<dyn AnnouncementSink>,
    ) -> Self {
        Self {
            config: config.clone(),
            api,
            credentials,
            settings,
            sink,
            clock: Arc::new(SystemClock),
            ledger: AnnouncementLedger::new(config.announce_cooldown()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    pub fn ledger(&self) -> &AnnouncementLedger {
        &self.ledger
    }

    pub async fn tick(&mut self) -> TickReport {
        let status = self.credentials.ensure_valid(self.api.as_ref()).await;
        let mut report = TickReport::new(status);

        let settings = match self.settings.snapshot().await {
            Ok(v) => v,
            Err(e) => {
                error!("Unable to load settings, skipping tick: {e:#}");
                return report;
            }
        };

        for (guild_id, guild) in settings.iter() {
            if guild.broadcasters.is_empty() {
                continue;
            }

            let channel_id = match self.announcement_channel(guild_id, guild).await {
                Some(v) => v,
                None => {
                    report.skipped_guilds += 1;
                    continue;
                }
            };

            for login in &guild.broadcasters {
                self.poll_broadcaster(guild_id, guild, channel_id, login, &mut report)
                    .await;
            }
        }

        debug!(
            "Tick finished: {} announced, {} offline, {} suppressed, {} failed",
            report.announced.len(),
            report.offline,
            report.suppressed,
            report.failures.len()
        );

        report
    }

    /// Announces `broadcaster` in `guild_id` now, ignoring the cooldown. The session
    /// is still recorded so the automatic path won't repeat it.
    pub async fn force_announce(
        &mut self,
        guild_id: u64,
        broadcaster: &str,
    ) -> anyhow::Result<ForceOutcome> {
        let settings = self.settings.snapshot().await?;
        let guild = match settings.guild(guild_id) {
            Some(g) if g.tracks(broadcaster) => g,
            _ => return Ok(ForceOutcome::NotTracked),
        };

        let channel_id = match self.announcement_channel(guild_id, guild).await {
            Some(v) => v,
            None => return Ok(ForceOutcome::NoChannel),
        };

        let session = match self.fetch_session(&broadcaster.to_lowercase()).await? {
            Some(v) => v,
            None => return Ok(ForceOutcome::Offline),
        };

        let announcement = announcement::build(&session, guild, &self.config, self.clock.now());
        self.sink.deliver(channel_id, &announcement).await?;
        self.ledger.record_forced(guild_id, &session);

        info!(
            "Forced announcement of {} ({}) in guild {guild_id}",
            session.broadcaster_login, session.id
        );

        Ok(ForceOutcome::Announced {
            session_id: session.id,
        })
    }

    async fn announcement_channel(&self, guild_id: u64, guild: &GuildConfig) -> Option<u64> {
        let channel_id = match guild.channel_id {
            Some(v) => v,
            None => {
                debug!("Guild {guild_id} has no announcement channel");
                return None;
            }
        };

        if !self.sink.resolve_channel(channel_id).await {
            debug!("Announcement channel {channel_id} of guild {guild_id} is gone");
            return None;
        }

        Some(channel_id)
    }

    async fn fetch_session(&self, login: &str) -> Result<Option<LiveSession>, HelixError> {
        let streams = self
            .api
            .live_streams(self.credentials.client_id(), self.credentials.token(), login)
            .await?;

        Ok(streams.into_iter().next())
    }

    async fn poll_broadcaster(
        &mut self,
        guild_id: u64,
        guild: &GuildConfig,
        channel_id: u64,
        login: &str,
        report: &mut TickReport,
    ) {
        let session = match self.fetch_session(login).await {
            Ok(Some(v)) => v,
            Ok(None) => {
                report.offline += 1;
                return;
            }
            Err(e) => {
                warn!("Unable to check {login} for guild {guild_id}: {e}");
                report.failures.push((guild_id, login.to_string()));
                return;
            }
        };

        let now = self.clock.now();
        if !self.ledger.should_announce(guild_id, &session, now) {
            debug!("Not announcing {login} ({}) in guild {guild_id}", session.id);
            report.suppressed += 1;
            return;
        }

        let announcement = announcement::build(&session, guild, &self.config, now);
        if let Err(e) = self.sink.deliver(channel_id, &announcement).await {
            error!("Unable to announce {login} in guild {guild_id}: {e:#}");
            report.failures.push((guild_id, login.to_string()));
            return;
        }

        self.ledger.record(guild_id, &session, now);
        info!("Announced {login} ({}) in guild {guild_id}", session.id);

        report.announced.push(AnnouncedSession {
            guild_id,
            broadcaster: session.broadcaster_key(),
            session_id: session.id,
        });
    }
}
