use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use model::stream::LiveSession;

#[derive(Debug, Default)]
struct GuildLedger {
    seen_sessions: HashSet<String>,
    last_announced: HashMap<String, DateTime<Utc>>,
}

/// Remembers which sessions were announced in which guild, and when each
/// broadcaster was last announced automatically.
///
/// Nothing here is persisted. After a restart every live session is new again.
#[derive(Debug)]
pub struct AnnouncementLedger {
    cooldown: chrono::Duration,
    guilds: HashMap<u64, GuildLedger>,
}

impl AnnouncementLedger {
    pub fn new(cooldown: std::time::Duration) -> Self {
        Self {
            cooldown: chrono::Duration::from_std(cooldown)
                .unwrap_or_else(|_| chrono::Duration::max_value()),
            guilds: HashMap::new(),
        }
    }

    /// Whether the automatic path may announce `session` in `guild_id` at `now`.
    /// Does not change any state.
    pub fn should_announce(&self, guild_id: u64, session: &LiveSession, now: DateTime<Utc>) -> bool {
        let ledger = match self.guilds.get(&guild_id) {
            Some(v) => v,
            None => return true,
        };

        if ledger.seen_sessions.contains(&session.id) {
            return false;
        }

        match ledger.last_announced.get(&session.broadcaster_key()) {
            Some(last) => now.signed_duration_since(*last) >= self.cooldown,
            None => true,
        }
    }

    /// Marks an automatic announcement as sent.
    pub fn record(&mut self, guild_id: u64, session: &LiveSession, now: DateTime<Utc>) {
        let ledger = self.guilds.entry(guild_id).or_default();

        ledger.seen_sessions.insert(session.id.clone());
        ledger.last_announced.insert(session.broadcaster_key(), now);
    }

    /// Forced announcements ignore the cooldown.
    pub fn should_force_announce(&self) -> bool {
        true
    }

    /// Marks a forced announcement as sent. The cooldown timestamp is left alone.
    pub fn record_forced(&mut self, guild_id: u64, session: &LiveSession) {
        self.guilds
            .entry(guild_id)
            .or_default()
            .seen_sessions
            .insert(session.id.clone());
    }

    pub fn has_seen(&self, guild_id: u64, session_id: &str) -> bool {
        self.guilds
            .get(&guild_id)
            .map_or(false, |l| l.seen_sessions.contains(session_id))
    }

    pub fn last_announced(&self, guild_id: u64, broadcaster: &str) -> Option<DateTime<Utc>> {
        self.guilds
            .get(&guild_id)
            .and_then(|l| l.last_announced.get(&broadcaster.to_lowercase()))
            .copied()
    }
}
