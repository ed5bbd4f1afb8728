use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::RwLock;

/// Announcement settings for a single guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Lower-cased broadcaster logins, in the order they were added.
    #[serde(default, alias = "names", deserialize_with = "lowercase_logins")]
    pub broadcasters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
    /// Custom announcement text. `{name}` is replaced with the broadcaster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Broadcaster login to preview image override.
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "lowercase_keys"
    )]
    pub thumbnails: BTreeMap<String, String>,
}

fn lowercase_logins<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut logins: Vec<String> = Vec::new();
    for login in Vec::<String>::deserialize(deserializer)? {
        let login = login.to_lowercase();
        if !logins.contains(&login) {
            logins.push(login);
        }
    }

    Ok(logins)
}

fn lowercase_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(BTreeMap::<String, String>::deserialize(deserializer)?
        .into_iter()
        .map(|(login, url)| (login.to_lowercase(), url))
        .collect())
}

impl GuildConfig {
    pub fn tracks(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.broadcasters.iter().any(|b| *b == name)
    }

    /// Returns false if the broadcaster was already tracked.
    pub fn add_broadcaster(&mut self, name: &str) -> bool {
        if self.tracks(name) {
            return false;
        }

        self.broadcasters.push(name.to_lowercase());
        true
    }

    /// Returns false if the broadcaster was not tracked.
    pub fn remove_broadcaster(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        let before = self.broadcasters.len();
        self.broadcasters.retain(|b| *b != name);

        before != self.broadcasters.len()
    }

    pub fn thumbnail_for(&self, name: &str) -> Option<&str> {
        self.thumbnails
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    pub fn set_thumbnail(&mut self, name: &str, url: Option<String>) {
        let name = name.to_lowercase();
        match url {
            Some(url) => {
                self.thumbnails.insert(name, url);
            }
            None => {
                self.thumbnails.remove(&name);
            }
        }
    }
}

/// Every guild's settings, keyed by guild id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    pub guilds: BTreeMap<u64, GuildConfig>,
}

impl Settings {
    pub fn guild(&self, guild_id: u64) -> Option<&GuildConfig> {
        self.guilds.get(&guild_id)
    }

    pub fn get_or_create(&mut self, guild_id: u64) -> &mut GuildConfig {
        self.guilds.entry(guild_id).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &GuildConfig)> {
        self.guilds.iter().map(|(id, guild)| (*id, guild))
    }
}

/// When the settings document is read from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Re-read the document on every snapshot, so hand edits are picked up.
    #[default]
    EachTick,
    /// Read once at startup; only writes through the store change it.
    Cached,
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn snapshot(&self) -> anyhow::Result<Settings>;
}

/// Settings persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    policy: ReloadPolicy,
    cache: RwLock<Settings>,
}

impl JsonSettingsStore {
    pub async fn open(path: impl Into<PathBuf>, policy: ReloadPolicy) -> anyhow::Result<Self> {
        let path = path.into();
        let settings = read_settings(&path).await?;

        debug!(
            "Loaded settings for {} guild(s) from {}",
            settings.guilds.len(),
            path.display()
        );

        Ok(Self {
            path,
            policy,
            cache: RwLock::new(settings),
        })
    }

    pub async fn guild(&self, guild_id: u64) -> anyhow::Result<GuildConfig> {
        Ok(self
            .snapshot()
            .await?
            .guild(guild_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Applies `f` to the guild's settings, creating them if needed, and writes the
    /// document back to disk.
    pub async fn modify_guild<F, R>(&self, guild_id: u64, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut GuildConfig) -> R,
    {
        let mut cache = self.cache.write().await;

        if self.policy == ReloadPolicy::EachTick {
            *cache = read_settings(&self.path).await?;
        }

        let mut updated = cache.clone();
        let ret = f(updated.get_or_create(guild_id));

        let text = serde_json::to_string_pretty(&updated)?;
        tokio::fs::write(&self.path, text)
            .await
            .with_context(|| format!("Unable to write settings {}", self.path.display()))?;

        *cache = updated;

        Ok(ret)
    }
}

#[async_trait]
impl SettingsRepository for JsonSettingsStore {
    async fn snapshot(&self) -> anyhow::Result<Settings> {
        if self.policy == ReloadPolicy::Cached {
            return Ok(self.cache.read().await.clone());
        }

        let mut cache = self.cache.write().await;
        match read_settings(&self.path).await {
            Ok(settings) => *cache = settings,
            Err(e) => warn!("Keeping previous settings: {e:#}"),
        }

        Ok(cache.clone())
    }
}

async fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(v) => v,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Unable to read settings {}", path.display()))
        }
    };

    if text.trim().is_empty() {
        return Ok(Settings::default());
    }

    serde_json::from_str(&text).with_context(|| format!("Invalid settings {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasters_are_case_insensitive_and_unique() {
        let mut guild = GuildConfig::default();

        assert!(guild.add_broadcaster("Alice"));
        assert!(!guild.add_broadcaster("ALICE"));
        assert!(guild.add_broadcaster("bob"));
        assert_eq!(guild.broadcasters, vec!["alice", "bob"]);

        assert!(guild.tracks("aLiCe"));
        assert!(guild.remove_broadcaster("Alice"));
        assert!(!guild.remove_broadcaster("alice"));
        assert_eq!(guild.broadcasters, vec!["bob"]);
    }

    #[test]
    fn reads_legacy_names_key() {
        let settings: Settings = serde_json::from_str(
            r#"{"42": {"names": ["alice"], "channel_id": 7}, "43": {}}"#,
        )
        .unwrap();

        let guild = settings.guild(42).unwrap();
        assert_eq!(guild.broadcasters, vec!["alice"]);
        assert_eq!(guild.channel_id, Some(7));
        assert_eq!(settings.guild(43), Some(&GuildConfig::default()));
    }

    #[test]
    fn hand_edited_logins_are_lowercased() {
        let settings: Settings = serde_json::from_str(
            r#"{"1": {"broadcasters": ["Alice", "alice", "Bob"], "thumbnails": {"Alice": "u"}}}"#,
        )
        .unwrap();

        let mut guild = settings.guild(1).unwrap().clone();
        assert_eq!(guild.broadcasters, vec!["alice", "bob"]);
        assert!(guild.tracks("alice"));
        assert!(guild.tracks("ALICE"));
        assert_eq!(guild.thumbnail_for("alice"), Some("u"));

        assert!(!guild.add_broadcaster("alice"));
        assert!(guild.remove_broadcaster("Bob"));
        assert_eq!(guild.broadcasters, vec!["alice"]);
    }

    #[test]
    fn get_or_create_inserts_empty_guild() {
        let mut settings = Settings::default();
        settings.get_or_create(1).add_broadcaster("alice");

        assert!(settings.guild(1).unwrap().tracks("alice"));
        assert!(settings.guild(2).is_none());
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::open(dir.path().join("settings.json"), ReloadPolicy::EachTick)
            .await
            .unwrap();

        assert!(store.snapshot().await.unwrap().guilds.is_empty());
    }

    #[tokio::test]
    async fn modify_guild_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonSettingsStore::open(&path, ReloadPolicy::Cached)
            .await
            .unwrap();

        let added = store
            .modify_guild(5, |g| {
                g.channel_id = Some(99);
                g.set_thumbnail("Alice", Some("https://img/alice.png".into()));
                g.add_broadcaster("Alice")
            })
            .await
            .unwrap();
        assert!(added);

        let reopened = JsonSettingsStore::open(&path, ReloadPolicy::Cached)
            .await
            .unwrap();
        let guild = reopened.guild(5).await.unwrap();
        assert_eq!(guild.broadcasters, vec!["alice"]);
        assert_eq!(guild.channel_id, Some(99));
        assert_eq!(guild.thumbnail_for("ALICE"), Some("https://img/alice.png"));
    }

    #[tokio::test]
    async fn each_tick_policy_picks_up_hand_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let each_tick = JsonSettingsStore::open(&path, ReloadPolicy::EachTick)
            .await
            .unwrap();
        let cached = JsonSettingsStore::open(&path, ReloadPolicy::Cached)
            .await
            .unwrap();

        std::fs::write(&path, r#"{"1": {"broadcasters": ["carol"]}}"#).unwrap();

        assert!(each_tick.snapshot().await.unwrap().guild(1).unwrap().tracks("carol"));
        assert!(cached.snapshot().await.unwrap().guild(1).is_none());
    }

    #[tokio::test]
    async fn broken_file_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"1": {"broadcasters": ["carol"]}}"#).unwrap();
        let store = JsonSettingsStore::open(&path, ReloadPolicy::EachTick)
            .await
            .unwrap();

        std::fs::write(&path, "{ not json").unwrap();

        assert!(store.snapshot().await.unwrap().guild(1).unwrap().tracks("carol"));
    }
}
