use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use model::{
    config::Config,
    settings::GuildConfig,
    stream::{Announcement, LiveSession},
};

/// Builds the notification for `session` using the guild's overrides where present.
pub fn build(
    session: &LiveSession,
    guild: &GuildConfig,
    config: &Config,
    now: DateTime<Utc>,
) -> Announcement {
    let template = guild
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(&config.announcement_format);

    let image_url = match guild.thumbnail_for(&session.broadcaster_login) {
        Some(url) => url.to_string(),
        None => preview_url(
            &session.thumbnail_url,
            config.thumbnail_width,
            config.thumbnail_height,
            now,
        ),
    };

    Announcement {
        content: fill(template, &[("name", session.broadcaster_name.clone())]),
        title: session.title.clone(),
        url: session.stream_url(),
        broadcaster_name: session.broadcaster_name.clone(),
        viewer_count: session.viewer_count,
        game_name: session.game_name.clone(),
        image_url,
        sent_at: now,
    }
}

/// Substitutes the size placeholders and appends a cache-busting parameter so chat
/// clients fetch a current preview instead of a cached one.
fn preview_url(template: &str, width: u32, height: u32, now: DateTime<Utc>) -> String {
    if template.is_empty() {
        return String::new();
    }

    let url = fill(
        template,
        &[("width", width.to_string()), ("height", height.to_string())],
    );
    let separator = if url.contains('?') { '&' } else { '?' };

    format!("{url}{separator}t={}", now.timestamp())
}

/// Formats `{key}` placeholders. Falls back to plain replacement when the template
/// has placeholders we don't know, so a typo in a guild message still sends.
fn fill(template: &str, vars: &[(&str, String)]) -> String {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    match strfmt::strfmt(template, &map) {
        Ok(v) => v,
        Err(e) => {
            warn!("Template {template:?} could not be formatted: {e}");
            vars.iter().fold(template.to_string(), |acc, (k, v)| {
                acc.replace(&format!("{{{k}}}"), v)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> LiveSession {
        LiveSession {
            id: "S1".into(),
            broadcaster_login: "alice".into(),
            broadcaster_name: "Alice".into(),
            title: "speedruns".into(),
            viewer_count: 42,
            game_name: "Celeste".into(),
            thumbnail_url: "https://cdn/live_user_alice-{width}x{height}.jpg".into(),
            started_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn default_message_and_provider_preview() {
        let a = build(&session(), &GuildConfig::default(), &Config::new(), now());

        assert_eq!(
            a.content,
            "Hey @everyone, Alice is now live on Twitch! Come and support the stream! Leave a comment and chat with them!"
        );
        assert_eq!(
            a.image_url,
            "https://cdn/live_user_alice-320x180.jpg?t=1700000000"
        );
        assert_eq!(a.url, "https://www.twitch.tv/alice");
        assert_eq!(a.title, "speedruns");
        assert_eq!(a.viewer_count, 42);
        assert_eq!(a.game_name, "Celeste");
    }

    #[test]
    fn guild_overrides_win() {
        let mut guild = GuildConfig::default();
        guild.message = Some("{name} went live, go say hi".into());
        guild.set_thumbnail("ALICE", Some("https://img/alice.png".into()));

        let a = build(&session(), &guild, &Config::new(), now());

        assert_eq!(a.content, "Alice went live, go say hi");
        assert_eq!(a.image_url, "https://img/alice.png");
    }

    #[test]
    fn unknown_placeholder_still_substitutes_name() {
        let mut guild = GuildConfig::default();
        guild.message = Some("{name} is live {oops}".into());

        let a = build(&session(), &guild, &Config::new(), now());

        assert_eq!(a.content, "Alice is live {oops}");
    }

    #[test]
    fn missing_provider_preview_stays_empty() {
        assert_eq!(preview_url("", 320, 180, now()), "");
    }

    #[test]
    fn cache_buster_joins_existing_query() {
        assert_eq!(
            preview_url("https://cdn/p.jpg?w={width}&h={height}", 1, 2, now()),
            "https://cdn/p.jpg?w=1&h=2&t=1700000000"
        );
    }
}
