use std::sync::Arc;

use log::debug;
use model::stream::{Announcement, AnnouncementSink};
use serenity::{async_trait, http::Http, model::prelude::*, utils::Colour};

const FOOTER_ICON: &str = "https://cdn-longterm.mee6.xyz/plugins/twitch/logo.png";

/// Delivers announcements through the Discord REST API.
#[derive(Clone)]
pub struct ChannelSink {
    http: Arc<Http>,
}

impl ChannelSink {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl AnnouncementSink for ChannelSink {
    async fn resolve_channel(&self, channel_id: u64) -> bool {
        match self.http.get_channel(channel_id).await {
            Ok(channel) => channel.guild().is_some(),
            Err(e) => {
                debug!("Unable to resolve channel {channel_id}: {e}");
                false
            }
        }
    }

    async fn deliver(&self, channel_id: u64, announcement: &Announcement) -> anyhow::Result<()> {
        ChannelId(channel_id)
            .send_message(&self.http, |m| {
                m.content(&announcement.content).embed(|e| {
                    e.title(format!("**{}**", announcement.title))
                        .url(&announcement.url)
                        .colour(Colour::RED)
                        .author(|a| a.name(&announcement.broadcaster_name))
                        .field("Viewers", announcement.viewer_count, false)
                        .field("Game", &announcement.game_name, false)
                        .footer(|f| {
                            f.text(format!(
                                "Twitch • {}",
                                announcement.sent_at.format("%m/%d/%Y %I:%M %p UTC")
                            ))
                            .icon_url(FOOTER_ICON)
                        });

                    if !announcement.image_url.is_empty() {
                        e.image(&announcement.image_url);
                    }

                    e
                })
            })
            .await?;

        Ok(())
    }
}
