use crate::admin::{Outcome, TwitchCommand};
use model::{
    config::Config,
    messages::{CentralMessage, DiscordMessage, TwitchMessage},
    settings::JsonSettingsStore,
};

use log::{debug, error, info, warn};
use serenity::{async_trait, http::CacheHttp, model::prelude::*, prelude::*};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

pub struct Bot {
    config: Config,
    settings: Arc<JsonSettingsStore>,

    is_initted: AtomicBool,

    receiver: Receiver<CentralMessage>,
    sender: Sender<DiscordMessage>,
}

impl Bot {
    pub fn new(
        config: Config,
        settings: Arc<JsonSettingsStore>,
        receiver: Receiver<CentralMessage>,
        sender: Sender<DiscordMessage>,
    ) -> Self {
        Self {
            config,
            settings,

            is_initted: AtomicBool::new(false),

            receiver,
            sender,
        }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        if !self.is_initted.swap(true, Ordering::Relaxed) {
            start_job_thread(self, &ctx);
        }

        if let Err(e) = self.sender.send(DiscordMessage::Ready) {
            error!("{e}");
        } else {
            info!("Discord bot ready as {}!", ready.user.name);
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        if message.author.bot {
            return;
        }

        let text = match message.content.strip_prefix(self.config.command_prefix.as_str()) {
            Some(v) => v,
            None => return,
        };

        let command = match TwitchCommand::parse(text) {
            Some(Ok(v)) => v,
            Some(Err(usage)) => {
                reply(&ctx, &message, usage).await;
                return;
            }
            None => return,
        };

        let guild_id = match message.guild_id {
            Some(v) => v,
            None => return,
        };

        match can_manage_guild(&ctx, &message).await {
            Ok(true) => {}
            Ok(false) => {
                reply(&ctx, &message, "You don't have the permissions to do that!").await;
                return;
            }
            Err(e) => {
                warn!("Unable to check permissions of {}: {e}", message.author.name);
                return;
            }
        }

        debug!("{} ran {:?}", message.author.name, command);

        match command.run(&self.settings, guild_id.0).await {
            Ok(Outcome::Reply(text)) => reply(&ctx, &message, &text).await,
            Ok(Outcome::Force(broadcaster)) => {
                reply(&ctx, &message, "> Attempting to force the announcement...").await;

                let request = DiscordMessage::ForceAnnounce {
                    guild_id: guild_id.0,
                    broadcaster,
                    reply_channel: message.channel_id.0,
                };
                if let Err(e) = self.sender.send(request) {
                    error!("{e}");
                }
            }
            Err(e) => {
                if let Err(e) = self
                    .sender
                    .send(DiscordMessage::Error(format!("Unable to update settings: {e:#}")))
                {
                    error!("{e}");
                }
                reply(&ctx, &message, "> Unable to save the settings, try again later.").await;
            }
        }
    }
}

async fn can_manage_guild(ctx: &Context, message: &Message) -> anyhow::Result<bool> {
    let member = message.member(ctx).await?;
    let permissions = member.permissions(ctx)?;

    Ok(permissions.manage_guild())
}

async fn reply(cache_http: impl CacheHttp, message: &Message, text: &str) {
    if let Err(e) = message.reply(cache_http, text).await {
        error!("{e}");
    }
}

/// Posts the poller's answers to forced announcements.
fn start_job_thread(bot: &Bot, ctx: &Context) {
    debug!("Starting Discord job thread.");

    tokio::spawn({
        let http = ctx.http.clone();
        let mut receiver = bot.receiver.resubscribe();

        async move {
            loop {
                match receiver.recv().await {
                    Ok(CentralMessage::Twitch(TwitchMessage::ForceResult {
                        reply_channel,
                        text,
                    })) => {
                        if let Err(e) = ChannelId(reply_channel).say(&http, text).await {
                            error!("{e}");
                        }
                    }
                    Ok(CentralMessage::Shutdown) => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => debug!("Channel lagged by {n} messages"),
                    Err(RecvError::Closed) => {
                        error!("Channel closed");
                        break;
                    }
                }
            }
        }
    });

    debug!("Started Discord job thread!");
}
