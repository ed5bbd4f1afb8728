mod admin;
mod discord_bot;
mod sink;

pub use sink::ChannelSink;

use model::{
    config::Config,
    creds::DiscordCreds,
    messages::{CentralMessage, DiscordMessage},
    settings::JsonSettingsStore,
};
use serenity::prelude::*;

use std::sync::Arc;
use tokio::sync::broadcast::{Receiver, Sender};

pub async fn run_bot(
    config: Config,
    creds: DiscordCreds,
    settings: Arc<JsonSettingsStore>,
    receiver: Receiver<CentralMessage>,
    sender: Sender<DiscordMessage>,
) -> anyhow::Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let bot = discord_bot::Bot::new(config, settings, receiver, sender);

    let mut client = Client::builder(&creds.token, intents)
        .event_handler(bot)
        .await?;

    client.start().await.map_err(anyhow::Error::from)
}
