use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use log::{debug, error, info};
use model::{
    config::Config,
    creds::{DiscordCreds, TwitchCreds},
    messages::{CentralMessage, DiscordMessage, TwitchMessage},
    settings::JsonSettingsStore,
};
use tokio::{
    sync::broadcast::{self, Receiver, Sender},
    task::JoinHandle,
};

const WORKSPACE_CRATES: [&str; 4] = ["bot", "discord", "model", "twitch"];
const CONFIG_PATH_VAR: &str = "HERALD_CONFIG";

pub static IS_RUNNING: AtomicBool = AtomicBool::new(true);

fn init_logging() {
    let level = env!("LOG_LEVEL");
    let filters = WORKSPACE_CRATES
        .iter()
        .fold(String::from("warn"), |acc, c| format!("{acc},{c}={level}"));

    env_logger::Builder::new()
        .parse_filters(&filters)
        .parse_env("RUST_LOG")
        .init();
}

fn start_twitch_bot(
    config: &Config,
    creds: &TwitchCreds,
    discord_token: &str,
    settings: Arc<JsonSettingsStore>,
    receiver: Receiver<CentralMessage>,
    sender: Sender<TwitchMessage>,
) -> JoinHandle<()> {
    let sink = Arc::new(discord::ChannelSink::new(discord_token));
    let poller = twitch::create_poller(config, creds, settings, sink);

    tokio::spawn(async move {
        if let Err(e) = twitch::run_bot(poller, receiver, sender).await {
            error!("{e}");
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!(
        "Starting build {} with rev {}",
        env!("BUILD_NAME"),
        env!("GIT_REV")
    );

    let config_path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".into());
    let config = Config::load(&config_path)?;

    if let Err(e) = dotenvy::from_path(&config.env_path) {
        println!("Not loading {}: {e}", config.env_path);
    }

    init_logging();
    info!("Logging initted!");

    let discord_creds = DiscordCreds::from_env()?;
    let twitch_creds = TwitchCreds::from_env()?;

    let settings = Arc::new(
        JsonSettingsStore::open(&config.settings_path, config.settings_reload)
            .await
            .context("Unable to open guild settings")?,
    );

    let (host_sender, _) = broadcast::channel(10);
    let (discord_sender, mut discord_receiver) = broadcast::channel(10);
    let (twitch_sender, mut twitch_receiver) = broadcast::channel(10);

    {
        let interrupt_sender = host_sender.clone();

        ctrlc::set_handler(move || {
            IS_RUNNING.store(false, Ordering::Relaxed);
            if let Err(e) = interrupt_sender.send(CentralMessage::Shutdown) {
                error!("{e}");
            }
        })?;

        debug!("Set ctrl+c handler!");
    }

    let discord_token = discord_creds.token.clone();
    let discord_join_handle = {
        let config = config.clone();
        let settings = settings.clone();
        let receiver = host_sender.subscribe();
        tokio::spawn(async move {
            if let Err(e) =
                discord::run_bot(config, discord_creds, settings, receiver, discord_sender).await
            {
                error!("{e}");
            }
        })
    };

    let mut twitch_join_handle: Option<JoinHandle<()>> = None;

    let mut interval = tokio::time::interval(Duration::from_secs_f32(config.tick_duration));

    'running: loop {
        let _ = interval.tick().await;

        if !IS_RUNNING.load(Ordering::Relaxed) {
            break;
        }

        loop {
            match discord_receiver.try_recv() {
                Ok(v) => match v {
                    DiscordMessage::Ready => {
                        info!("Discord ready!");

                        if twitch_join_handle.is_none() {
                            twitch_join_handle = Some(start_twitch_bot(
                                &config,
                                &twitch_creds,
                                &discord_token,
                                settings.clone(),
                                host_sender.subscribe(),
                                twitch_sender.clone(),
                            ));

                            debug!("Spawned task for Twitch poller!");
                        }
                    }
                    DiscordMessage::ForceAnnounce { .. } => {
                        debug!("Forwarding {:?}", &v);
                        if let Err(e) = host_sender.send(CentralMessage::Discord(v)) {
                            error!("{e}");
                        }
                    }
                    DiscordMessage::Error(m) => {
                        error!("Discord: {m}");
                    }
                },
                Err(e) => match e {
                    broadcast::error::TryRecvError::Empty => break,
                    broadcast::error::TryRecvError::Closed => {
                        error!("Discord receiver closed");
                        let _ = host_sender.send(CentralMessage::Shutdown);
                        break 'running;
                    }
                    broadcast::error::TryRecvError::Lagged(n) => {
                        error!("Discord receiver lagged by {} messages", n)
                    }
                },
            }
        }

        loop {
            match twitch_receiver.try_recv() {
                Ok(v) => match v {
                    TwitchMessage::Ready => {
                        info!("Twitch poller ready!");
                    }
                    TwitchMessage::Announced(announced) => {
                        for a in announced {
                            info!(
                                "Announced {} ({}) in guild {}",
                                a.broadcaster, a.session_id, a.guild_id
                            );
                        }
                    }
                    TwitchMessage::ForceResult { .. } => {
                        if let Err(e) = host_sender.send(CentralMessage::Twitch(v)) {
                            error!("{e}");
                        }
                    }
                    TwitchMessage::TokenRefreshed => {
                        info!("Twitch access token refreshed");
                    }
                    TwitchMessage::Error(m) => {
                        error!("{m}");
                    }
                },
                Err(e) => match e {
                    broadcast::error::TryRecvError::Empty => break,
                    broadcast::error::TryRecvError::Closed => {
                        error!("Twitch receiver closed");
                        let _ = host_sender.send(CentralMessage::Shutdown);
                        break 'running;
                    }
                    broadcast::error::TryRecvError::Lagged(n) => {
                        error!("Twitch receiver lagged by {} messages", n)
                    }
                },
            }
        }
    }

    discord_join_handle.abort();

    if let Some(handle) = twitch_join_handle {
        if let Err(e) = handle.await {
            error!("Twitch poller ended badly: {e}");
        }
    }

    info!("Finished!");

    Ok(())
}
