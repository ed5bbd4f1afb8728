pub mod announcement;
pub mod clock;
pub mod credentials;
pub mod helix;
pub mod ledger;
pub mod poller;

#[cfg(test)]
mod test_support;

use log::{debug, error, info, warn};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast::{error::RecvError, Receiver, Sender},
    time::MissedTickBehavior,
};

use model::{
    config::{default_poll_interval_secs, Config},
    creds::TwitchCreds,
    env_file::EnvFile,
    messages::{CentralMessage, DiscordMessage, TwitchMessage},
    settings::SettingsRepository,
    stream::AnnouncementSink,
};

use crate::{
    credentials::{CredentialCache, CredentialStatus},
    helix::HelixClient,
    poller::{StreamPoller, TickReport},
};

/// Wires a poller to the real Helix API, persisting refreshed tokens to the
/// configured env file.
pub fn create_poller(
    config: &Config,
    creds: &TwitchCreds,
    settings: Arc<dyn SettingsRepository>,
    sink: Arc<dyn AnnouncementSink>,
) -> StreamPoller {
    let api = Arc::new(HelixClient::new(&config.helix_url, &config.oauth_url));
    let credentials = CredentialCache::new(creds, Some(EnvFile::new(&config.env_path)));

    StreamPoller::new(config, api, credentials, settings, sink)
}

/// Runs the poller until a shutdown message arrives or the central channel closes.
/// The first tick happens immediately.
pub async fn run_bot(
    mut poller: StreamPoller,
    mut receiver: Receiver<CentralMessage>,
    sender: Sender<TwitchMessage>,
) -> anyhow::Result<()> {
    info!("Starting Twitch poller");

    let mut period = poller.poll_interval();
    if period.is_zero() {
        warn!("Poll interval must be non-zero, using the default");
        period = Duration::from_secs(default_poll_interval_secs());
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    notify(&sender, TwitchMessage::Ready);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                debug!("Checking if channels are live");

                let report = poller.tick().await;
                report_tick(&sender, &report);
            }
            message = receiver.recv() => {
                match message {
                    Ok(CentralMessage::Discord(DiscordMessage::ForceAnnounce {
                        guild_id,
                        broadcaster,
                        reply_channel,
                    })) => {
                        let text = match poller.force_announce(guild_id, &broadcaster).await {
                            Ok(outcome) => outcome.describe(&broadcaster),
                            Err(e) => {
                                error!("Forced announcement of {broadcaster} failed: {e:#}");
                                format!("> Unable to announce `{broadcaster}` right now, try again later.")
                            }
                        };

                        notify(&sender, TwitchMessage::ForceResult { reply_channel, text });
                    }
                    Ok(CentralMessage::Shutdown) => {
                        info!("Shutdown received!");
                        break;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        debug!("Channel lagged by {n} messages");
                    }
                    Err(RecvError::Closed) => {
                        error!("Channel closed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn report_tick(sender: &Sender<TwitchMessage>, report: &TickReport) {
    if report.credentials == CredentialStatus::Refreshed {
        notify(sender, TwitchMessage::TokenRefreshed);
    }

    if !report.announced.is_empty() {
        notify(sender, TwitchMessage::Announced(report.announced.clone()));
    }

    if !report.failures.is_empty() {
        notify(
            sender,
            TwitchMessage::Error(format!(
                "{} broadcaster check(s) failed this tick",
                report.failures.len()
            )),
        );
    }
}

fn notify(sender: &Sender<TwitchMessage>, message: TwitchMessage) {
    if let Err(e) = sender.send(message) {
        debug!("No one is listening to the Twitch poller: {e}");
    }
}
