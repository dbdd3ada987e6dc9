use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::GameService;

const SWEEP_INTERVAL_SECS: u64 = 30;

/// Owns the background task that retires idle sessions so the session map
/// and detection cache cannot grow unbounded under abandoned games.
pub struct SessionReaper {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SessionReaper {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self, game: GameService) -> Result<()> {
        if self.handle.is_some() {
            bail!("reaper already running");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let handle = tokio::spawn(reaper_loop(game, token_clone));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("reaper task failed to join").map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for SessionReaper {
    fn default() -> Self {
        Self::new()
    }
}

async fn reaper_loop(game: GameService, cancel_token: CancellationToken) {
    let mut ticker = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reaped = game.abandon_idle(Utc::now()).await;
                if reaped > 0 {
                    info!("retired {reaped} idle sessions");
                }
            }
            _ = cancel_token.cancelled() => {
                info!("session reaper shutting down");
                break;
            }
        }
    }
}
