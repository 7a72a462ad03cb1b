use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use tokio::sync::mpsc::UnboundedSender;

use crate::lifecycle::engine::LadderEngine;
use crate::lifecycle::events::LadderEvent;

/// Periodically forfeits expired challenges. Deadlines are business days,
/// so a sweep every few minutes is more than enough resolution.
pub struct SweeperService {
    engine: Arc<LadderEngine>,
    events: UnboundedSender<LadderEvent>,
    interval: Duration,
}

impl SweeperService {
    pub fn new(
        engine: Arc<LadderEngine>,
        events: UnboundedSender<LadderEvent>,
        interval_secs: u64,
    ) -> Self {
        Self {
            engine,
            events,
            interval: Duration::from_secs(interval_secs),
        }
    }

    pub async fn run(&self) -> Result<()> {
        info!("timeout sweep running every {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    fn sweep_once(&self) {
        match self.engine.timeout_sweep() {
            Ok((0, _)) => {}
            Ok((swept, events)) => {
                info!("forfeited {swept} expired match(es)");
                for event in events {
                    // A closed dispatcher just means we are shutting down.
                    let _ = self.events.send(event);
                }
            }
            Err(e) => error!("timeout sweep failed: {e}"),
        }
    }
}
