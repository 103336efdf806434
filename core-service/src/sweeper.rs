//! Background eviction sweep
//!
//! Periodically evicts Recycle Bin fonts whose deadline has passed. The first
//! sweep runs immediately so fonts that expired while the host was closed are
//! removed at startup. Storage errors are logged and published, and the next
//! tick tries again.

use crate::FontService;
use core_runtime::events::{CoreEvent, MaintenanceEvent};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Handle to a running eviction sweeper
///
/// Dropping the handle cancels the sweeper.
pub struct SweeperHandle {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Ask the sweeper to stop after the current sweep
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the sweeper and wait for it to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Eviction sweeper task failed");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) fn spawn(service: FontService, period: Duration) -> SweeperHandle {
    let token = CancellationToken::new();
    let child = token.child_token();

    info!(interval_secs = period.as_secs(), "Starting eviction sweeper");
    let handle = tokio::spawn(run(service, period, child));

    SweeperHandle {
        token,
        handle: Some(handle),
    }
}

async fn run(service: FontService, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                match service.delete_old_recycled_fonts().await {
                    Ok(evicted) => debug!(evicted = evicted.len(), "Eviction sweep finished"),
                    Err(e) => {
                        warn!(error = %e, "Eviction sweep failed");
                        service.emit_core(CoreEvent::Maintenance(MaintenanceEvent::SweepFailed {
                            message: e.to_string(),
                        }));
                    }
                }
            }
        }
    }

    service.emit_core(CoreEvent::Maintenance(MaintenanceEvent::SweeperStopped));
    info!("Eviction sweeper stopped");
}
