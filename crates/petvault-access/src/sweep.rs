//! Background expiry of access grants.
//!
//! Grant checks evaluate `expires_at` on every call, so the sweep only
//! keeps stored statuses tidy for reporting. Missing a run is harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use petvault_core::repository::{AccessGrantRepository, DirectoryRepository, OtpRepository};
use tracing::{info, warn};

use crate::delivery::OtpDelivery;
use crate::grant::GrantLifecycleManager;

/// Shortest tick the sweep loop accepts.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically marks overdue grants as `Expired`.
pub struct ExpirySweeper<G, O, D, L>
where
    G: AccessGrantRepository,
    O: OtpRepository,
    D: DirectoryRepository,
    L: OtpDelivery,
{
    manager: Arc<GrantLifecycleManager<G, O, D, L>>,
}

impl<G, O, D, L> Clone for ExpirySweeper<G, O, D, L>
where
    G: AccessGrantRepository,
    O: OtpRepository,
    D: DirectoryRepository,
    L: OtpDelivery,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

impl<G, O, D, L> ExpirySweeper<G, O, D, L>
where
    G: AccessGrantRepository + 'static,
    O: OtpRepository + 'static,
    D: DirectoryRepository + 'static,
    L: OtpDelivery + 'static,
{
    pub fn new(manager: Arc<GrantLifecycleManager<G, O, D, L>>) -> Self {
        Self { manager }
    }

    /// Run one sweep. Errors are logged and reported as zero.
    pub async fn collect(&self, now: chrono::DateTime<Utc>) -> u64 {
        match self.manager.sweep_expired(now).await {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "Grant expiry sweep failed");
                0
            }
        }
    }

    /// Spawn the sweep loop, ticking every `interval`. Intervals below
    /// [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn spawn(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "Sweep interval too short, using 1s"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };

        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs(),
                "Starting grant expiry sweeper"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                self.collect(Utc::now()).await;
            }
        })
    }
}
