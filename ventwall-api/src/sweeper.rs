//! The background expiry sweep.
//!
//! A single task per process wakes on a fixed cadence and deletes posts whose
//! auto-delete deadline has passed. Failures on individual posts are logged
//! inside the sweep and retried on the next wake-up, so one bad post never
//! stalls the cadence.

use std::{sync::Arc, time::Duration};
use time::UtcDateTime;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use ventwall_db::{Store, ops};

pub async fn run(store: Arc<dyn Store>, cadence: Duration, cancellation: CancellationToken) {
    info!(cadence_seconds = cadence.as_secs(), "Expiry sweeper started");

    let mut interval = tokio::time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of an interval fires immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                info!("Expiry sweeper shutting down");
                return;
            }
            _ = interval.tick() => {}
        }

        match ops::sweep_expired(store.as_ref(), UtcDateTime::now()).await {
            Ok(summary) if summary.deleted > 0 || summary.failed > 0 => {
                info!(
                    deleted = summary.deleted,
                    failed = summary.failed,
                    "Expiry sweep finished"
                );
            }
            Ok(_) => debug!("Expiry sweep found nothing to do"),
            Err(error) => error!(%error, "Expiry sweep could not select expired posts"),
        }
    }
}
