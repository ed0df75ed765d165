use std::collections::HashSet;
use std::time::Duration;

use tracing::{error, info};
use uuid::Uuid;

use crate::donations::repo;
use crate::notify::DonationEvent;
use crate::state::AppState;

/// Background lifecycle jobs. Both sweeps are idempotent over the data; an
/// overlapping run can at worst duplicate a notification, never a deletion.
pub fn spawn(state: AppState) {
    let expiry_state = state.clone();
    tokio::spawn(async move {
        let period = Duration::from_secs(expiry_state.config.matching.expiry_sweep_minutes * 60);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = run_expiry_sweep(&expiry_state).await {
                error!(error = %e, "expiry sweep failed");
            }
        }
    });

    tokio::spawn(async move {
        let period = Duration::from_secs(state.config.matching.warning_sweep_minutes * 60);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = run_warning_sweep(&state).await {
                error!(error = %e, "warning sweep failed");
            }
        }
    });
}

/// Hard-deletes everything past expiry (delivered donations are immutable and
/// excluded), cleans up orphaned images and tells the donor.
pub async fn run_expiry_sweep(state: &AppState) -> anyhow::Result<()> {
    let expired = repo::delete_expired(&state.db).await?;
    if expired.is_empty() {
        return Ok(());
    }
    info!(count = expired.len(), "expired donations removed");

    for donation in expired {
        if let Some(key) = &donation.image_key {
            if let Err(e) = state.storage.delete_object(key).await {
                error!(error = %e, key, "expired image cleanup failed");
            }
        }
        state
            .notifier
            .notify(DonationEvent::Deleted, donation.id, &[donation.donor_id])
            .await;
    }
    Ok(())
}

/// Warns donors about donations expiring inside the forward window, at most
/// once per donor per run even when several of their donations qualify.
pub async fn run_warning_sweep(state: &AppState) -> anyhow::Result<()> {
    let window = state.config.matching.expiry_warning_minutes;
    let expiring = repo::expiring_within(&state.db, window).await?;

    let mut warned: HashSet<Uuid> = HashSet::new();
    for donation in expiring {
        if !warned.insert(donation.donor_id) {
            continue;
        }
        state
            .notifier
            .notify(DonationEvent::Expiring, donation.id, &[donation.donor_id])
            .await;
    }
    if !warned.is_empty() {
        info!(donors = warned.len(), "expiry warnings sent");
    }
    Ok(())
}
