use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle events the core emits. Delivery transport (email, sockets) lives
/// behind the trait and is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationEvent {
    Created,
    Claimed,
    DriverAccepted,
    PickupConfirmed,
    DeliveryConfirmed,
    Expiring,
    Deleted,
}

impl DonationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "donation_created",
            Self::Claimed => "donation_claimed",
            Self::DriverAccepted => "driver_accepted",
            Self::PickupConfirmed => "pickup_confirmed",
            Self::DeliveryConfirmed => "delivery_confirmed",
            Self::Expiring => "donation_expiring",
            Self::Deleted => "donation_deleted",
        }
    }
}

#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn notify(&self, event: DonationEvent, donation_id: Uuid, user_ids: &[Uuid]);
}

/// Default emitter: structured log lines only.
pub struct LogEmitter;

#[async_trait]
impl NotificationEmitter for LogEmitter {
    async fn notify(&self, event: DonationEvent, donation_id: Uuid, user_ids: &[Uuid]) {
        info!(event = event.as_str(), %donation_id, recipients = user_ids.len(), "notify");
    }
}

/// Emission is decoupled from the transition: the update commits first, the
/// event goes out on a spawned task, and a failed or slow emitter can never
/// roll back or delay the user-visible response.
pub fn emit_after_commit(
    emitter: std::sync::Arc<dyn NotificationEmitter>,
    event: DonationEvent,
    donation_id: Uuid,
    user_ids: Vec<Uuid>,
) {
    if user_ids.is_empty() {
        warn!(event = event.as_str(), %donation_id, "notification has no recipients");
        return;
    }
    tokio::spawn(async move {
        emitter.notify(event, donation_id, &user_ids).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEmitter(AtomicUsize);

    #[async_trait]
    impl NotificationEmitter for CountingEmitter {
        async fn notify(&self, _: DonationEvent, _: Uuid, _: &[Uuid]) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn event_names_match_wire_contract() {
        assert_eq!(DonationEvent::Created.as_str(), "donation_created");
        assert_eq!(DonationEvent::Claimed.as_str(), "donation_claimed");
        assert_eq!(DonationEvent::DriverAccepted.as_str(), "driver_accepted");
        assert_eq!(DonationEvent::PickupConfirmed.as_str(), "pickup_confirmed");
        assert_eq!(DonationEvent::DeliveryConfirmed.as_str(), "delivery_confirmed");
        assert_eq!(DonationEvent::Expiring.as_str(), "donation_expiring");
        assert_eq!(DonationEvent::Deleted.as_str(), "donation_deleted");
    }

    #[tokio::test]
    async fn emit_after_commit_reaches_emitter() {
        let emitter = Arc::new(CountingEmitter(AtomicUsize::new(0)));
        emit_after_commit(
            emitter.clone(),
            DonationEvent::Claimed,
            Uuid::new_v4(),
            vec![Uuid::new_v4()],
        );
        // spawned task; give it a tick
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(emitter.0.load(Ordering::SeqCst), 1);
    }
}
