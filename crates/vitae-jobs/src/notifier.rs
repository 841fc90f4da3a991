//! Completion notifier.
//!
//! Pushes terminal pipeline states to subscribers on the event bus,
//! scoped to the owning user. Delivery is fire-and-forget: transport
//! problems are logged and never escalate into pipeline failures.

use tracing::debug;
use uuid::Uuid;

use vitae_core::{CompletionEvent, EventBus};

/// Best-effort terminal-state notifier.
#[derive(Clone)]
pub struct CompletionNotifier {
    bus: EventBus,
}

impl CompletionNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// The bus this notifier emits on, for wiring subscribers.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Announce a completed resume.
    pub fn processed(&self, resume_id: Uuid, user_id: Option<Uuid>, secs: f64) {
        self.emit(CompletionEvent::processed(resume_id, user_id, secs));
    }

    /// Announce a failed resume.
    pub fn failed(&self, resume_id: Uuid, user_id: Option<Uuid>, secs: f64, error: String) {
        self.emit(CompletionEvent::failed(resume_id, user_id, secs, error));
    }

    fn emit(&self, event: CompletionEvent) {
        let resume_id = event.resume_id;
        let kind = event.kind;
        let delivered = self.bus.emit(event);
        if delivered == 0 {
            debug!(
                subsystem = "notifier",
                resume_id = %resume_id,
                event = kind.as_str(),
                "No subscribers for completion event"
            );
        } else {
            debug!(
                subsystem = "notifier",
                resume_id = %resume_id,
                event = kind.as_str(),
                delivered,
                "Completion event delivered"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn processed_event_reaches_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let notifier = CompletionNotifier::new(bus);

        let resume_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        notifier.processed(resume_id, Some(user_id), 3.2);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.resume_id, resume_id);
        assert_eq!(event.user_id, Some(user_id));
        assert_eq!(event.status, "completed");
    }

    #[tokio::test]
    async fn failure_event_carries_error() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let notifier = CompletionNotifier::new(bus);

        notifier.failed(Uuid::new_v4(), None, 12.0, "chain exhausted".into());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, "failed");
        assert_eq!(event.error.as_deref(), Some("chain exhausted"));
    }

    #[test]
    fn notify_without_subscribers_never_errors() {
        let notifier = CompletionNotifier::new(EventBus::new());
        // No receivers; both paths must be silent no-ops.
        notifier.processed(Uuid::new_v4(), None, 0.1);
        notifier.failed(Uuid::new_v4(), None, 0.1, "e".into());
    }
}
