//! Completion event types and broadcast bus.
//!
//! Terminal pipeline states are pushed to subscribers over a single
//! broadcast channel. Events carry the owning user, and consumers
//! (WebSocket fan-out, webhooks, telemetry) subscribe independently and
//! filter by user. Delivery is fire-and-forget: emission never fails
//! the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::defaults::EVENT_BUS_CAPACITY;

/// Kind of terminal state an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    ResumeProcessed,
    ResumeProcessingFailed,
}

impl CompletionKind {
    /// Dot-namespaced wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResumeProcessed => "resume.processed",
            Self::ResumeProcessingFailed => "resume.processing_failed",
        }
    }
}

/// Terminal-state notification for one unit of work, scoped to the
/// owning user.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    pub kind: CompletionKind,
    pub resume_id: Uuid,
    /// Owning user; consumers filter their subscription on this.
    pub user_id: Option<Uuid>,
    /// Terminal processing status string ("completed" or "failed").
    pub status: String,
    pub processing_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CompletionEvent {
    pub fn processed(resume_id: Uuid, user_id: Option<Uuid>, secs: f64) -> Self {
        Self {
            kind: CompletionKind::ResumeProcessed,
            resume_id,
            user_id,
            status: "completed".to_string(),
            processing_time_seconds: secs,
            error: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn failed(resume_id: Uuid, user_id: Option<Uuid>, secs: f64, error: String) -> Self {
        Self {
            kind: CompletionKind::ResumeProcessingFailed,
            resume_id,
            user_id,
            status: "failed".to_string(),
            processing_time_seconds: secs,
            error: Some(error),
            occurred_at: Utc::now(),
        }
    }
}

/// Broadcast bus for completion events.
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CompletionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all completion events. Callers filter by
    /// [`CompletionEvent::user_id`].
    pub fn subscribe(&self) -> broadcast::Receiver<CompletionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. Returns the receiver count; zero receivers is not
    /// an error.
    pub fn emit(&self, event: CompletionEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    /// Current number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
