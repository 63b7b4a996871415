//! Submission status events for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::ErrorKind;
use crate::submission::{Submission, SubmissionId, SubmissionStatus};

/// Emitted after every committed status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvent {
    pub submission_id: SubmissionId,
    pub status: SubmissionStatus,
    /// Status before the transition; `None` for intake.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<SubmissionStatus>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub retry_count: u32,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionEvent {
    /// Builds the event describing `submission`'s current state.
    pub fn from_submission(
        submission: &Submission,
        previous_status: Option<SubmissionStatus>,
    ) -> Self {
        let message = match &submission.error_info {
            Some(info) => info.message.clone(),
            None => match previous_status {
                None => "Submission received".to_string(),
                Some(prev) => format!("{} -> {}", prev, submission.status),
            },
        };

        Self {
            submission_id: submission.id.clone(),
            status: submission.status,
            previous_status,
            error_kind: submission.error_info.as_ref().map(|e| e.kind),
            retry_count: submission.retry_count,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts submission events for streaming.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<SubmissionEvent>>,
}

impl EventBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: SubmissionEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
