//! Broadcasting of submission status changes to any number of subscribers.

pub mod submission_events;

pub use submission_events::{EventBroadcaster, SubmissionEvent};
