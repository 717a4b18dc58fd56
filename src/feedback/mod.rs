//! Feedback sibling of the voice session: posts the session's role-tagged
//! transcript to the feedback endpoint and renders the textual result,
//! degrading to canned content when the service is unreachable.

mod client;
mod transcript;

pub use client::{FeedbackClient, CANNED_FEEDBACK};
pub use transcript::{Role, TranscriptEntry};
