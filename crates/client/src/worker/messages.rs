//! Page-to-worker messages and background sync.

use serde::Deserialize;
use serde_json::Value;

pub const SKIP_WAITING: &str = "SKIP_WAITING";

/// A message the worker acts on. Anything else posted to it is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
}

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(rename = "type", borrow)]
    kind: Option<&'a str>,
}

impl ControlMessage {
    /// Recognize a control message by its `type` field.
    pub fn parse(data: &Value) -> Option<Self> {
        let envelope = Envelope::deserialize(data).ok()?;
        match envelope.kind? {
            SKIP_WAITING => Some(ControlMessage::SkipWaiting),
            _ => None,
        }
    }
}

/// Acknowledgement of a background sync event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub tag: String,
    /// Whether the tag is the one the application registers.
    pub recognized: bool,
}

/// Acknowledge a sync event. Nothing is replayed; the hook exists so the
/// registration does not fail.
pub fn acknowledge_sync(tag: &str, registered: &str) -> SyncOutcome {
    let recognized = tag == registered;
    if recognized {
        tracing::info!(tag, "background sync acknowledged");
    } else {
        tracing::debug!(tag, "ignoring sync for unknown tag");
    }
    SyncOutcome { tag: tag.to_string(), recognized }
}
