//! # Wire message carried by the bus and the stream endpoint.
//!
//! Every frame on the subscribe stream is one UTF-8 JSON text frame:
//! ```text
//! {"type": "new_report", "report": <Report>}
//! ```
//! The payload type is generic: the hub carries opaque `Arc<Value>` reports,
//! while consumers decode frames with `Message<Value>` and group afterwards.
//! Frames with any other `type` decode as [`Message::Unknown`] and are ignored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tagged bus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message<R = Arc<Value>> {
    /// A report was ingested (or is being replayed from the cache).
    NewReport {
        /// The report document.
        report: R,
    },
    /// Reserved message type this build does not understand.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Builds a `new_report` message around a hub-side report.
    pub fn new_report(report: Arc<Value>) -> Self {
        Message::NewReport { report }
    }

    /// Serializes the message into a single text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<R> Message<R> {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Message::NewReport { .. } => "new_report",
            Message::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_shape() {
        let msg = Message::new_report(Arc::new(json!({"id": "r1"})));
        let frame: Value = serde_json::from_str(&msg.to_frame().unwrap()).unwrap();
        assert_eq!(frame, json!({"type": "new_report", "report": {"id": "r1"}}));
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let msg: Message<Value> = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, Message::Unknown);
        assert_eq!(msg.as_label(), "unknown");
    }

    #[test]
    fn test_missing_type_is_an_error() {
        assert!(serde_json::from_str::<Message<Value>>(r#"{"report":{}}"#).is_err());
    }
}
