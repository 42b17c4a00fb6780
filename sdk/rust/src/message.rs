use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A record produced to or consumed from a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Topic the message belongs to
    pub topic: String,

    /// Message offset within the topic log
    pub offset: u64,

    /// Message key
    pub key: Option<Bytes>,

    /// Message payload
    pub payload: Bytes,

    /// Timestamp when message was produced (ms since epoch)
    pub timestamp: u64,
}

impl Message {
    /// The harness payload for the `n`th produced message
    pub fn numbered(topic: &str, n: usize) -> Self {
        Self {
            topic: topic.to_string(),
            offset: 0,
            key: Some(Bytes::from(n.to_string())),
            payload: Bytes::from(format!("Message #{}", n)),
            timestamp: now_millis(),
        }
    }

    /// Get payload as string
    pub fn payload_as_string(&self) -> Option<String> {
        String::from_utf8(self.payload.to_vec()).ok()
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
