use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
}

/// Immediate acknowledgment of a buffered mutation. Being queued says
/// nothing about whether the flush will find it applicable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queued {
    pub status: QueueStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Queued {
    pub fn new() -> Self {
        Self {
            status: QueueStatus::Queued,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            status: QueueStatus::Queued,
            message: Some(message.into()),
        }
    }
}

impl Default for Queued {
    fn default() -> Self {
        Self::new()
    }
}
