//! Event types pushed to live tag listeners
//!
//! Serialized as internally tagged JSON so each SSE `data:` frame carries its
//! own `type` discriminator:
//!
//! ```json
//! {"type":"connected","message":"..."}
//! {"type":"newTag","tag":{"id":1,"assetTag":"00123",...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::models::AssetTagRecord;

/// Live listener event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TagEvent {
    /// Sent once, immediately after a stream is accepted
    Connected {
        /// Human-readable greeting
        message: String,
    },

    /// A new asset tag was persisted
    NewTag {
        /// The persisted record
        tag: AssetTagRecord,
    },
}

impl TagEvent {
    /// Get event type as string (matches the serialized `type` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            TagEvent::Connected { .. } => "connected",
            TagEvent::NewTag { .. } => "newTag",
        }
    }

    /// Build the greeting sent on stream acceptance
    pub fn connected(message: impl Into<String>) -> Self {
        TagEvent::Connected {
            message: message.into(),
        }
    }
}
