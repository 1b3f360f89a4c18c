//! WebSocket frames and HTTP bodies exchanged with the feed server.
//!
//! Frames are JSON objects discriminated by a `type` field:
//!
//! | direction | `type` | payload |
//! |-----------|--------|---------|
//! | client → server | `register` | `userId` |
//! | server → client | `registered` | `success` |
//! | server → client | `neurofeedback` | `data` ([`NeurofeedbackEvent`]) |
//! | server → client | `error` | `message` |

use serde::{Deserialize, Serialize};

use crate::events::NeurofeedbackEvent;

/// Frame sent by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Bind this socket to a user.
    Register {
        /// User the socket belongs to.
        #[serde(rename = "userId")]
        user_id: i64,
    },
}

/// Frame sent by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Answer to a `register` frame.
    Registered {
        /// Whether the registration was accepted.
        success: bool,
    },
    /// A new event for the registered user.
    Neurofeedback {
        /// The event payload.
        data: NeurofeedbackEvent,
    },
    /// Server-side protocol error.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// Any other `type` value. Never serialized by this crate.
    #[serde(other, skip_serializing)]
    Unknown,
}

/// Body of `POST /api/simulate-neurofeedback`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    /// User the synthetic event is addressed to.
    pub user_id: i64,
    /// Brain region to attribute the event to.
    pub brain_region_id: String,
    /// Requested intensity; the server picks one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}
