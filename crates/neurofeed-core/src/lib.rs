//! # neurofeed-core
//!
//! Shared vocabulary for the neurofeedback feed client and server.
//!
//! - **Events**: [`NeurofeedbackEvent`] with timestamp normalization and an
//!   open `metadata` map
//! - **Messages**: [`ClientMessage`] / [`ServerMessage`] WebSocket frames
//!   tagged by `type`, and the [`SimulateRequest`] HTTP body
//! - **Logging**: `tracing` subscriber set-up and log capture for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod logging;
pub mod messages;

pub use events::{Metadata, NeurofeedbackEvent};
pub use messages::{ClientMessage, ServerMessage, SimulateRequest};
