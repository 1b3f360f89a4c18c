//! # neurofeed-client
//!
//! Client for the real-time neurofeedback feed.
//!
//! - **Connection manager**: [`NeurofeedbackClient::connect`] /
//!   [`NeurofeedbackClient::disconnect`], one socket per client instance,
//!   registration handshake on open
//! - **Dispatcher**: [`dispatcher::dispatch_frame`] applies one inbound frame
//!   to the client state
//! - **Event buffer**: [`EventBuffer`], newest first, capped at
//!   [`MAX_BUFFERED_EVENTS`]
//! - **Simulation trigger**: [`NeurofeedbackClient::simulate_event`]
//! - **Achievements**: [`AchievementsApi`], a thin REST client for the
//!   achievements backend

#![deny(unsafe_code)]

pub mod achievements;
pub mod buffer;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
mod http;
pub mod state;

pub use achievements::{Achievement, AchievementsApi};
pub use buffer::EventBuffer;
pub use client::{EventCallback, NeurofeedbackClient};
pub use config::ClientConfig;
pub use errors::ClientError;
pub use neurofeed_core::constants::MAX_BUFFERED_EVENTS;
pub use neurofeed_core::{Metadata, NeurofeedbackEvent};
pub use state::{ConnectionState, FeedState};
