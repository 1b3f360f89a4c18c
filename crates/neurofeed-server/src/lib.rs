//! # neurofeed-server
//!
//! Reference axum server for the neurofeedback feed.
//!
//! - `GET /ws`: WebSocket gateway; a `register` frame binds the socket to a user
//! - `POST /api/simulate-neurofeedback`: synthesizes an event and pushes it to
//!   every socket registered for the target user
//! - `GET /health`: liveness and connection counters
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod simulate;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::NeurofeedServer;
