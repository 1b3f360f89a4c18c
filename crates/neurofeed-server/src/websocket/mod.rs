//! WebSocket connection tracking, frame handling, and per-user fan-out.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod session;
