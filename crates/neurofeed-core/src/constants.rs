//! Package-level constants.

/// Current version of the neurofeed workspace (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "neurofeed";

/// Maximum number of events a client keeps in its buffer.
pub const MAX_BUFFERED_EVENTS: usize = 20;

/// WebSocket endpoint path.
pub const WS_PATH: &str = "/ws";

/// Simulation trigger endpoint path.
pub const SIMULATE_PATH: &str = "/api/simulate-neurofeedback";

/// Achievement resource path prefix.
pub const ACHIEVEMENTS_PATH: &str = "/api/achievements";

/// Shared achievement resource path prefix.
pub const SHARED_ACHIEVEMENTS_PATH: &str = "/api/shared-achievements";
