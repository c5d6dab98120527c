//! Server configuration.

/// Default capacity of each session's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 128;

/// Configuration for a [`PushServer`](crate::PushServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bounded queue length between `send_cmd` callers and the response stream
    /// of one client. A full queue makes `send_cmd` wait. Never zero.
    outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build a config with the given queue length (clamped to at least 1).
    pub fn with_outbound_capacity(capacity: usize) -> Self {
        Self {
            outbound_capacity: capacity.max(1),
        }
    }

    pub const fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }
}
