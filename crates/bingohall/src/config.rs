//! Server configuration.

use std::time::Duration;

use bingohall_room::EngineConfig;

/// Settings for a [`BingoServer`](crate::BingoServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Game rules and timers.
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout: Duration::from_secs(120),
            engine: EngineConfig::default(),
        }
    }
}
