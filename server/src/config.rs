//! Relay behaviour switches, filled from the command line in `main`.

use std::time::Duration;

/// How often the event loop checks for idle sessions when a timeout is set.
pub const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayConfig {
    /// Keep a room around after its last player leaves.
    pub keep_empty_rooms: bool,
    /// Include the sender in its own `player_update` rebroadcast.
    pub echo_to_sender: bool,
    /// Disconnect sessions that have sent nothing for this long.
    pub idle_timeout: Option<Duration>,
}

impl RelayConfig {
    /// Builds the idle timeout from a seconds count where 0 means disabled.
    pub fn with_idle_timeout_secs(mut self, secs: u64) -> Self {
        self.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}
