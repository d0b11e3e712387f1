use chrono::{DateTime, Utc};
use serde::Serialize;

/// Transport lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Open or on its way there; `connect()` is a no-op in these states
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Connecting)
    }
}

/// Point-in-time view of the connection, published after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub reconnect_attempt: u32,
    pub last_error: Option<String>,
    pub last_frame_at: Option<DateTime<Utc>>,
    pub snapshot_received: bool,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus {
            state: ConnectionState::Disconnected,
            reconnect_attempt: 0,
            last_error: None,
            last_frame_at: None,
            snapshot_received: false,
        }
    }
}

/// What a consumer should render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    /// Connected; data is current
    Live,
    /// Not connected, cached data is still shown
    Stale,
    /// No data yet and nothing has failed
    Waiting,
    /// Not connected, nothing cached, and an error is present
    Unavailable,
}

impl Availability {
    pub fn derive(state: ConnectionState, has_cached_data: bool, has_error: bool) -> Self {
        if state.is_open() {
            Availability::Live
        } else if has_cached_data {
            Availability::Stale
        } else if has_error {
            Availability::Unavailable
        } else {
            Availability::Waiting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Closing.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
    }

    #[test]
    fn test_unavailable_only_without_cache() {
        use ConnectionState::*;
        assert_eq!(Availability::derive(Open, false, true), Availability::Live);
        assert_eq!(Availability::derive(Disconnected, true, true), Availability::Stale);
        assert_eq!(Availability::derive(Disconnected, false, true), Availability::Unavailable);
        assert_eq!(Availability::derive(Connecting, false, false), Availability::Waiting);
    }
}
