//! Link finite-state machine types.
//!
//! Transitions are driven by [`crate::link::StationLink`] (handshake, close)
//! and [`crate::relay::Relay`] (draining, disconnect).
//!
//! ```text
//!  CONNECTING ──accept/connect──▶ HANDSHAKING ──SNRM/UA──▶ ESTABLISHED
//!                                      │                    │      ▲
//!                                 I/O error           poll: DISC  │ FIFO empty
//!                                      │                    ▼      │
//!                                      │            DISCONNECTING  DRAINING
//!                                      ▼                    │
//!                                    CLOSED ◀───────────────┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Stream exists; no protocol exchange yet.
    #[default]
    Connecting,
    /// SNRM/UA exchange in progress.
    Handshaking,
    /// Normal response mode; polls and data flow.
    Established,
    /// The relay is delivering queued messages to this station.
    Draining,
    /// A DISC has been sent or received.
    Disconnecting,
    /// Stream released; every further operation fails.
    Closed,
}

impl LinkState {
    /// `true` while frames may still be exchanged.
    pub fn is_open(self) -> bool {
        self != Self::Closed
    }

    pub fn is_established(self) -> bool {
        matches!(self, Self::Established | Self::Draining)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Established => "established",
            Self::Draining => "draining",
            Self::Disconnecting => "disconnecting",
            Self::Closed => "closed",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draining_still_counts_as_established() {
        assert!(LinkState::Draining.is_established());
        assert!(!LinkState::Disconnecting.is_established());
        assert!(LinkState::Disconnecting.is_open());
        assert!(!LinkState::Closed.is_open());
        assert_eq!(LinkState::default(), LinkState::Connecting);
    }
}
