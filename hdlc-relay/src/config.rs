//! Timeouts and policies for links, the relay and client stations.
//!
//! The acknowledgment layer never retransmits; these bounds are the only
//! thing that stops a hung peer from stalling its caller forever.
//! `None` means "wait indefinitely".

use std::net::Ipv4Addr;
use std::time::Duration;

/// TCP port the relay listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 4444;

/// What to do when the peer answers a handshake with the wrong frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePolicy {
    /// Log the mismatch and treat the session as established anyway.
    #[default]
    Lenient,
    /// Fail the handshake with [`crate::link::LinkError::HandshakeMismatch`].
    Strict,
}

/// Per-link parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkConfig {
    /// How long a sent frame may wait for the peer's acknowledgment line.
    pub ack_timeout: Option<Duration>,
    /// How long [`crate::link::StationLink::receive_frame`] waits for a line.
    pub read_timeout: Option<Duration>,
    pub handshake: HandshakePolicy,
}

/// Relay (primary station) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Bounded wait for a new connection in each accept phase.
    pub accept_timeout: Duration,
    /// Bounded wait for a station's answer to a poll.
    pub poll_timeout: Duration,
    /// Bounded wait for a station to acknowledge a frame.
    pub ack_timeout: Duration,
    pub handshake: HandshakePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            accept_timeout: Duration::from_millis(250),
            poll_timeout: Duration::from_secs(2),
            ack_timeout: Duration::from_secs(2),
            handshake: HandshakePolicy::Lenient,
        }
    }
}

impl RelayConfig {
    /// Parameters applied to every accepted link.
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            ack_timeout: Some(self.ack_timeout),
            read_timeout: Some(self.poll_timeout),
            handshake: self.handshake,
        }
    }
}

/// Client station parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    /// Address announced to the relay; defaults to the local socket address.
    pub address: Option<Ipv4Addr>,
    /// Target of [`crate::station::Station::send_user_text`]; defaults to
    /// the station's own address.
    pub default_destination: Option<Ipv4Addr>,
    /// Capacity of the outgoing request queue.
    pub queue_depth: usize,
    /// Client reads are unbounded by default: the relay decides when to poll.
    pub read_timeout: Option<Duration>,
    pub ack_timeout: Option<Duration>,
    /// How long [`crate::station::Station::disconnect`] waits for the
    /// relay's DISC before tearing the stream down.
    pub disconnect_timeout: Duration,
    pub handshake: HandshakePolicy,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            address: None,
            default_destination: None,
            queue_depth: 8,
            read_timeout: None,
            ack_timeout: None,
            disconnect_timeout: Duration::from_secs(5),
            handshake: HandshakePolicy::Lenient,
        }
    }
}

impl StationConfig {
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            ack_timeout: self.ack_timeout,
            read_timeout: self.read_timeout,
            handshake: self.handshake,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_links_are_always_bounded() {
        let cfg = RelayConfig::default();
        let link = cfg.link_config();
        assert_eq!(link.ack_timeout, Some(cfg.ack_timeout));
        assert_eq!(link.read_timeout, Some(cfg.poll_timeout));
    }

    #[test]
    fn station_defaults_wait_indefinitely() {
        let link = StationConfig::default().link_config();
        assert_eq!(link.read_timeout, None);
        assert_eq!(link.ack_timeout, None);
        assert_eq!(link.handshake, HandshakePolicy::Lenient);
    }
}
