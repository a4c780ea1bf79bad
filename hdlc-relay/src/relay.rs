//! The relay: primary station of a star of client stations.
//!
//! # Cycle
//!
//! ```text
//!  ┌──────────────┐   ┌─────────────────────────┐   ┌──────────────────┐
//!  │ accept phase │──▶│ poll phase              │──▶│ delivery phase   │
//!  │ ≤ 1 new link │   │ RR(P) to every station, │   │ drain each FIFO  │
//!  │ SNRM ⇄ UA    │   │ collect I / DISC / RR   │   │ as Info frames   │
//!  └──────────────┘   └─────────────────────────┘   └──────────────────┘
//! ```
//!
//! Links are evicted after the pass that observed their failure or
//! disconnect, never while the pass is iterating.  Routes collected in the
//! poll phase are resolved afterwards against the surviving links, so a
//! message addressed to a station that left in the same cycle is reported
//! undeliverable.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::config::RelayConfig;
use crate::frame::{payload_chunks, Frame, Supervisory, Unnumbered};
use crate::link::{LinkError, StationLink};
use crate::state::LinkState;

/// What one [`Relay::run_cycle`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Address of the station admitted in the accept phase.
    pub accepted: Option<Ipv4Addr>,
    /// Stations polled.
    pub polled: usize,
    /// Messages queued for at least one station.
    pub routed: usize,
    /// Messages whose destination matched no station.
    pub undeliverable: usize,
    /// Messages written to stations in the delivery phase.
    pub delivered: usize,
    /// Stations removed this cycle.
    pub evicted: Vec<Ipv4Addr>,
}

/// Answer to one poll.
enum PollOutcome {
    Idle,
    /// One or more payload-sized texts; more than one when the station
    /// sent past the cap.
    Message { destination: Ipv4Addr, texts: Vec<String> },
    Disconnect,
}

pub struct Relay {
    listener: TcpListener,
    links: Vec<StationLink<TcpStream>>,
    config: RelayConfig,
    ever_connected: bool,
}

impl Relay {
    /// Listen on every interface at `port`.
    pub async fn listen(port: u16, config: RelayConfig) -> Result<Self, LinkError> {
        Self::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), config).await
    }

    pub async fn bind(addr: SocketAddr, config: RelayConfig) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(addr).await?;
        log::info!("[relay] listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            links: Vec::new(),
            config,
            ever_connected: false,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Addresses of the active stations, in admission order.
    pub fn station_addresses(&self) -> Vec<Ipv4Addr> {
        self.links.iter().map(StationLink::address).collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// `true` once a station has connected and every station has since left.
    pub fn is_finished(&self) -> bool {
        self.ever_connected && self.links.is_empty()
    }

    /// Run cycles until the active set empties after having been non-empty.
    pub async fn run_until_empty(&mut self) {
        while !self.is_finished() {
            let report = self.run_cycle().await;
            if report != CycleReport::default() {
                log::debug!("[relay] cycle: {report:?}");
            }
        }
        log::info!("[relay] all stations disconnected; stopping");
    }

    /// One accept → poll → deliver cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport {
            accepted: self.accept_phase().await,
            ..CycleReport::default()
        };
        self.poll_phase(&mut report).await;
        self.delivery_phase(&mut report).await;
        report
    }

    /// Close every link without the DISC exchange.
    pub async fn shutdown(&mut self) {
        for mut link in self.links.drain(..) {
            link.close().await;
        }
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn accept_phase(&mut self) -> Option<Ipv4Addr> {
        let (stream, peer) = match timeout(self.config.accept_timeout, self.listener.accept()).await {
            Err(_) => return None,
            Ok(Err(e)) => {
                log::warn!("[relay] accept failed: {e}");
                return None;
            }
            Ok(Ok(accepted)) => accepted,
        };

        let mut link = match StationLink::from_tcp(stream, self.config.link_config()) {
            Ok(link) => link,
            Err(e) => {
                log::warn!("[relay] rejecting {peer}: {e}");
                return None;
            }
        };

        if let Err(e) = link.handshake_as_initiator().await {
            log::warn!("[relay] handshake with {peer} failed: {e}");
            link.close().await;
            return None;
        }

        let address = link.address();
        log::info!("[relay] station {address} joined from {peer}");
        self.links.push(link);
        self.ever_connected = true;
        Some(address)
    }

    async fn poll_phase(&mut self, report: &mut CycleReport) {
        let mut evict = Vec::new();
        let mut routes = Vec::new();

        for (idx, link) in self.links.iter_mut().enumerate() {
            report.polled += 1;
            match poll_station(link).await {
                Ok(PollOutcome::Idle) => {}
                Ok(PollOutcome::Message { destination, texts }) => {
                    for text in texts {
                        log::info!("[relay] {} → {destination}: {text:?}", link.address());
                        routes.push((destination, text));
                    }
                }
                Ok(PollOutcome::Disconnect) => {
                    log::info!("[relay] station {} disconnected", link.address());
                    evict.push(idx);
                }
                Err(e) if !e.is_fatal() => {
                    log::warn!("[relay] ignoring answer from {}: {e}", link.address());
                }
                Err(e) => {
                    log::warn!("[relay] dropping station {}: {e}", link.address());
                    evict.push(idx);
                }
            }
        }

        self.evict(evict, report).await;
        for (destination, text) in routes {
            self.route(destination, text, report);
        }
    }

    async fn delivery_phase(&mut self, report: &mut CycleReport) {
        let mut evict = Vec::new();

        for (idx, link) in self.links.iter_mut().enumerate() {
            let queued = link.drain_outgoing_text();
            if queued.is_empty() {
                continue;
            }

            link.set_state(LinkState::Draining);
            let address = link.address();
            let mut failed = false;
            for text in queued {
                match link.send_text(address, &text).await {
                    Ok(()) => report.delivered += 1,
                    Err(e) if !e.is_fatal() => {
                        log::warn!("[relay] cannot deliver {text:?} to {address}: {e}");
                    }
                    Err(e) => {
                        log::warn!("[relay] dropping station {address}: {e}");
                        failed = true;
                        break;
                    }
                }
            }

            if failed {
                evict.push(idx);
            } else {
                link.set_state(LinkState::Established);
            }
        }

        self.evict(evict, report).await;
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Queue `text` on every station at `destination`.
    fn route(&mut self, destination: Ipv4Addr, text: String, report: &mut CycleReport) {
        let mut matched = false;
        for link in self.links.iter_mut().filter(|l| l.address() == destination) {
            link.enqueue_outgoing_text(text.clone());
            matched = true;
        }

        if matched {
            report.routed += 1;
        } else {
            log::warn!("[relay] no station at {destination}; discarding {text:?}");
            report.undeliverable += 1;
        }
    }

    /// Remove and close the links at `indices` (ascending, no duplicates).
    async fn evict(&mut self, indices: Vec<usize>, report: &mut CycleReport) {
        for idx in indices.into_iter().rev() {
            let mut link = self.links.remove(idx);
            report.evicted.push(link.address());
            link.close().await;
        }
    }
}

/// Send RR (P=1) and classify the station's answer.
async fn poll_station(link: &mut StationLink<TcpStream>) -> Result<PollOutcome, LinkError> {
    let poll = Frame::supervisory(link.address(), Supervisory::RR).with_poll_final(true);
    link.send_frame(poll).await?;

    match link.receive_frame().await? {
        Frame::Supervisory {
            command: Supervisory::RR,
            ..
        } => Ok(PollOutcome::Idle),
        Frame::Info {
            destination,
            payload,
            ..
        } => {
            let mut texts = vec![payload];
            if let Some(rest) = link.take_remainder() {
                texts.extend(payload_chunks(&rest).map(str::to_owned));
            }
            Ok(PollOutcome::Message { destination, texts })
        }
        Frame::Unnumbered {
            command: Unnumbered::DISC,
            ..
        } => {
            link.set_state(LinkState::Disconnecting);
            let echo = Frame::unnumbered(link.address(), Unnumbered::DISC).with_poll_final(true);
            link.send_frame(echo).await?;
            Ok(PollOutcome::Disconnect)
        }
        other => Err(LinkError::ProtocolViolation(format!(
            "unexpected answer to poll: {other}"
        ))),
    }
}
