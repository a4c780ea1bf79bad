//! Client station: a secondary that only transmits when polled.
//!
//! # Architecture
//!
//! ```text
//!  Application
//!      │ send_user_text / disconnect        Station
//!      │                              ┌──────────────────┐
//!      ├────────────────────────────▶ │ requests (mpsc)  │
//!      │                              │ inbound  (mpsc)  │
//!      ▼ recv / poll_once             └────────┬─────────┘
//!  delivered texts ◀──────────────────────────  │ event_loop task
//!                                               │
//!                                    StationLink (responder)
//! ```
//!
//! The event loop blocks on the link.  Each RR poll from the relay is
//! answered with exactly one frame: the next pending text chunk as an Info
//! frame, a DISC if the application asked to leave, or RR when idle.  Info
//! frames from the relay are pushed to the inbound channel.

use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::StationConfig;
use crate::frame::{payload_chunks, split_payload, Frame, FrameError, Supervisory, Unnumbered};
use crate::link::{LinkError, StationLink};
use crate::state::LinkState;

/// Delivered texts held for the application; past this, new ones are dropped.
const INBOUND_DEPTH: usize = 64;

#[derive(Debug)]
enum Request {
    Text { destination: Ipv4Addr, text: String },
    Disconnect,
}

/// Handle to a connected client station.
pub struct Station {
    address: Ipv4Addr,
    default_destination: Ipv4Addr,
    requests: mpsc::Sender<Request>,
    inbound: mpsc::Receiver<String>,
    connected: Arc<AtomicBool>,
    disconnect_timeout: Duration,
    handle: JoinHandle<()>,
}

impl Station {
    /// Connect to the relay at `server`, complete the handshake and start
    /// answering polls in the background.
    pub async fn connect(server: SocketAddr, config: StationConfig) -> Result<Self, LinkError> {
        let mut link = StationLink::connect(server, config.link_config()).await?;
        if let Some(address) = config.address {
            link = link.with_address(address);
        }
        link.handshake_as_responder().await?;

        let address = link.address();
        log::info!("[station] {address} attached to relay {server}");

        let (request_tx, request_rx) = mpsc::channel(config.queue_depth.max(1));
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_DEPTH);
        let connected = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(event_loop(link, request_rx, inbound_tx, connected.clone()));

        Ok(Self {
            address,
            default_destination: config.default_destination.unwrap_or(address),
            requests: request_tx,
            inbound: inbound_rx,
            connected,
            disconnect_timeout: config.disconnect_timeout,
            handle,
        })
    }

    /// The address announced to the relay.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn default_destination(&self) -> Ipv4Addr {
        self.default_destination
    }

    /// `false` once the session has ended, from either side.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue `text` for the default destination.
    pub async fn send_user_text(&self, text: impl Into<String>) -> Result<(), LinkError> {
        self.send_user_text_to(self.default_destination, text).await
    }

    /// Queue `text` for `destination`; it leaves with the next poll(s).
    ///
    /// Waits while the request queue is full.
    pub async fn send_user_text_to(
        &self,
        destination: Ipv4Addr,
        text: impl Into<String>,
    ) -> Result<(), LinkError> {
        let text = text.into();
        if text.contains(['\n', '\r']) {
            return Err(FrameError::InvalidPayload.into());
        }
        self.requests
            .send(Request::Text { destination, text })
            .await
            .map_err(|_| LinkError::Closed)
    }

    /// Take one delivered text if any is waiting.
    ///
    /// Up to 64 texts are buffered; further deliveries are dropped with a
    /// warning until the application catches up, so polls keep being
    /// answered.
    pub fn poll_once(&mut self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Wait for the next delivered text; `None` after the session ends and
    /// everything delivered has been taken.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Ask the relay to end the session and wait for its DISC.
    ///
    /// Texts queued before this call are sent first.  If the relay does not
    /// answer within the configured timeout the stream is simply dropped.
    pub async fn disconnect(self) {
        let Self {
            address,
            requests,
            connected,
            disconnect_timeout,
            mut handle,
            ..
        } = self;

        if requests.send(Request::Disconnect).await.is_err() {
            log::debug!("[station] {address} session already over");
        }
        if timeout(disconnect_timeout, &mut handle).await.is_err() {
            log::warn!("[station] {address}: no DISC from relay within {disconnect_timeout:?}");
            handle.abort();
            connected.store(false, Ordering::Release);
        }
    }
}

// ---------------------------------------------------------------------------
// Background event loop
// ---------------------------------------------------------------------------

async fn event_loop<S: AsyncRead + AsyncWrite>(
    mut link: StationLink<S>,
    mut requests: mpsc::Receiver<Request>,
    inbound: mpsc::Sender<String>,
    connected: Arc<AtomicBool>,
) {
    // Requests taken off the channel but not yet fully sent; a text longer
    // than one payload leaves its remainder at the front.
    let mut backlog: VecDeque<Request> = VecDeque::new();

    loop {
        let frame = match link.receive_frame().await {
            Ok(frame) => frame,
            Err(e) if !e.is_fatal() => {
                log::warn!("[station] {}: {e}", link.address());
                continue;
            }
            Err(e) => {
                log::info!("[station] {} lost the relay: {e}", link.address());
                break;
            }
        };

        match frame {
            Frame::Info { payload, .. } => {
                let rest = link.take_remainder();
                let extra = rest.iter().flat_map(|r| payload_chunks(r)).map(str::to_owned);
                for text in std::iter::once(payload).chain(extra) {
                    deliver(&inbound, text);
                }
            }
            Frame::Supervisory {
                command: Supervisory::RR,
                ..
            } => {
                if backlog.is_empty() {
                    if let Ok(request) = requests.try_recv() {
                        backlog.push_back(request);
                    }
                }
                match answer_poll(&mut link, &mut backlog).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        log::info!("[station] {} lost the relay: {e}", link.address());
                        break;
                    }
                }
            }
            Frame::Unnumbered {
                command: Unnumbered::DISC,
                ..
            } => {
                log::info!("[station] relay closed the session");
                break;
            }
            other => log::warn!("[station] ignoring unexpected {other}"),
        }
    }

    connected.store(false, Ordering::Release);
    link.close().await;
}

/// Hand a delivered text to the application without blocking the loop: a
/// full inbound queue drops the text rather than stalling poll answers.
fn deliver(inbound: &mpsc::Sender<String>, text: String) {
    match inbound.try_send(text) {
        Ok(()) => {}
        Err(TrySendError::Full(text)) => {
            log::warn!("[station] {INBOUND_DEPTH} texts unread; dropping {text:?}");
        }
        Err(TrySendError::Closed(_)) => {
            log::debug!("[station] nobody is reading delivered texts");
        }
    }
}

/// Answer one poll.  Returns `false` once the session is over.
async fn answer_poll<S: AsyncRead + AsyncWrite>(
    link: &mut StationLink<S>,
    backlog: &mut VecDeque<Request>,
) -> Result<bool, LinkError> {
    let me = link.address();
    let idle = Frame::supervisory(me, Supervisory::RR).with_poll_final(true);

    match backlog.pop_front() {
        None => link.send_frame(idle).await?,
        Some(Request::Text { destination, text }) => {
            let (head, tail) = split_payload(&text);
            let frame = match Frame::info(destination, head) {
                Ok(frame) => frame.with_poll_final(true),
                Err(e) => {
                    log::warn!("[station] dropping text for {destination}: {e}");
                    idle
                }
            };
            if let Some(rest) = tail {
                backlog.push_front(Request::Text {
                    destination,
                    text: rest.to_string(),
                });
            }
            link.send_frame(frame).await?;
        }
        Some(Request::Disconnect) => {
            link.set_state(LinkState::Disconnecting);
            let disc = Frame::unnumbered(me, Unnumbered::DISC).with_poll_final(true);
            link.send_frame(disc).await?;
            let echo = link.receive_frame().await?;
            if !echo.is(Unnumbered::DISC) {
                log::warn!("[station] expected DISC echo, got {echo}");
            }
            log::info!("[station] {me} disconnected");
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use tokio::io::DuplexStream;

    use super::*;
    use crate::config::LinkConfig;
    use crate::frame::encode_address;
    use crate::socket::{FrameSocket, Line};

    const ME: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    struct Harness {
        relay: FrameSocket<DuplexStream>,
        _requests: mpsc::Sender<Request>,
        inbound: mpsc::Receiver<String>,
        handle: JoinHandle<()>,
    }

    fn start(inbound_depth: usize) -> Harness {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let link = StationLink::new(a, ME, LinkConfig::default());
        let (request_tx, request_rx) = mpsc::channel(8);
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_depth);
        let connected = Arc::new(AtomicBool::new(true));
        Harness {
            relay: FrameSocket::new(b),
            _requests: request_tx,
            inbound: inbound_rx,
            handle: tokio::spawn(event_loop(link, request_rx, inbound_tx, connected)),
        }
    }

    /// Write one line as the relay would and wait for the station's ACK.
    async fn push_line(relay: &mut FrameSocket<DuplexStream>, line: &str) {
        relay.write_line(line).await.unwrap();
        assert_eq!(relay.recv_line().await.unwrap(), Line::Ack);
    }

    async fn poll(relay: &mut FrameSocket<DuplexStream>) -> Frame {
        let rr = Frame::supervisory(ME, Supervisory::RR).with_poll_final(true);
        push_line(relay, &rr.encode()).await;
        let answer = match relay.recv_line().await.unwrap() {
            Line::Frame(line) => Frame::decode(&line).unwrap(),
            other => panic!("expected a frame, got {other:?}"),
        };
        relay.send_ack().await.unwrap();
        answer
    }

    #[tokio::test]
    async fn unread_deliveries_do_not_stall_poll_answers() {
        let mut h = start(2);
        for i in 0..5 {
            let info = Frame::info(ME, format!("t{i}")).unwrap();
            push_line(&mut h.relay, &info.encode()).await;
        }

        let answer = poll(&mut h.relay).await;
        assert!(answer.is(Supervisory::RR));
        assert!(answer.poll_final());

        assert_eq!(h.inbound.try_recv().unwrap(), "t0");
        assert_eq!(h.inbound.try_recv().unwrap(), "t1");
        assert!(h.inbound.try_recv().is_err(), "overflow is dropped");
        h.handle.abort();
    }

    #[tokio::test]
    async fn over_long_delivery_arrives_in_chunks() {
        let mut h = start(8);
        let text = "q".repeat(crate::frame::MAX_PAYLOAD_BYTES + 4);
        push_line(&mut h.relay, &format!("{}00000000{text}", encode_address(ME))).await;

        let first = h.inbound.recv().await.unwrap();
        let second = h.inbound.recv().await.unwrap();
        assert_eq!(first.len(), crate::frame::MAX_PAYLOAD_BYTES);
        assert_eq!(second, "qqqq");
        h.handle.abort();
    }
}
