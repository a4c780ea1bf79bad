//! Per-station link: framing, acknowledgment and handshake over one stream.
//!
//! A [`StationLink`] owns everything the protocol knows about one peer:
//! - the [`FrameSocket`] carrying newline-delimited lines,
//! - the [`ArqWindow`] stamping N(S)/N(R) and gating admission,
//! - the station address used as routing key,
//! - a FIFO of text the relay still has to deliver to this station.
//!
//! # Acknowledgment discipline
//!
//! Every frame line written is answered with exactly one `ACK` line, and
//! every frame line read is answered before the frame is decoded.  The
//! sender waits for that `ACK` before writing its next frame (stop-and-wait),
//! bounded by [`LinkConfig::ack_timeout`].  Nothing is ever retransmitted;
//! a missing acknowledgment fails the link.
//!
//! # Addresses
//!
//! On the relay side the address names the remote station (first the peer
//! IP, then whatever the station announced in its UA).  On a client the
//! address is the station's own.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{HandshakePolicy, LinkConfig};
use crate::frame::{payload_chunks, Frame, FrameError, Unnumbered};
use crate::socket::{FrameSocket, Line};
use crate::state::LinkState;
use crate::window::{ArqWindow, WindowError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed")]
    Closed,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// A line arrived that is not a valid frame.  It was acknowledged; the
    /// stream is still in step.
    #[error("undecodable frame: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("handshake mismatch: {0}")]
    HandshakeMismatch(String),

    /// A frame was received where an `ACK` line was expected.
    #[error("expected acknowledgment, got {0:?}")]
    MissingAck(String),

    /// A well-formed frame that makes no sense at this point of the exchange.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl LinkError {
    /// `true` when the stream can no longer be trusted and the link must be
    /// dropped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Frame(_) | Self::ProtocolViolation(_))
    }
}

// ---------------------------------------------------------------------------
// StationLink
// ---------------------------------------------------------------------------

/// One end of a relay↔station session.
#[derive(Debug)]
pub struct StationLink<S = TcpStream> {
    socket: FrameSocket<S>,
    window: ArqWindow,
    address: Ipv4Addr,
    peer: Option<SocketAddr>,
    state: LinkState,
    config: LinkConfig,
    /// Texts waiting to be delivered to this station (relay side).
    outgoing: VecDeque<String>,
    /// Excess of the last received Info payload beyond the cap.
    remainder: Option<String>,
}

impl StationLink<TcpStream> {
    /// Open a TCP connection to `server`.  The link address defaults to the
    /// local IP; override it with [`with_address`](Self::with_address).
    pub async fn connect(server: SocketAddr, config: LinkConfig) -> Result<Self, LinkError> {
        let stream = TcpStream::connect(server).await?;
        stream.set_nodelay(true)?;
        let local = stream.local_addr()?;
        let mut link = Self::new(stream, ipv4_of(local.ip()), config);
        link.peer = Some(server);
        log::debug!("[link] connected to {server} as {}", link.address);
        Ok(link)
    }

    /// Wrap an accepted stream.  The link address starts as the peer IP.
    pub fn from_tcp(stream: TcpStream, config: LinkConfig) -> Result<Self, LinkError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        let mut link = Self::new(stream, ipv4_of(peer.ip()), config);
        link.peer = Some(peer);
        Ok(link)
    }
}

impl<S: AsyncRead + AsyncWrite> StationLink<S> {
    pub fn new(stream: S, address: Ipv4Addr, config: LinkConfig) -> Self {
        Self {
            socket: FrameSocket::new(stream),
            window: ArqWindow::new(),
            address,
            peer: None,
            state: LinkState::Connecting,
            config,
            outgoing: VecDeque::new(),
            remainder: None,
        }
    }

    pub fn with_address(mut self, address: Ipv4Addr) -> Self {
        self.address = address;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LinkState) {
        log::trace!("[link] {}: {} → {state}", self.address, self.state);
        self.state = state;
    }

    pub fn window(&self) -> &ArqWindow {
        &self.window
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Primary side: send SNRM (P=1) and expect UA.
    ///
    /// The responder's UA carries its station address, which replaces the
    /// provisional one.
    pub async fn handshake_as_initiator(&mut self) -> Result<(), LinkError> {
        self.set_state(LinkState::Handshaking);
        let snrm = Frame::unnumbered(self.address, Unnumbered::SNRM).with_poll_final(true);
        self.send_frame(snrm).await?;

        match self.receive_frame().await {
            Ok(reply) if reply.is(Unnumbered::UA) => {
                if reply.destination() != self.address {
                    log::debug!(
                        "[link] {} announced itself as {}",
                        self.address,
                        reply.destination()
                    );
                    self.address = reply.destination();
                }
            }
            Ok(reply) => self.handshake_mismatch(format!("expected U/UA, got {reply}"))?,
            Err(LinkError::Frame(e)) => self.handshake_mismatch(e.to_string())?,
            Err(e) => return Err(e),
        }

        self.set_state(LinkState::Established);
        Ok(())
    }

    /// Secondary side: expect SNRM and answer UA (F=1) carrying our address.
    pub async fn handshake_as_responder(&mut self) -> Result<(), LinkError> {
        self.set_state(LinkState::Handshaking);

        match self.receive_frame().await {
            Ok(request) if request.is(Unnumbered::SNRM) => {}
            Ok(request) => self.handshake_mismatch(format!("expected U/SNRM, got {request}"))?,
            Err(LinkError::Frame(e)) => self.handshake_mismatch(e.to_string())?,
            Err(e) => return Err(e),
        }

        let ua = Frame::unnumbered(self.address, Unnumbered::UA).with_poll_final(true);
        self.send_frame(ua).await?;
        self.set_state(LinkState::Established);
        Ok(())
    }

    fn handshake_mismatch(&self, detail: String) -> Result<(), LinkError> {
        match self.config.handshake {
            HandshakePolicy::Lenient => {
                log::warn!("[link] handshake with {}: {detail}; continuing", self.address);
                Ok(())
            }
            HandshakePolicy::Strict => Err(LinkError::HandshakeMismatch(detail)),
        }
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    /// Admit `frame` and transmit everything queued, each write waiting for
    /// its acknowledgment.
    pub async fn send_frame(&mut self, frame: Frame) -> Result<(), LinkError> {
        self.enqueue(frame).await?;
        while self.drain_one().await?.is_some() {}
        Ok(())
    }

    /// Admit `frame` into the window without transmitting it.
    ///
    /// While the window is full this drains the base first, so the call
    /// blocks until the peer acknowledges the oldest frame.
    pub async fn enqueue(&mut self, frame: Frame) -> Result<(), LinkError> {
        self.ensure_open()?;
        while self.window.is_full() {
            log::debug!(
                "[link] window to {} full ({}); draining base",
                self.address,
                self.window.in_flight()
            );
            if self.drain_one().await?.is_none() {
                // Full of frames that were written but never acknowledged.
                return Err(LinkError::Closed);
            }
        }
        self.window.enqueue(frame)?;
        Ok(())
    }

    /// Write the oldest untransmitted frame and wait for its acknowledgment.
    ///
    /// Returns the acknowledged frame, or `None` if nothing was waiting.
    pub async fn drain_one(&mut self) -> Result<Option<Frame>, LinkError> {
        self.ensure_open()?;
        let Some(frame) = self.window.next_unsent() else {
            return Ok(None);
        };
        self.socket.send_frame(frame).await?;
        log::debug!("[link] → {} {frame}", self.address);
        self.window.mark_sent();

        self.await_ack().await?;
        Ok(self.window.on_acknowledged())
    }

    async fn await_ack(&mut self) -> Result<(), LinkError> {
        match with_deadline(self.config.ack_timeout, self.socket.recv_line()).await? {
            Line::Ack => Ok(()),
            Line::Eof => Err(LinkError::Closed),
            Line::Frame(other) => Err(LinkError::MissingAck(other)),
            Line::Garbled(bytes) => Err(LinkError::MissingAck(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }

    /// Send `text` to `destination` as one or more Info frames, splitting at
    /// the payload cap.
    pub async fn send_text(&mut self, destination: Ipv4Addr, text: &str) -> Result<(), LinkError> {
        for chunk in payload_chunks(text) {
            self.send_frame(Frame::info(destination, chunk)?).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Receiving
    // -----------------------------------------------------------------------

    /// Read the next frame, acknowledging it before it is decoded.
    ///
    /// Stray `ACK` lines are skipped.  A line that fails to decode, including
    /// one that is not UTF-8, yields [`LinkError::Frame`]; it has been
    /// acknowledged, so the caller may carry on.  Inbound Info frames update
    /// the N(R) piggybacked on later outbound frames, and any payload beyond
    /// the cap is held for [`take_remainder`](Self::take_remainder).
    pub async fn receive_frame(&mut self) -> Result<Frame, LinkError> {
        self.ensure_open()?;
        self.remainder = None;
        loop {
            let line = match with_deadline(self.config.read_timeout, self.socket.recv_line()).await? {
                Line::Eof => return Err(LinkError::Closed),
                Line::Ack => {
                    log::warn!("[link] stray acknowledgment from {}", self.address);
                    continue;
                }
                Line::Garbled(bytes) => {
                    self.socket.send_ack().await?;
                    return Err(FrameError::InvalidUtf8 { len: bytes.len() }.into());
                }
                Line::Frame(line) => line,
            };

            self.socket.send_ack().await?;
            let (frame, remainder) = Frame::decode_with_remainder(&line)?;
            if let Some(ns) = frame.send_seq() {
                self.window.on_info_received(ns);
            }
            if let Some(rest) = &remainder {
                log::debug!("[link] {} sent {} bytes past the payload cap", self.address, rest.len());
            }
            self.remainder = remainder;
            log::debug!("[link] ← {} {frame}", self.address);
            return Ok(frame);
        }
    }

    /// Take the over-cap excess of the frame last returned by
    /// [`receive_frame`](Self::receive_frame).
    pub fn take_remainder(&mut self) -> Option<String> {
        self.remainder.take()
    }

    // -----------------------------------------------------------------------
    // Outgoing text FIFO
    // -----------------------------------------------------------------------

    /// Queue `text` for delivery to this station.
    pub fn enqueue_outgoing_text(&mut self, text: impl Into<String>) {
        self.outgoing.push_back(text.into());
    }

    /// Take every queued text, oldest first, leaving the FIFO empty.
    pub fn drain_outgoing_text(&mut self) -> Vec<String> {
        self.outgoing.drain(..).collect()
    }

    pub fn pending_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Release the stream.  Idempotent; shutdown failures are only logged.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.set_state(LinkState::Closed);
        if let Err(e) = self.socket.shutdown().await {
            log::debug!("[link] shutdown of {}: {e}", self.address);
        }
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(LinkError::Closed)
        }
    }
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T, LinkError> {
    match deadline {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| LinkError::Timeout(limit))?
            .map_err(LinkError::from),
        None => fut.await.map_err(LinkError::from),
    }
}

fn ipv4_of(ip: IpAddr) -> Ipv4Addr {
    match ip {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(v6) => v6.to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
