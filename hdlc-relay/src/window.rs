//! Outbound sliding window: sequence stamping and acknowledgment gating.
//!
//! [`ArqWindow`] holds up to [`WINDOW_CAPACITY`] frames that have been
//! admitted but not yet acknowledged by the peer.
//!
//! # Protocol contract
//!
//! - N(S) increments modulo 8 across **consecutive** Info frames only.  Any
//!   Supervisory or Unnumbered admission ends the run, and the next Info
//!   frame is numbered 0 again.
//! - Every Info and Supervisory frame is stamped with the current N(R), so
//!   receive state piggybacks on all outbound numbered traffic.
//! - The base (front) is the oldest unacknowledged frame.  It only advances
//!   on [`ArqWindow::on_acknowledged`].
//! - A full window is backpressure, not an error: the caller drains the
//!   base and waits for its acknowledgment before admitting more.
//!
//! This module only manages state; all stream I/O is the caller's
//! responsibility (see [`crate::link::StationLink`]).

use std::collections::VecDeque;

use thiserror::Error;

use crate::frame::{Frame, FrameKind, SEQ_MODULUS};

/// Number of frames the window admits before applying backpressure.
pub const WINDOW_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// ArqWindow
// ---------------------------------------------------------------------------

/// Send-side window state for one link.
///
/// # Slot layout
///
/// ```text
///  base               next unsent          next free
///   │                      │                    │
///  ─┼──────────────────────┼────────────────────┼──▶
///   │ <── sent, unacked ──▶│ <── admitted ────▶ │
/// ```
#[derive(Debug)]
pub struct ArqWindow {
    /// Admitted frames, oldest first.
    slots: VecDeque<Frame>,

    /// How many slots from the base have been handed to the stream.
    sent: usize,

    capacity: usize,

    /// N(S) of the most recently admitted frame if that frame was an Info
    /// frame, `None` otherwise.
    last_info_seq: Option<u8>,

    /// N(R) piggybacked on outbound Info/Supervisory frames.
    recv_seq: u8,
}

impl Default for ArqWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ArqWindow {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    /// Create a window admitting at most `capacity` frames (≥ 1).
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 1, "window capacity must be at least 1");
        Self {
            slots: VecDeque::with_capacity(capacity),
            sent: 0,
            capacity,
            last_info_seq: None,
            recv_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of admitted frames not yet acknowledged (sent or not).
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }

    /// Number of admitted frames not yet handed to the stream.
    pub fn unsent(&self) -> usize {
        self.slots.len() - self.sent
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// N(S) the next admitted Info frame will carry.
    pub fn next_send_seq(&self) -> u8 {
        self.last_info_seq.map_or(0, |n| (n + 1) % SEQ_MODULUS)
    }

    /// N(R) currently stamped on outbound frames.
    pub fn recv_seq(&self) -> u8 {
        self.recv_seq
    }

    /// Admit `frame` into the next free slot, stamping sequence numbers.
    ///
    /// Fails with [`WindowError::Full`] when the window holds `capacity`
    /// unacknowledged frames; check [`is_full`](Self::is_full) before calling.
    pub fn enqueue(&mut self, frame: Frame) -> Result<(), WindowError> {
        if self.is_full() {
            return Err(WindowError::Full {
                capacity: self.capacity,
            });
        }

        let stamped = match frame.kind() {
            FrameKind::Info => {
                let ns = self.next_send_seq();
                self.last_info_seq = Some(ns);
                frame.stamped(ns, self.recv_seq)
            }
            FrameKind::Supervisory => {
                self.last_info_seq = None;
                frame.stamped(0, self.recv_seq)
            }
            FrameKind::Unnumbered => {
                self.last_info_seq = None;
                frame
            }
        };

        self.slots.push_back(stamped);
        Ok(())
    }

    /// The oldest admitted frame that has not been handed to the stream.
    pub fn next_unsent(&self) -> Option<&Frame> {
        self.slots.get(self.sent)
    }

    /// Record that [`next_unsent`](Self::next_unsent) was written out.
    pub fn mark_sent(&mut self) {
        debug_assert!(self.sent < self.slots.len(), "mark_sent with nothing unsent");
        self.sent = (self.sent + 1).min(self.slots.len());
    }

    /// Process one acknowledgment: release the base slot.
    ///
    /// Returns the acknowledged frame, or `None` when nothing was in flight
    /// (an acknowledgment nobody asked for).
    pub fn on_acknowledged(&mut self) -> Option<Frame> {
        if self.sent == 0 {
            return None;
        }
        self.sent -= 1;
        self.slots.pop_front()
    }

    /// Record an inbound Info frame carrying N(S) = `send_seq`; the next
    /// expected number becomes the N(R) on later outbound frames.
    pub fn on_info_received(&mut self, send_seq: u8) {
        self.recv_seq = (send_seq + 1) % SEQ_MODULUS;
    }

    /// Iterate over all admitted frames from the base onwards.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.slots.iter()
    }
}

/// Errors from window admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window full ({capacity} frames awaiting acknowledgment)")]
    Full { capacity: usize },
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
