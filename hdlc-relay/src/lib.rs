//! `hdlc-relay`: an HDLC-style link layer relaying text between stations
//! over TCP.
//!
//! # Architecture
//!
//! ```text
//!   Station A ──┐                        ┌── Station C
//!               │   RR(P) / I / DISC     │
//!   Station B ──┼──────────────────▶  Relay (primary)
//!               │   SNRM ⇄ UA, ACK       │
//!               └────────────────────────┘
//!
//!  ┌────────────────────────────────────┐
//!  │  Relay / Station                   │  polling cycle, routing, sessions
//!  └────┬───────────────────────────────┘
//!  ┌────▼───────────────────────────────┐
//!  │  StationLink                       │  handshake, ACK discipline, FIFO
//!  │    ├── ArqWindow  (N(S)/N(R), 8)   │
//!  │    └── FrameSocket (lines)         │
//!  └────┬───────────────────────────────┘
//!       │ "0101…\n" / "ACK\n" over TCP
//! ```
//!
//! Each module has a single responsibility:
//! - [`frame`]: frame model and the bit-string wire codec
//! - [`window`]: send-side sequence stamping and admission window
//! - [`socket`]: newline-delimited line I/O over a byte stream
//! - [`link`]: one relay↔station session
//! - [`relay`]: accept / poll / deliver cycle
//! - [`station`]: client session answering polls in the background
//! - [`state`]: link finite-state machine types
//! - [`config`]: timeouts and policies

pub mod config;
pub mod frame;
pub mod link;
pub mod relay;
pub mod socket;
pub mod state;
pub mod station;
pub mod window;

pub use config::{HandshakePolicy, LinkConfig, RelayConfig, StationConfig, DEFAULT_PORT};
pub use frame::{Command, Frame, FrameBuilder, FrameError, FrameKind, Supervisory, Unnumbered};
pub use link::{LinkError, StationLink};
pub use relay::{CycleReport, Relay};
pub use station::Station;
