//! Wire-format definitions for HDLC-style frames.
//!
//! Every line exchanged between stations is one [`Frame`] rendered as a
//! string of ASCII `'0'`/`'1'` characters, optionally followed by a text
//! payload.  This module is responsible for:
//! - Defining the on-wire layout (address, frame control, payload).
//! - Serialising a [`Frame`] into its bit-string form.
//! - Deserialising a bit-string back into a [`Frame`], returning errors for
//!   malformed, truncated or unknown input.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! Bit positions are character offsets, most significant bit first.
//!
//! ```text
//!  0                              32       40
//! +--------------------------------+--------+------------------ - -
//! |  destination (4 x 8-bit octet) | control|  payload (I only)
//! +--------------------------------+--------+------------------ - -
//!
//! control field:   32  33  34  35  36  37  38  39
//!   Info            0  |  N(S)    | P/F |   N(R)   |
//!   Supervisory     1   0 | S S   | P/F |   N(R)   |
//!   Unnumbered      1   1 | M M   | P/F |  M  M  M |
//! ```
//!
//! The payload has no length prefix; it runs to the end of the line and is
//! capped at [`MAX_PAYLOAD_BITS`].  Longer texts are cut with
//! [`split_payload`] and sent as several frames; an over-long payload that
//! arrives anyway is kept by [`Frame::decode_with_remainder`], which returns
//! the excess as a continuation remainder.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use thiserror::Error;

/// Width of the address field.
pub const ADDRESS_BITS: usize = 32;

/// Width of address + frame control; the payload starts here.
pub const HEADER_BITS: usize = 40;

/// Payload cap in bits (one payload character is one octet on the wire).
pub const MAX_PAYLOAD_BITS: usize = 512;

/// Payload cap in bytes.
pub const MAX_PAYLOAD_BYTES: usize = MAX_PAYLOAD_BITS / 8;

/// N(S) / N(R) are counted modulo this value.
pub const SEQ_MODULUS: u8 = 8;

// Character offset of the frame control field.
const OFF_CONTROL: usize = ADDRESS_BITS;

// ---------------------------------------------------------------------------
// Command catalogue
// ---------------------------------------------------------------------------

/// Supervisory commands (2-bit code in bits 34–35).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Supervisory {
    /// Receive Ready.
    RR,
    /// Receive Not Ready.
    RNR,
    /// Reject.
    REJ,
    /// Selective Reject.
    SREJ,
}

impl Supervisory {
    pub const ALL: [Supervisory; 4] = [Self::RR, Self::RNR, Self::REJ, Self::SREJ];

    pub fn code(self) -> u8 {
        match self {
            Self::RR => 0b00,
            Self::RNR => 0b01,
            Self::REJ => 0b10,
            Self::SREJ => 0b11,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::RR => "RR",
            Self::RNR => "RNR",
            Self::REJ => "REJ",
            Self::SREJ => "SREJ",
        }
    }
}

/// Unnumbered commands (5-bit code split across bits 34–35 and 37–39).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Unnumbered {
    /// Set Normal Response Mode.
    SNRM,
    /// Set Normal Response Mode, extended.
    SNRME,
    /// Set Initialization Mode.
    SIM,
    /// Disconnect.
    DISC,
    /// Unnumbered Acknowledgment.
    UA,
    /// Request Initialization Mode.
    RIM,
    /// Unnumbered Information.
    UI,
    /// Unnumbered Poll.
    UP,
    /// Reset.
    RSET,
    /// Exchange Identification.
    XID,
    /// Frame Reject.
    FRMR,
}

impl Unnumbered {
    pub const ALL: [Unnumbered; 11] = [
        Self::SNRM,
        Self::SNRME,
        Self::SIM,
        Self::DISC,
        Self::UA,
        Self::RIM,
        Self::UI,
        Self::UP,
        Self::RSET,
        Self::XID,
        Self::FRMR,
    ];

    pub fn code(self) -> u8 {
        match self {
            Self::SNRM => 0b00001,
            Self::SNRME => 0b11011,
            Self::SIM => 0b11000,
            Self::DISC => 0b00010,
            Self::UA => 0b00110,
            Self::RIM => 0b10000,
            Self::UI => 0b00000,
            Self::UP => 0b00100,
            Self::RSET => 0b11001,
            Self::XID => 0b11101,
            Self::FRMR => 0b10001,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::SNRM => "SNRM",
            Self::SNRME => "SNRME",
            Self::SIM => "SIM",
            Self::DISC => "DISC",
            Self::UA => "UA",
            Self::RIM => "RIM",
            Self::UI => "UI",
            Self::UP => "UP",
            Self::RSET => "RSET",
            Self::XID => "XID",
            Self::FRMR => "FRMR",
        }
    }
}

/// Any control command, regardless of the frame kind that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Supervisory(Supervisory),
    Unnumbered(Unnumbered),
}

impl Command {
    /// The frame kind this command is valid for.
    pub fn kind(self) -> FrameKind {
        match self {
            Self::Supervisory(_) => FrameKind::Supervisory,
            Self::Unnumbered(_) => FrameKind::Unnumbered,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Supervisory(c) => c.mnemonic(),
            Self::Unnumbered(c) => c.mnemonic(),
        }
    }
}

impl From<Supervisory> for Command {
    fn from(c: Supervisory) -> Self {
        Self::Supervisory(c)
    }
}

impl From<Unnumbered> for Command {
    fn from(c: Unnumbered) -> Self {
        Self::Unnumbered(c)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Command {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Supervisory::ALL
            .into_iter()
            .map(Command::from)
            .chain(Unnumbered::ALL.into_iter().map(Command::from))
            .find(|c| c.mnemonic().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FrameError::UnknownMnemonic(wanted.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// The three mutually exclusive frame kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Info,
    Supervisory,
    Unnumbered,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "I",
            Self::Supervisory => "S",
            Self::Unnumbered => "U",
        })
    }
}

/// One link-layer frame.
///
/// Each variant carries only the fields valid for its kind, so an
/// Unnumbered frame can never hold a sequence number and an Info frame can
/// never hold a command.  Values are immutable; the `with_*` methods return
/// a modified copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Info {
        destination: Ipv4Addr,
        send_seq: u8,
        recv_seq: u8,
        poll_final: bool,
        payload: String,
    },
    Supervisory {
        destination: Ipv4Addr,
        command: Supervisory,
        poll_final: bool,
        recv_seq: u8,
    },
    Unnumbered {
        destination: Ipv4Addr,
        command: Unnumbered,
        poll_final: bool,
    },
}

impl Frame {
    /// Build an Info frame carrying `payload`; sequence numbers start at 0
    /// and are stamped by [`crate::window::ArqWindow`].
    pub fn info(destination: Ipv4Addr, payload: impl Into<String>) -> Result<Self, FrameError> {
        FrameBuilder::new(destination, FrameKind::Info)
            .info(payload)
            .build()
    }

    pub fn supervisory(destination: Ipv4Addr, command: Supervisory) -> Self {
        Self::Supervisory {
            destination,
            command,
            poll_final: false,
            recv_seq: 0,
        }
    }

    pub fn unnumbered(destination: Ipv4Addr, command: Unnumbered) -> Self {
        Self::Unnumbered {
            destination,
            command,
            poll_final: false,
        }
    }

    /// Return a copy with the Poll/Final bit set to `poll_final`.
    pub fn with_poll_final(mut self, value: bool) -> Self {
        match &mut self {
            Self::Info { poll_final, .. }
            | Self::Supervisory { poll_final, .. }
            | Self::Unnumbered { poll_final, .. } => *poll_final = value,
        }
        self
    }

    /// Return a copy carrying the given sequence numbers.
    ///
    /// N(S) only applies to Info frames, N(R) to Info and Supervisory
    /// frames; Unnumbered frames come back unchanged.
    pub(crate) fn stamped(mut self, ns: u8, nr: u8) -> Self {
        match &mut self {
            Self::Info {
                send_seq, recv_seq, ..
            } => {
                *send_seq = ns % SEQ_MODULUS;
                *recv_seq = nr % SEQ_MODULUS;
            }
            Self::Supervisory { recv_seq, .. } => *recv_seq = nr % SEQ_MODULUS,
            Self::Unnumbered { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Info { .. } => FrameKind::Info,
            Self::Supervisory { .. } => FrameKind::Supervisory,
            Self::Unnumbered { .. } => FrameKind::Unnumbered,
        }
    }

    pub fn destination(&self) -> Ipv4Addr {
        match self {
            Self::Info { destination, .. }
            | Self::Supervisory { destination, .. }
            | Self::Unnumbered { destination, .. } => *destination,
        }
    }

    /// The carried command, `None` for Info frames.
    pub fn command(&self) -> Option<Command> {
        match self {
            Self::Info { .. } => None,
            Self::Supervisory { command, .. } => Some(Command::Supervisory(*command)),
            Self::Unnumbered { command, .. } => Some(Command::Unnumbered(*command)),
        }
    }

    /// `true` when this frame carries `command`.
    pub fn is(&self, command: impl Into<Command>) -> bool {
        self.command() == Some(command.into())
    }

    pub fn poll_final(&self) -> bool {
        match self {
            Self::Info { poll_final, .. }
            | Self::Supervisory { poll_final, .. }
            | Self::Unnumbered { poll_final, .. } => *poll_final,
        }
    }

    pub fn send_seq(&self) -> Option<u8> {
        match self {
            Self::Info { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    pub fn recv_seq(&self) -> Option<u8> {
        match self {
            Self::Info { recv_seq, .. } | Self::Supervisory { recv_seq, .. } => Some(*recv_seq),
            Self::Unnumbered { .. } => None,
        }
    }

    /// The text payload; empty for control frames.
    pub fn payload(&self) -> &str {
        match self {
            Self::Info { payload, .. } => payload,
            _ => "",
        }
    }

    /// Serialise this frame into its bit-string line (without the newline).
    pub fn encode(&self) -> String {
        let payload = self.payload();
        let mut out = String::with_capacity(HEADER_BITS + payload.len());
        out.push_str(&encode_address(self.destination()));
        push_bits(&mut out, self.control_byte());
        out.push_str(payload);
        out
    }

    /// Parse a [`Frame`] from one received line.
    ///
    /// Returns [`Err`] if:
    /// - the line is shorter than [`HEADER_BITS`],
    /// - a header character is not `'0'` or `'1'`,
    /// - the unnumbered command code is unknown,
    /// - a control frame carries trailing characters, or
    /// - the payload is over the cap.
    pub fn decode(line: &str) -> Result<Self, FrameError> {
        Self::parse(line, false).map(|(frame, _)| frame)
    }

    /// Parse like [`decode`](Self::decode), except that an Info payload over
    /// the cap is cut at [`MAX_PAYLOAD_BYTES`] (on a char boundary) and the
    /// excess is returned as a continuation remainder.
    pub fn decode_with_remainder(line: &str) -> Result<(Self, Option<String>), FrameError> {
        Self::parse(line, true)
    }

    fn parse(line: &str, keep_remainder: bool) -> Result<(Self, Option<String>), FrameError> {
        let bytes = line.as_bytes();
        if bytes.len() < HEADER_BITS {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        let destination = address_from_bits(&bytes[..ADDRESS_BITS])?;
        let control = parse_bits(&bytes[OFF_CONTROL..HEADER_BITS], OFF_CONTROL)?;
        // The header is pure ASCII at this point, so HEADER_BITS is a char boundary.
        let rest = &line[HEADER_BITS..];
        let poll_final = control & 0b0000_1000 != 0;
        let nr = control & 0b111;

        let mut remainder = None;
        let frame = if control & 0b1000_0000 == 0 {
            let payload = if keep_remainder {
                let (head, tail) = split_payload(rest);
                validate_payload(head)?;
                if let Some(tail) = tail {
                    if tail.contains(['\n', '\r']) {
                        return Err(FrameError::InvalidPayload);
                    }
                    remainder = Some(tail.to_string());
                }
                head
            } else {
                validate_payload(rest)?;
                rest
            };
            Self::Info {
                destination,
                send_seq: (control >> 4) & 0b111,
                recv_seq: nr,
                poll_final,
                payload: payload.to_string(),
            }
        } else if control & 0b0100_0000 == 0 {
            // Two bits always name a valid supervisory command.
            let command = Supervisory::from_code((control >> 4) & 0b11)
                .ok_or(FrameError::UnknownCommand { code: (control >> 4) & 0b11 })?;
            Self::Supervisory {
                destination,
                command,
                poll_final,
                recv_seq: nr,
            }
        } else {
            let code = (((control >> 4) & 0b11) << 3) | nr;
            let command =
                Unnumbered::from_code(code).ok_or(FrameError::UnknownCommand { code })?;
            Self::Unnumbered {
                destination,
                command,
                poll_final,
            }
        };

        if frame.kind() != FrameKind::Info && !rest.is_empty() {
            return Err(FrameError::UnexpectedPayload { kind: frame.kind() });
        }
        Ok((frame, remainder))
    }

    /// The 8-bit frame control field (bit 7 = wire position 32).
    fn control_byte(&self) -> u8 {
        match self {
            Self::Info {
                send_seq,
                recv_seq,
                poll_final,
                ..
            } => ((send_seq & 0b111) << 4) | (u8::from(*poll_final) << 3) | (recv_seq & 0b111),
            Self::Supervisory {
                command,
                poll_final,
                recv_seq,
                ..
            } => {
                0b1000_0000
                    | (command.code() << 4)
                    | (u8::from(*poll_final) << 3)
                    | (recv_seq & 0b111)
            }
            Self::Unnumbered {
                command,
                poll_final,
                ..
            } => {
                let code = command.code();
                0b1100_0000 | ((code >> 3) << 4) | (u8::from(*poll_final) << 3) | (code & 0b111)
            }
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pf = if self.poll_final() { ",P/F" } else { "" };
        match self {
            Self::Info {
                destination,
                send_seq,
                recv_seq,
                payload,
                ..
            } => write!(f, "I(ns={send_seq},nr={recv_seq}{pf}) {destination} {payload:?}"),
            Self::Supervisory {
                destination,
                command,
                recv_seq,
                ..
            } => write!(f, "S/{}(nr={recv_seq}{pf}) {destination}", command.mnemonic()),
            Self::Unnumbered {
                destination,
                command,
                ..
            } => write!(f, "U/{}({}) {destination}", command.mnemonic(), pf.trim_start_matches(',')),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Validating builder for [`Frame`].
///
/// Field combinations are checked once, in [`FrameBuilder::build`]; an
/// invalid combination never produces a frame.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    destination: Ipv4Addr,
    kind: FrameKind,
    command: Option<Command>,
    poll_final: bool,
    send_seq: Option<u8>,
    recv_seq: Option<u8>,
    payload: String,
}

impl FrameBuilder {
    pub fn new(destination: Ipv4Addr, kind: FrameKind) -> Self {
        Self {
            destination,
            kind,
            command: None,
            poll_final: false,
            send_seq: None,
            recv_seq: None,
            payload: String::new(),
        }
    }

    pub fn command(mut self, command: impl Into<Command>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn poll_final(mut self, poll_final: bool) -> Self {
        self.poll_final = poll_final;
        self
    }

    pub fn send_seq(mut self, seq: u8) -> Self {
        self.send_seq = Some(seq);
        self
    }

    pub fn recv_seq(mut self, seq: u8) -> Self {
        self.recv_seq = Some(seq);
        self
    }

    pub fn info(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> Result<Frame, FrameError> {
        for seq in [self.send_seq, self.recv_seq].into_iter().flatten() {
            if seq >= SEQ_MODULUS {
                return Err(FrameError::SequenceOutOfRange(seq));
            }
        }
        if self.kind != FrameKind::Info && !self.payload.is_empty() {
            return Err(FrameError::UnexpectedPayload { kind: self.kind });
        }

        match (self.kind, self.command) {
            (FrameKind::Info, None) => {
                validate_payload(&self.payload)?;
                Ok(Frame::Info {
                    destination: self.destination,
                    send_seq: self.send_seq.unwrap_or(0),
                    recv_seq: self.recv_seq.unwrap_or(0),
                    poll_final: self.poll_final,
                    payload: self.payload,
                })
            }
            (FrameKind::Info, Some(_)) => Err(FrameError::InvalidCombination(
                "info frames carry no command",
            )),
            (FrameKind::Supervisory, Some(Command::Supervisory(command))) => {
                if self.send_seq.is_some() {
                    return Err(FrameError::InvalidCombination(
                        "supervisory frames carry no N(S)",
                    ));
                }
                Ok(Frame::Supervisory {
                    destination: self.destination,
                    command,
                    poll_final: self.poll_final,
                    recv_seq: self.recv_seq.unwrap_or(0),
                })
            }
            (FrameKind::Unnumbered, Some(Command::Unnumbered(command))) => {
                if self.send_seq.is_some() || self.recv_seq.is_some() {
                    return Err(FrameError::InvalidCombination(
                        "unnumbered frames carry no sequence numbers",
                    ));
                }
                Ok(Frame::Unnumbered {
                    destination: self.destination,
                    command,
                    poll_final: self.poll_final,
                })
            }
            (_, None) => Err(FrameError::InvalidCombination(
                "control frames need a command",
            )),
            (_, Some(_)) => Err(FrameError::InvalidCombination(
                "command is not valid for this frame kind",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload and address helpers
// ---------------------------------------------------------------------------

/// Split `text` into the part that fits one frame and the continuation.
///
/// The cut never lands inside a multi-byte character.
pub fn split_payload(text: &str) -> (&str, Option<&str>) {
    if text.len() <= MAX_PAYLOAD_BYTES {
        return (text, None);
    }
    let mut cut = MAX_PAYLOAD_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    (&text[..cut], Some(&text[cut..]))
}

/// Cut `text` into payload-sized pieces, in order.  Empty text yields one
/// empty piece.
pub fn payload_chunks(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let (head, tail) = split_payload(rest?);
        rest = tail;
        Some(head)
    })
}

fn validate_payload(payload: &str) -> Result<(), FrameError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(FrameError::PayloadTooLong { len: payload.len() });
    }
    if payload.contains(['\n', '\r']) {
        return Err(FrameError::InvalidPayload);
    }
    Ok(())
}

/// Render an address as 32 binary characters, one zero-padded octet after
/// another.
pub fn encode_address(addr: Ipv4Addr) -> String {
    let mut out = String::with_capacity(ADDRESS_BITS);
    for octet in addr.octets() {
        push_bits(&mut out, octet);
    }
    out
}

/// Parse exactly 32 binary characters into an address.
pub fn decode_address(bits: &str) -> Result<Ipv4Addr, FrameError> {
    let bytes = bits.as_bytes();
    if bytes.len() != ADDRESS_BITS {
        return Err(FrameError::InvalidAddress(format!(
            "expected {ADDRESS_BITS} bits, got {}",
            bytes.len()
        )));
    }
    address_from_bits(bytes)
}

fn address_from_bits(bytes: &[u8]) -> Result<Ipv4Addr, FrameError> {
    let mut octets = [0u8; 4];
    for (i, chunk) in bytes.chunks(8).enumerate() {
        octets[i] = parse_bits(chunk, i * 8)?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Parse dotted-decimal text such as `"192.168.1.5"`.
pub fn parse_octets(text: &str) -> Result<Ipv4Addr, FrameError> {
    let parts: Vec<&str> = text.trim().split('.').collect();
    if parts.len() != 4 {
        return Err(FrameError::InvalidAddress(text.to_string()));
    }
    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        let value: u32 = part
            .parse()
            .map_err(|_| FrameError::InvalidAddress(text.to_string()))?;
        *slot = u8::try_from(value).map_err(|_| FrameError::AddressOctetOutOfRange(value))?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Append the 8 bits of `value`, MSB first.
fn push_bits(out: &mut String, value: u8) {
    for shift in (0..8).rev() {
        out.push(if (value >> shift) & 1 == 1 { '1' } else { '0' });
    }
}

/// Fold up to 8 `'0'`/`'1'` bytes into a number; `offset` is the wire
/// position of `bits[0]`, used for error reporting.
fn parse_bits(bits: &[u8], offset: usize) -> Result<u8, FrameError> {
    let mut value = 0u8;
    for (i, &b) in bits.iter().enumerate() {
        value = match b {
            b'0' => value << 1,
            b'1' => (value << 1) | 1,
            other => {
                return Err(FrameError::InvalidBit {
                    position: offset + i,
                    found: char::from(other),
                })
            }
        };
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from frame construction and decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is {len} bits, shorter than the 40-bit header")]
    TooShort { len: usize },
    #[error("invalid bit {found:?} at position {position}")]
    InvalidBit { position: usize, found: char },
    #[error("unknown command code {code:05b}")]
    UnknownCommand { code: u8 },
    #[error("unknown command mnemonic {0:?}")]
    UnknownMnemonic(String),
    #[error("{kind}-frames carry no payload")]
    UnexpectedPayload { kind: FrameKind },
    #[error("payload of {len} bytes exceeds the 64-byte cap")]
    PayloadTooLong { len: usize },
    #[error("payload contains a line break")]
    InvalidPayload,
    #[error("line of {len} bytes is not valid UTF-8")]
    InvalidUtf8 { len: usize },
    #[error("address octet {0} exceeds 255")]
    AddressOctetOutOfRange(u32),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("sequence number {0} is outside 0..8")]
    SequenceOutOfRange(u8),
    #[error("invalid frame: {0}")]
    InvalidCombination(&'static str),
}
