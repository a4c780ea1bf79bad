//! Line-oriented stream abstraction.
//!
//! [`FrameSocket`] wraps any reliable byte stream (a `TcpStream` in
//! production, `tokio::io::duplex` in tests) and speaks newline-delimited
//! lines: either a frame's bit-string or the acknowledgment token.  All
//! protocol logic lives elsewhere; this module owns only byte I/O.

use std::io;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};

use crate::frame::Frame;

/// Fixed line written back for every received frame.
///
/// It cannot collide with a frame encoding, which is at least 40 binary
/// characters long.
pub const ACK_TOKEN: &str = "ACK";

/// Longest line accepted from the peer, newline included.
const MAX_LINE: u64 = 4096;

/// One line read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// The acknowledgment token.
    Ack,
    /// Anything else, without the line terminator; normally a frame.
    Frame(String),
    /// A line that is not valid UTF-8, terminator stripped.
    Garbled(Vec<u8>),
    /// The peer closed its side of the stream.
    Eof,
}

/// A frame-and-acknowledgment oriented stream.
#[derive(Debug)]
pub struct FrameSocket<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl<S: AsyncRead + AsyncWrite> FrameSocket<S> {
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Encode `frame` and write it as one line.
    pub async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.write_line(&frame.encode()).await
    }

    /// Write the acknowledgment token as one line.
    pub async fn send_ack(&mut self) -> io::Result<()> {
        self.write_line(ACK_TOKEN).await
    }

    /// Write `line` verbatim followed by a newline.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Read the next line and classify it.
    ///
    /// Not cancellation safe: a read abandoned half-way loses the partial
    /// line, so a timed-out link must be discarded.
    pub async fn recv_line(&mut self) -> io::Result<Line> {
        let mut buf = Vec::new();
        let n = (&mut self.reader)
            .take(MAX_LINE)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(Line::Eof);
        }
        if buf.last() != Some(&b'\n') && n as u64 >= MAX_LINE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {MAX_LINE} bytes"),
            ));
        }

        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        if buf == ACK_TOKEN.as_bytes() {
            return Ok(Line::Ack);
        }
        match String::from_utf8(buf) {
            Ok(line) => Ok(Line::Frame(line)),
            Err(e) => Ok(Line::Garbled(e.into_bytes())),
        }
    }

    /// Close the write side; the peer observes end-of-stream.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
