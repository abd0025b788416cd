//! Message-oriented transport over tokio byte streams.
//!
//! Wire layout of one frame:
//!
//! ```text
//! +------+----------------+-----------------+
//! | kind | len (u32 LE)   | payload         |
//! | 1 B  | 4 B            | len bytes       |
//! +------+----------------+-----------------+
//! kind: 0x01 text (UTF-8), 0x02 binary
//! ```

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::frame::Frame;

/// Largest accepted payload.
pub const MAX_FRAME_LEN: usize = 1 << 20;

const HEADER_LEN: usize = 5;
const KIND_TEXT: u8 = 0x01;
const KIND_BINARY: u8 = 0x02;

// ─── Transport trait ─────────────────────────────────────────────────────────

/// A duplex channel that preserves frame boundaries and the text/binary split.
pub trait Transport: Send {
    /// Send one frame.
    fn send(&mut self, frame: Frame) -> impl Future<Output = io::Result<()>> + Send;

    /// Receive the next frame. `Ok(None)` means the peer closed cleanly.
    fn recv(&mut self) -> impl Future<Output = io::Result<Option<Frame>>> + Send;
}

// ─── Codec ───────────────────────────────────────────────────────────────────

fn encode(frame: &Frame) -> io::Result<Vec<u8>> {
    let (kind, payload) = match frame {
        Frame::Text(s)   => (KIND_TEXT, s.as_bytes()),
        Frame::Binary(b) => (KIND_BINARY, b.as_slice()),
    };
    if payload.len() > MAX_FRAME_LEN {
        return Err(too_large(payload.len()));
    }
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(kind);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Pop one complete frame off the front of `buf`, if there is one.
fn decode(buf: &mut Vec<u8>) -> io::Result<Option<Frame>> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let kind = buf[0];
    let len = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    if kind != KIND_TEXT && kind != KIND_BINARY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown frame kind {kind:#04x}"),
        ));
    }
    if len > MAX_FRAME_LEN {
        return Err(too_large(len));
    }
    if buf.len() < HEADER_LEN + len {
        return Ok(None);
    }
    let payload: Vec<u8> = buf.drain(..HEADER_LEN + len).skip(HEADER_LEN).collect();
    let frame = if kind == KIND_TEXT {
        let text = String::from_utf8(payload)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Frame::Text(text)
    } else {
        Frame::Binary(payload)
    };
    Ok(Some(frame))
}

fn too_large(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN}-byte limit"),
    )
}

async fn read_frame<R>(inner: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<Frame>>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(frame) = decode(buf)? {
            return Ok(Some(frame));
        }
        if inner.read_buf(buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid-frame"))
            };
        }
    }
}

async fn write_frame<W>(inner: &mut W, frame: &Frame) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode(frame)?;
    inner.write_all(&bytes).await?;
    inner.flush().await
}

// ─── FramedStream ────────────────────────────────────────────────────────────

/// [`Transport`] over any tokio byte stream (TCP, duplex pipe, ...).
pub struct FramedStream<S> {
    stream: S,
    buf:    Vec<u8>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Frame `stream` with an empty read buffer.
    pub fn new(stream: S) -> Self {
        Self { stream, buf: Vec::new() }
    }

    /// Split into independent halves. Bytes already buffered stay with the reader.
    pub fn into_split(self) -> (FrameReader<ReadHalf<S>>, FrameWriter<WriteHalf<S>>) {
        let (r, w) = tokio::io::split(self.stream);
        (FrameReader { inner: r, buf: self.buf }, FrameWriter { inner: w })
    }
}

impl<S> Transport for FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: Frame) -> io::Result<()> {
        write_frame(&mut self.stream, &frame).await
    }

    async fn recv(&mut self) -> io::Result<Option<Frame>> {
        read_frame(&mut self.stream, &mut self.buf).await
    }
}

/// Read half of a [`FramedStream`].
///
/// [`recv`](Self::recv) is cancel-safe: partial frames stay buffered, so it
/// can sit in a `tokio::select!` arm.
pub struct FrameReader<R> {
    inner: R,
    buf:   Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a read half with an empty buffer.
    pub fn new(inner: R) -> Self {
        Self { inner, buf: Vec::new() }
    }

    /// Next frame, or `Ok(None)` on clean close.
    pub async fn recv(&mut self) -> io::Result<Option<Frame>> {
        read_frame(&mut self.inner, &mut self.buf).await
    }
}

/// Write half of a [`FramedStream`].
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wrap a write half.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame.
    pub async fn send(&mut self, frame: &Frame) -> io::Result<()> {
        write_frame(&mut self.inner, frame).await
    }

    /// Flush and shut down the write direction.
    pub async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
