//! Response bodies and the framing each one needs on the wire.
//!
//! A [`Body`] is either a fixed byte payload, a producer that writes
//! chunks while the response is being sent, or a structured value that is
//! encoded to JSON at send time. [`Body::materialize`] reduces all three to a
//! [`Payload`], which only knows about the two framings HTTP/1.1 offers:
//! `Content-Length` or `Transfer-Encoding: chunked`.

use crate::http::CRLF;
use crate::http::error::SendError;
use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::fmt;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// User procedure that writes the chunks of a chunked body.
///
/// Called once per send. The terminal zero-length chunk is written by the
/// response after the producer returns `Ok`.
pub type ChunkProducer = Box<dyn FnOnce(&mut ChunkWriter<'_>) -> io::Result<()> + Send>;

pub enum Body {
    Fixed(Bytes),
    Chunked(ChunkProducer),
    Structured(Structured),
}

/// What actually goes on the wire after a body has been materialized.
pub enum Payload {
    Length(Bytes),
    Chunked(ChunkProducer),
}

impl Body {
    pub fn empty() -> Body {
        Body::Fixed(Bytes::new())
    }

    pub fn chunked<F>(producer: F) -> Body
    where
        F: FnOnce(&mut ChunkWriter<'_>) -> io::Result<()> + Send + 'static,
    {
        Body::Chunked(Box::new(producer))
    }

    pub fn json<T: Serialize + Send + 'static>(value: T) -> Body {
        Body::Structured(Structured::new(value))
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Body::Chunked(_))
    }

    /// Reduces the body to its wire framing.
    ///
    /// Structured values are encoded here; an encoding failure is reported
    /// before anything has been written.
    pub fn materialize(self) -> Result<Payload, SendError> {
        match self {
            Body::Fixed(bytes) => Ok(Payload::Length(bytes)),
            Body::Chunked(producer) => Ok(Payload::Chunked(producer)),
            Body::Structured(structured) => Ok(Payload::Length(structured.encode()?)),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Fixed(bytes) => f.debug_tuple("Fixed").field(bytes).finish(),
            Body::Chunked(_) => f.write_str("Chunked(..)"),
            Body::Structured(structured) => f.debug_tuple("Structured").field(structured).finish(),
        }
    }
}

impl Payload {
    /// `Content-Length` for fixed payloads, `None` when chunked.
    pub fn content_length(&self) -> Option<usize> {
        match self {
            Payload::Length(bytes) => Some(bytes.len()),
            Payload::Chunked(_) => None,
        }
    }
}

type Encoder = Box<dyn Fn() -> serde_json::Result<Vec<u8>> + Send>;

/// A value waiting to be encoded as JSON.
pub struct Structured {
    encoder: Encoder,
}

impl Structured {
    pub fn new<T: Serialize + Send + 'static>(value: T) -> Structured {
        Structured {
            encoder: Box::new(move || serde_json::to_vec(&value)),
        }
    }

    /// Encodes the value. Repeated calls yield identical bytes.
    pub fn encode(&self) -> serde_json::Result<Bytes> {
        (self.encoder)().map(Bytes::from)
    }
}

impl fmt::Debug for Structured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Structured(..)")
    }
}

/// Stream handle given to a [`ChunkProducer`].
///
/// Every non-empty write is framed as one chunk. Empty writes are dropped,
/// as a zero-length chunk would end the body.
pub struct ChunkWriter<'a> {
    stream: &'a mut dyn Write,
    chunks: usize,
    finished: bool,
}

impl<'a> ChunkWriter<'a> {
    pub(in crate::http) fn new(stream: &'a mut dyn Write) -> Self {
        ChunkWriter {
            stream,
            chunks: 0,
            finished: false,
        }
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(
                ErrorKind::BrokenPipe,
                "chunked body already terminated",
            ));
        }
        if data.is_empty() {
            return Ok(());
        }

        let size_line = format!("{:X}\r\n", data.len());
        let mut frame = BytesMut::with_capacity(size_line.len() + data.len() + CRLF.len());
        frame.put_slice(size_line.as_bytes());
        frame.put_slice(data);
        frame.put_slice(CRLF);

        self.stream.write_all(&frame)?;
        self.chunks += 1;
        Ok(())
    }

    /// Writes the terminal `0\r\n\r\n`. Later writes fail.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.stream.write_all(b"0\r\n\r\n")
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Write for ChunkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Fixed(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Fixed(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::Fixed(Bytes::from_static(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Fixed(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Fixed(Bytes::from_static(s.as_bytes()))
    }
}

/// Anything that knows how to turn itself into a [`Body`].
pub trait MakeBody {
    fn make_body(self) -> anyhow::Result<Body>;
}

impl MakeBody for Body {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(self)
    }
}

impl MakeBody for String {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(self.into())
    }
}

impl MakeBody for &str {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(Body::Fixed(Bytes::copy_from_slice(self.as_bytes())))
    }
}

impl MakeBody for Vec<u8> {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(self.into())
    }
}

impl MakeBody for Bytes {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(self.into())
    }
}

impl MakeBody for serde_json::Value {
    fn make_body(self) -> anyhow::Result<Body> {
        Ok(Body::json(self))
    }
}

impl MakeBody for &Path {
    fn make_body(self) -> anyhow::Result<Body> {
        let content = std::fs::read(self).with_context(|| format!("Can't read {}", self.display()))?;
        Ok(content.into())
    }
}

impl MakeBody for PathBuf {
    fn make_body(self) -> anyhow::Result<Body> {
        self.as_path().make_body()
    }
}
