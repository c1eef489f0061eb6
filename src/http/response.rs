//! The response entity: construction, status-line parsing and sending.
//!
//! Every constructor ends in [`Response::new`], the only place the status
//! line is formatted. Sending consumes the response, so a chunk producer or
//! completion callback runs at most once.

use crate::http::body::{Body, ChunkProducer, ChunkWriter, MakeBody, Payload};
use crate::http::encoding::{self, Encoding};
use crate::http::error::{ParseError, SendError};
use crate::http::headers::Headers;
use crate::http::message::{Message, write_head};
use crate::http::parse::parse_status_code;
use crate::http::status::Status;
use crate::http::version::Version;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, error, warn};

/// Initial buffer size for the serialized head.
const INIT_HEAD_SIZE: usize = 512;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Runs after the message has been fully written and flushed. It may write
/// more bytes to the same stream, e.g. after a protocol upgrade.
pub type Completion = Box<dyn FnOnce(&mut dyn Write) -> anyhow::Result<()> + Send>;

pub struct Response {
    version: Version,
    status: Status,
    message: Message,
    content_coding: Encoding,
    on_complete: Option<Completion>,
}

impl Response {
    pub fn new(version: Version, status: Status, headers: Headers, body: Body) -> Response {
        let status_line = format!("{} {}", version, status);

        Response {
            version,
            status,
            message: Message::new(status_line, headers, body),
            content_coding: Encoding::Identity,
            on_complete: None,
        }
    }

    pub fn from_parts(status: Status, headers: Headers, body: impl Into<Body>) -> Response {
        Response::new(Version::default(), status, headers, body.into())
    }

    /// Builds a response from the three tokens of a status line.
    ///
    /// The status is derived from the numeric code alone; the transmitted
    /// reason phrase is ignored.
    pub fn parse(
        version: &[u8],
        status_code: &[u8],
        reason_phrase: &[u8],
        headers: Headers,
        body: Body,
    ) -> Result<Response, ParseError> {
        let version: Version = std::str::from_utf8(version)
            .map_err(|_| ParseError::malformed_version(String::from_utf8_lossy(version)))?
            .parse()?;

        let code = std::str::from_utf8(status_code)
            .map_err(|_| ParseError::malformed_status_code(String::from_utf8_lossy(status_code)))
            .and_then(parse_status_code)?;
        let status = Status::from_code(code);

        if reason_phrase != status.message.as_bytes() {
            debug!(
                code,
                reason = %String::from_utf8_lossy(reason_phrase),
                "ignoring transmitted reason phrase"
            );
        }

        Ok(Response::new(version, status, headers, body))
    }

    pub fn error(message: impl Into<String>) -> Response {
        let message: String = message.into();
        Response::from_parts(Status::INTERNAL_SERVER_ERROR, Headers::new(), message)
    }

    /// A `Transfer-Encoding: chunked` response whose body is written by
    /// `producer` at send time.
    pub fn chunked<F>(status: Status, mut headers: Headers, producer: F) -> Response
    where
        F: FnOnce(&mut ChunkWriter<'_>) -> io::Result<()> + Send + 'static,
    {
        headers.remove("Content-Length");
        headers.set("Transfer-Encoding", "chunked");
        Response::from_parts(status, headers, Body::chunked(producer))
    }

    pub fn json<T: Serialize + Send + 'static>(status: Status, value: T) -> Response {
        Response::json_with_headers(status, Headers::new(), value)
    }

    /// Like [`Response::json`], keeping `headers` except for `Content-Type`,
    /// which is always overridden.
    pub fn json_with_headers<T: Serialize + Send + 'static>(
        status: Status,
        mut headers: Headers,
        value: T,
    ) -> Response {
        headers.set("Content-Type", JSON_CONTENT_TYPE);
        Response::from_parts(status, headers, Body::json(value))
    }

    pub fn redirect(mut headers: Headers, location: impl Into<String>) -> Response {
        headers.set("Location", location);
        Response::from_parts(Status::MOVED_PERMANENTLY, headers, Body::empty())
    }

    pub fn from_byte_seq<I>(version: Version, status: Status, headers: Headers, bytes: I) -> Response
    where
        I: IntoIterator<Item = u8>,
    {
        let content: Vec<u8> = bytes.into_iter().collect();
        Response::new(version, status, headers, content.into())
    }

    pub fn from_convertible<B: MakeBody>(
        version: Version,
        status: Status,
        headers: Headers,
        body: B,
    ) -> anyhow::Result<Response> {
        Ok(Response::new(version, status, headers, body.make_body()?))
    }

    /// Sets the completion callback. Only the first callback is kept.
    pub fn on_complete<F>(mut self, callback: F) -> Response
    where
        F: FnOnce(&mut dyn Write) -> anyhow::Result<()> + Send + 'static,
    {
        if self.on_complete.is_some() {
            warn!(status = self.status.code_num, "completion callback already set, ignoring");
        } else {
            self.on_complete = Some(Box::new(callback));
        }
        self
    }

    /// Compresses a fixed-length body with `coding` when it is sent.
    pub fn with_content_coding(mut self, coding: Encoding) -> Response {
        if coding.is_supported() {
            self.content_coding = coding;
        } else {
            warn!(%coding, "unsupported content coding, sending identity");
            self.content_coding = Encoding::Identity;
        }
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn status_line(&self) -> &str {
        self.message.start_line()
    }

    pub fn headers(&self) -> &Headers {
        self.message.headers()
    }

    pub fn body(&self) -> &Body {
        self.message.body()
    }

    pub fn content_coding(&self) -> Encoding {
        self.content_coding
    }

    pub fn has_completion(&self) -> bool {
        self.on_complete.is_some()
    }

    /// Writes the response to `stream`, then runs the completion callback.
    ///
    /// Nothing is written when the body fails to encode or a header can't
    /// be put on the wire. Once the head is out, a failure leaves a partial
    /// message on the wire. 1xx and 204 responses are sent without framing
    /// headers and without a body; a chunk producer is never called for them.
    pub fn send<W: Write>(self, stream: &mut W) -> Result<(), SendError> {
        let Response {
            status,
            message,
            content_coding,
            on_complete,
            ..
        } = self;
        let (status_line, mut headers, body) = message.into_parts();

        let payload = if status.allows_body() {
            Some(frame_payload(body, content_coding, &mut headers)?)
        } else {
            if !matches!(&body, Body::Fixed(content) if content.is_empty()) {
                debug!(status = status.code_num, "dropping body of a bodiless response");
            }
            headers.remove("Content-Length");
            headers.remove("Transfer-Encoding");
            None
        };

        if let Some(name) = headers.first_invalid() {
            error!(status = status.code_num, header = name, "refusing to write invalid header");
            return Err(SendError::invalid_header(name));
        }

        let length = payload.as_ref().and_then(Payload::content_length);
        debug!(status = status.code_num, ?length, "sending response");

        let mut dst = BytesMut::with_capacity(INIT_HEAD_SIZE + length.unwrap_or(0));
        write_head(&status_line, &headers, &mut dst);

        match payload {
            Some(Payload::Length(content)) => {
                dst.put_slice(&content);
                stream.write_all(&dst)?;
            }
            Some(Payload::Chunked(producer)) => {
                stream.write_all(&dst)?;
                write_chunked(producer, stream)?;
            }
            None => stream.write_all(&dst)?,
        }
        stream.flush()?;

        if let Some(callback) = on_complete {
            callback(&mut *stream).map_err(|e| {
                error!(status = status.code_num, "completion callback failed: {:#}", e);
                SendError::completion(e)
            })?;
            stream.flush()?;
        }

        Ok(())
    }

    /// Serializes into memory. Bytes written by the completion callback
    /// follow the message.
    pub fn to_bytes(self) -> Result<Vec<u8>, SendError> {
        let mut out = Vec::new();
        self.send(&mut out)?;
        Ok(out)
    }
}

/// Materializes the body and makes the framing headers agree with it.
fn frame_payload(body: Body, coding: Encoding, headers: &mut Headers) -> Result<Payload, SendError> {
    let payload = match body.materialize()? {
        Payload::Length(content) => Payload::Length(apply_coding(coding, content, headers)?),
        Payload::Chunked(producer) => {
            if coding != Encoding::Identity {
                warn!(%coding, "content coding is not applied to chunked bodies");
            }
            Payload::Chunked(producer)
        }
    };

    match &payload {
        Payload::Length(content) => {
            headers.remove("Transfer-Encoding");
            headers.set("Content-Length", content.len().to_string());
        }
        Payload::Chunked(_) => {
            headers.remove("Content-Length");
            headers.set("Transfer-Encoding", "chunked");
        }
    }
    Ok(payload)
}

fn apply_coding(coding: Encoding, content: Bytes, headers: &mut Headers) -> Result<Bytes, SendError> {
    match encoding::encode(coding, &content)? {
        Some(compressed) => {
            headers.set("Content-Encoding", coding.to_string());
            Ok(compressed)
        }
        None => Ok(content),
    }
}

fn write_chunked<W: Write>(producer: ChunkProducer, stream: &mut W) -> Result<(), SendError> {
    let mut writer = ChunkWriter::new(stream);

    if let Err(e) = producer(&mut writer) {
        error!(chunks = writer.chunks_written(), "chunk producer failed: {}", e);
        return Err(e.into());
    }
    writer.finish()?;
    Ok(())
}

impl Default for Response {
    fn default() -> Self {
        Response::new(Version::default(), Status::default(), Headers::new(), Body::empty())
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_line", &self.status_line())
            .field("headers", self.headers())
            .field("body", self.body())
            .field("content_coding", &self.content_coding)
            .field("has_completion", &self.has_completion())
            .finish()
    }
}
