//! HTTP/1.x response messages: build them from status, headers and body,
//! rebuild them from status-line tokens, and write them to a stream with
//! `Content-Length` or chunked framing.

pub mod http;

pub use http::{Body, Headers, ParseError, Response, SendError, Status, Version};
