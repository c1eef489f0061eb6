pub mod body;
pub mod encoding;
pub mod error;
pub mod headers;
pub mod message;
pub mod parse;
pub mod response;
pub mod status;
pub mod version;

pub use body::{Body, ChunkProducer, ChunkWriter, MakeBody, Payload, Structured};
pub use encoding::Encoding;
pub use error::{ParseError, SendError};
pub use headers::Headers;
pub use message::Message;
pub use response::{Completion, JSON_CONTENT_TYPE, Response};
pub use status::Status;
pub use version::Version;

pub(crate) const CRLF: &[u8] = b"\r\n";

pub fn ok() -> Response {
    Response::default()
}

pub fn not_found() -> Response {
    Response::from_parts(Status::NOT_FOUND, Headers::new(), Body::empty())
}

pub fn bad_request() -> Response {
    Response::from_parts(Status::BAD_REQUEST, Headers::new(), Body::empty())
}
