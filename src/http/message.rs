use crate::http::CRLF;
use crate::http::body::Body;
use crate::http::headers::Headers;
use bytes::BufMut;

/// Start line, headers and body: the parts every HTTP message shares.
#[derive(Debug, Default)]
pub struct Message {
    start_line: String,
    headers: Headers,
    body: Body,
}

impl Message {
    pub fn new(start_line: String, headers: Headers, body: Body) -> Message {
        Message {
            start_line,
            headers,
            body,
        }
    }

    pub fn start_line(&self) -> &str {
        &self.start_line
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub(in crate::http) fn into_parts(self) -> (String, Headers, Body) {
        (self.start_line, self.headers, self.body)
    }
}

/// Writes `start-line CRLF *(header CRLF) CRLF`.
pub(in crate::http) fn write_head<B: BufMut>(start_line: &str, headers: &Headers, dst: &mut B) {
    dst.put_slice(start_line.as_bytes());
    dst.put_slice(CRLF);
    headers.write_to(dst);
    dst.put_slice(CRLF);
}
