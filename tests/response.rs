use flate2::read::GzDecoder;
use http_response::http::encoding::Encoding;
use http_response::http::{Body, Headers, ParseError, Response, SendError, Status, Version};
use serde::ser::Error as _;
use serde::{Serialize, Serializer};
use serde_json::json;
use std::io::{self, ErrorKind, Read, Write};

fn header_block(out: &[u8]) -> String {
    let text = String::from_utf8_lossy(out);
    let end = text.find("\r\n\r\n").expect("head terminator");
    text[..end + 4].to_string()
}

fn body_of(out: &[u8]) -> &[u8] {
    let end = out.windows(4).position(|w| w == b"\r\n\r\n").expect("head terminator");
    &out[end + 4..]
}

/// Accepts `limit` bytes, then fails like a closed socket.
struct ClosingStream {
    written: Vec<u8>,
    limit: usize,
}

impl Write for ClosingStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written.len() + buf.len() > self.limit {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "peer closed"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("refusing to encode"))
    }
}

#[test]
fn fixed_body_has_content_length_only() {
    let out = Response::from_parts(Status::OK, Headers::new(), "hello").to_bytes().unwrap();

    let head = header_block(&out);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Length: 5\r\n"));
    assert!(!head.contains("Transfer-Encoding"));
    assert_eq!(body_of(&out), b"hello");
}

#[test]
fn empty_body_has_zero_length() {
    let out = Response::default().to_bytes().unwrap();
    assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[test]
fn chunked_body_wire_format() {
    let resp = Response::chunked(Status::OK, Headers::new(), |w| {
        w.write_all(b"foo")?;
        w.write_all(b"bar")?;
        Ok(())
    });
    let out = resp.to_bytes().unwrap();

    let head = header_block(&out);
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));
    assert!(!head.contains("Content-Length"));
    assert_eq!(body_of(&out), b"3\r\nfoo\r\n3\r\nbar\r\n0\r\n\r\n");
}

#[test]
fn chunked_producer_with_no_chunks() {
    let out = Response::chunked(Status::OK, Headers::new(), |_| Ok(())).to_bytes().unwrap();
    assert_eq!(body_of(&out), b"0\r\n\r\n");
}

#[test]
fn producer_failure_aborts_send() {
    let resp = Response::chunked(Status::OK, Headers::new(), |w| {
        w.write_all(b"partial")?;
        Err(io::Error::other("database went away"))
    });

    let mut out = Vec::new();
    let err = resp.send(&mut out).unwrap_err();
    assert!(matches!(err, SendError::Transmission { .. }));

    // partial output is already on the wire, the terminal chunk is not
    assert!(out.ends_with(b"7\r\npartial\r\n"));
}

#[test]
fn write_after_stream_closes_fails() {
    let resp = Response::chunked(Status::OK, Headers::new(), |w| {
        loop {
            w.write_all(b"tick")?;
        }
    });

    let mut stream = ClosingStream { written: Vec::new(), limit: 256 };
    let err = resp.send(&mut stream).unwrap_err();
    match err {
        SendError::Transmission { source } => assert_eq!(source.kind(), ErrorKind::BrokenPipe),
        other => panic!("unexpected error: {other}"),
    }
    assert!(stream.written.len() <= 256);
}

#[test]
fn redirect_sets_location_and_301() {
    let resp = Response::redirect(Headers::new(), "/login");
    assert_eq!(resp.status(), Status::MOVED_PERMANENTLY);
    assert_eq!(resp.headers().get("Location"), Some("/login"));

    let out = resp.to_bytes().unwrap();
    assert!(header_block(&out).starts_with("HTTP/1.1 301 Moved Permanently\r\nLocation: /login\r\n"));
}

#[test]
fn redirect_with_line_break_is_refused() {
    let resp = Response::redirect(Headers::new(), "/x\r\nSet-Cookie: evil=1");

    let mut out = Vec::new();
    let err = resp.send(&mut out).unwrap_err();
    assert!(matches!(err, SendError::InvalidHeader { ref name } if name == "Location"));
    assert!(out.is_empty());
}

#[test]
fn chunked_no_content_skips_producer() {
    let resp = Response::chunked(Status::NO_CONTENT, Headers::new(), |_| {
        Err(io::Error::other("producer must not run for 204"))
    });

    let out = resp.to_bytes().unwrap();
    assert_eq!(out, b"HTTP/1.1 204 No Content\r\n\r\n");
}

#[test]
fn json_response() {
    let resp = Response::json(Status::from_code(201), json!({"id": 1}));
    assert_eq!(resp.headers().get("content-type"), Some("application/json; charset=utf-8"));

    let out = resp.to_bytes().unwrap();
    assert!(header_block(&out).contains("Content-Length: 8\r\n"));
    assert_eq!(body_of(&out), br#"{"id":1}"#);
}

#[test]
fn json_overrides_content_type() {
    for preset in ["text/html", "application/xml"] {
        let headers = Headers::from([("content-type", preset), ("X-Request-Id", "7")]);
        let resp = Response::json_with_headers(Status::OK, headers, json!({"ok": true}));

        assert_eq!(resp.headers().get("Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(resp.headers().get("x-request-id"), Some("7"));
        assert_eq!(resp.headers().len(), 2);
    }
}

#[test]
fn json_encoding_failure_writes_nothing() {
    let resp = Response::json(Status::OK, Unencodable);

    let mut out = Vec::new();
    let err = resp.send(&mut out).unwrap_err();
    assert!(matches!(err, SendError::BodyEncoding { .. }));
    assert!(out.is_empty());
}

#[test]
fn error_response() {
    let resp = Response::error("boom");
    assert_eq!(resp.status(), Status::INTERNAL_SERVER_ERROR);

    let out = resp.to_bytes().unwrap();
    assert!(header_block(&out).starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert_eq!(body_of(&out), b"boom");
}

#[test]
fn parse_then_send() {
    let headers = Headers::from([("Server", "test")]);
    let resp = Response::parse(b"HTTP/1.0", b"418", b"Coffee", headers, Body::from("short")).unwrap();

    let out = resp.to_bytes().unwrap();
    assert_eq!(
        out,
        b"HTTP/1.0 418 I'm a teapot\r\nServer: test\r\nContent-Length: 5\r\n\r\nshort"
    );
}

#[test]
fn parse_bad_status_code_is_an_error() {
    let result = Response::parse(b"HTTP/1.1", b"abc", b"OK", Headers::new(), Body::empty());
    assert!(matches!(result, Err(ParseError::MalformedStatusCode(_))));
}

#[test]
fn parse_rejects_non_three_digit_codes() {
    for token in [&b"+200"[..], b"0", b"2000", b" 200"] {
        let result = Response::parse(b"HTTP/1.1", token, b"OK", Headers::new(), Body::empty());
        assert!(matches!(result, Err(ParseError::MalformedStatusCode(_))), "{token:?}");
    }
}

#[test]
fn parse_unregistered_status_code() {
    let resp = Response::parse(b"HTTP/1.1", b"799", b"Custom", Headers::new(), Body::empty()).unwrap();
    assert_eq!(resp.status().code_num, 799);
    assert_eq!(resp.status_line(), "HTTP/1.1 799 ");
}

#[test]
fn byte_sequence_body() {
    let resp = Response::from_byte_seq(Version::HTTP_11, Status::OK, Headers::new(), (b'a'..=b'e').rev());
    let out = resp.to_bytes().unwrap();
    assert_eq!(body_of(&out), b"edcba");
}

#[test]
fn convertible_body() {
    let resp = Response::from_convertible(Version::HTTP_11, Status::OK, Headers::new(), json!([1, 2])).unwrap();
    assert_eq!(body_of(&resp.to_bytes().unwrap()), b"[1,2]");

    let path = std::env::temp_dir().join(format!("http-response-{}.txt", std::process::id()));
    std::fs::write(&path, b"from disk").unwrap();
    let resp = Response::from_convertible(Version::HTTP_11, Status::OK, Headers::new(), path.clone()).unwrap();
    assert_eq!(body_of(&resp.to_bytes().unwrap()), b"from disk");
    std::fs::remove_file(&path).unwrap();

    let missing = Response::from_convertible(Version::HTTP_11, Status::OK, Headers::new(), path);
    assert!(missing.is_err());
}

#[test]
fn completion_runs_after_message() {
    let resp = Response::from_parts(Status::from_code(101), Headers::from([("Upgrade", "echo")]), Body::empty())
        .on_complete(|stream| {
            stream.write_all(b"upgraded")?;
            Ok(())
        });
    assert!(resp.has_completion());

    let out = resp.to_bytes().unwrap();
    assert_eq!(
        out,
        b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: echo\r\n\r\nupgraded"
    );
}

#[test]
fn completion_failure_is_distinguished() {
    let resp = Response::from_parts(Status::OK, Headers::new(), "done")
        .on_complete(|_| Err(anyhow::anyhow!("hook failed")));

    let mut out = Vec::new();
    let err = resp.send(&mut out).unwrap_err();
    assert!(err.is_completion());
    assert!(err.to_string().contains("hook failed"));
    // the message itself went out in full
    assert!(out.ends_with(b"\r\n\r\ndone"));
}

#[test]
fn completion_runs_after_chunked_body() {
    let resp = Response::chunked(Status::OK, Headers::new(), |w| w.write_all(b"x"))
        .on_complete(|stream| Ok(stream.write_all(b"after")?));

    let out = resp.to_bytes().unwrap();
    assert!(out.ends_with(b"1\r\nx\r\n0\r\n\r\nafter"));
}

#[test]
fn gzip_content_coding() {
    let resp = Response::from_parts(Status::OK, Headers::new(), "hello hello hello hello")
        .with_content_coding(Encoding::Gzip);
    let out = resp.to_bytes().unwrap();

    let head = header_block(&out);
    assert!(head.contains("Content-Encoding: gzip\r\n"));
    let body = body_of(&out);
    assert!(head.contains(&format!("Content-Length: {}\r\n", body.len())));

    let mut decoded = String::new();
    GzDecoder::new(body).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, "hello hello hello hello");
}

#[test]
fn content_coding_skips_chunked_bodies() {
    let resp = Response::chunked(Status::OK, Headers::new(), |w| w.write_all(b"plain"))
        .with_content_coding(Encoding::Gzip);
    let out = resp.to_bytes().unwrap();

    assert!(!header_block(&out).contains("Content-Encoding"));
    assert_eq!(body_of(&out), b"5\r\nplain\r\n0\r\n\r\n");
}
