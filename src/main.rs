use anyhow::{Context, bail};
use http_response::http::encoding::Encoding;
use http_response::http::{self, Body, Headers, Response, Status, Version};
use serde_json::json;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args: Vec<String> = std::env::args().collect();
    let kind = args.get(1).map(String::as_str).unwrap_or("index");
    let arg = args.get(2).map(String::as_str);

    let response = build(kind, arg)?;
    info!(kind, status_line = response.status_line(), "writing response");

    let mut stdout = io::stdout().lock();
    response.send(&mut stdout).context("Can't write response")?;
    Ok(())
}

fn build(kind: &str, arg: Option<&str>) -> anyhow::Result<Response> {
    let response = match kind {
        "index" => http::ok(),
        "echo" => Response::from_parts(
            Status::OK,
            Headers::from([("Content-Type", "text/plain")]),
            arg.unwrap_or_default().to_string(),
        ),
        "json" => Response::json(Status::CREATED, json!({"id": 1, "echo": arg})),
        "chunked" => {
            let words: Vec<String> = arg
                .unwrap_or("foo bar")
                .split_ascii_whitespace()
                .map(String::from)
                .collect();
            Response::chunked(Status::OK, Headers::new(), move |w| {
                for word in words {
                    w.write_all(word.as_bytes())?;
                }
                Ok(())
            })
        }
        "redirect" => Response::redirect(Headers::new(), arg.unwrap_or("/")),
        "file" => match arg {
            Some(path) => Response::from_convertible(
                Version::default(),
                Status::OK,
                Headers::from([("Content-Type", "application/octet-stream")]),
                PathBuf::from(path),
            )
            .unwrap_or_else(|e| {
                info!("{:#}", e);
                http::not_found()
            }),
            None => http::bad_request(),
        },
        "gzip" => {
            let coding = Encoding::from_str(arg.unwrap_or("gzip"))
                .with_context(|| format!("Unknown content coding: {:?}", arg))?;
            Response::from_parts(Status::OK, Headers::new(), Body::from("hello hello hello"))
                .with_content_coding(coding)
        }
        "upgrade" => Response::from_parts(
            Status::from_code(101),
            Headers::from([("Upgrade", "echo"), ("Connection", "Upgrade")]),
            Body::empty(),
        )
        .on_complete(|stream| {
            stream.write_all(b"switched\n")?;
            Ok(())
        }),
        "error" => Response::error(arg.unwrap_or("something went wrong").to_string()),
        other => bail!("Unknown response kind: {}", other),
    };

    Ok(response)
}
