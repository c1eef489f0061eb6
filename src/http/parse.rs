use crate::http::error::ParseError;
use crate::http::version::Version;
use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^HTTP/(?P<major>[0-9]+)\.(?P<minor>[0-9]+)$").unwrap());

static STATUS_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9][0-9]{2}$").unwrap());

pub(in crate::http) fn parse_version(token: &str) -> Result<Version, ParseError> {
    let caps = VERSION_RE
        .captures(token)
        .ok_or_else(|| ParseError::malformed_version(token))?;

    // digits only, so the sole failure left is overflow
    let major = caps["major"]
        .parse()
        .map_err(|_| ParseError::malformed_version(token))?;
    let minor = caps["minor"]
        .parse()
        .map_err(|_| ParseError::malformed_version(token))?;

    Ok(Version::new(major, minor))
}

/// Status codes are exactly three ASCII digits on the wire, without a
/// leading zero so the code formats back to the same token.
pub(in crate::http) fn parse_status_code(token: &str) -> Result<u16, ParseError> {
    if !STATUS_CODE_RE.is_match(token) {
        return Err(ParseError::malformed_status_code(token));
    }
    token
        .parse::<u16>()
        .map_err(|_| ParseError::malformed_status_code(token))
}
