use crate::http::error::SendError;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder};
use std::io::Write;
use strum::{Display, EnumString, IntoStaticStr};

#[derive(EnumString, IntoStaticStr, Debug, PartialEq, Eq, Hash, Clone, Copy, Display)]
#[strum(ascii_case_insensitive)]
pub enum Encoding {
    #[strum(serialize = "gzip")]
    Gzip,
    #[strum(serialize = "compress")]
    Compress,
    #[strum(serialize = "deflate")]
    Deflate,
    #[strum(serialize = "br")]
    Br,
    #[strum(serialize = "zstd")]
    Zstd,
    #[strum(serialize = "dcb")]
    Dcb,
    #[strum(serialize = "dcz")]
    Dcz,

    #[strum(serialize = "identity")]
    Identity,
}

impl Encoding {
    /// Whether [`encode`] can actually transform a body with this coding.
    pub fn is_supported(self) -> bool {
        matches!(self, Encoding::Gzip | Encoding::Deflate)
    }
}

/// Compresses a fixed-length body.
///
/// Returns `None` for codings that leave the body untouched.
pub(in crate::http) fn encode(encoding: Encoding, content: &[u8]) -> Result<Option<Bytes>, SendError> {
    let compressed = match encoding {
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::with_capacity(content.len() / 2), Compression::default());
            encoder.write_all(content).map_err(SendError::compression)?;
            encoder.finish().map_err(SendError::compression)?
        }
        Encoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::with_capacity(content.len() / 2), Compression::default());
            encoder.write_all(content).map_err(SendError::compression)?;
            encoder.finish().map_err(SendError::compression)?
        }
        _ => return Ok(None),
    };

    Ok(Some(Bytes::from(compressed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::{DeflateDecoder, GzDecoder};
    use std::io::Read;
    use std::str::FromStr;

    #[test]
    fn tokens() {
        assert_eq!(Encoding::from_str("gzip").unwrap(), Encoding::Gzip);
        assert_eq!(Encoding::from_str("GZip").unwrap(), Encoding::Gzip);
        assert!(Encoding::from_str("*").is_err());
        assert_eq!(Encoding::Deflate.to_string(), "deflate");
        assert!(Encoding::from_str("x-custom").is_err());
    }

    #[test]
    fn gzip_roundtrip() {
        let compressed = encode(Encoding::Gzip, b"hello hello hello").unwrap().unwrap();

        let mut out = String::new();
        GzDecoder::new(compressed.as_ref()).read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello hello hello");
    }

    #[test]
    fn deflate_roundtrip() {
        let compressed = encode(Encoding::Deflate, b"").unwrap().unwrap();

        let mut out = Vec::new();
        DeflateDecoder::new(compressed.as_ref()).read_to_end(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unsupported_is_untouched() {
        assert!(encode(Encoding::Identity, b"abc").unwrap().is_none());
        assert!(encode(Encoding::Br, b"abc").unwrap().is_none());
        assert!(!Encoding::Zstd.is_supported());
    }
}
