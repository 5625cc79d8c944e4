//! Payload encoding: raw reads → canonical base64 text.
//!
//! Gemini accepts binary content as base64 inside the JSON request body
//! (`inlineData.data`). Bytes reach us along two paths: a raw byte buffer
//! (file read, download) or a string that is already encoded (a `data:` URL
//! handed over by a front-end). [`normalise`] is the one place both paths
//! converge, so every caller gets the same representation for the same bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

/// One raw read of a document, before normalisation.
#[derive(Debug, Clone)]
pub enum RawRead {
    /// The file's bytes.
    Bytes(Vec<u8>),
    /// A `data:<mime>;base64,<payload>` URL.
    DataUrl(String),
}

/// Why a raw read could not be normalised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The string does not start with `data:` or has no `,` separator.
    #[error("not a data URL")]
    NotADataUrl,
    /// The data URL is percent-encoded rather than base64.
    #[error("data URL is not base64-encoded")]
    NotBase64Flagged,
    /// The payload is not valid standard base64.
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Encode raw bytes with the standard alphabet and padding.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}

/// A read after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalised {
    /// MIME type declared by a data URL header, if any.
    pub declared_mime: Option<String>,
    /// The decoded bytes, kept for MIME sniffing.
    pub bytes: Vec<u8>,
    /// Canonical base64 of `bytes`.
    pub encoded: String,
}

/// Normalise either read path to canonical base64 text.
///
/// A data URL payload is decoded once and re-encoded, so stray whitespace or
/// line breaks some producers insert do not leak into the request.
pub fn normalise(raw: RawRead) -> Result<Normalised, EncodeError> {
    let (declared_mime, bytes) = match raw {
        RawRead::Bytes(bytes) => (None, bytes),
        RawRead::DataUrl(url) => decode_data_url(&url)?,
    };
    let encoded = encode_bytes(&bytes);
    Ok(Normalised {
        declared_mime,
        bytes,
        encoded,
    })
}

/// Check that already-encoded text is canonical standard base64.
pub fn check_payload(encoded: &str) -> Result<(), EncodeError> {
    STANDARD
        .decode(encoded.as_bytes())
        .map(|_| ())
        .map_err(|e| EncodeError::InvalidBase64(e.to_string()))
}

/// Split a base64 data URL into its declared MIME type and decoded bytes.
///
/// The MIME type is `None` when the header omits it (`data:;base64,...`).
pub fn decode_data_url(url: &str) -> Result<(Option<String>, Vec<u8>), EncodeError> {
    let rest = url.strip_prefix("data:").ok_or(EncodeError::NotADataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(EncodeError::NotADataUrl)?;

    let mut params = header.split(';');
    let mime = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(EncodeError::NotBase64Flagged);
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| EncodeError::InvalidBase64(e.to_string()))?;
    Ok((mime, bytes))
}
