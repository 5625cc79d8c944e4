//! Input resolution: turn a path, URL, data URL or pasted text into an
//! [`IngestedInput`].
//!
//! Files are read whole and base64-encoded through [`super::encode`]; nothing
//! here inspects size or content beyond sniffing the MIME type. Whether a
//! document is acceptable is the provider's call, not ours.

use super::encode::{self, RawRead};
use crate::error::SenseiError;
use std::path::Path;
use tracing::{debug, info};

/// MIME type used when neither the caller, the bytes nor the extension tell us.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A document ready to travel as an inline request part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedFile {
    /// Canonical standard-alphabet base64 of the file's bytes.
    pub encoded_payload: String,
    pub mime_type: String,
    /// File name shown to the user; not sent to the provider.
    pub display_name: String,
}

impl IngestedFile {
    /// Size of the original bytes, derived from the base64 length.
    pub fn byte_len(&self) -> usize {
        let padding = self
            .encoded_payload
            .bytes()
            .rev()
            .take_while(|&b| b == b'=')
            .count();
        ((self.encoded_payload.len() / 4) * 3).saturating_sub(padding.min(2))
    }
}

/// The one input of an analysis: a document or pasted text, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestedInput {
    File(IngestedFile),
    /// Passed to the model verbatim.
    Text(String),
}

impl IngestedInput {
    /// Combine the optional file and text a front-end collected.
    ///
    /// Blank text counts as absent. Supplying both is an error rather than a
    /// merge.
    pub fn from_parts(
        file: Option<IngestedFile>,
        text: Option<String>,
    ) -> Result<Self, SenseiError> {
        let text = text.filter(|t| !t.trim().is_empty());
        match (file, text) {
            (Some(f), None) => Ok(IngestedInput::File(f)),
            (None, Some(t)) => Ok(IngestedInput::Text(t)),
            (Some(_), Some(_)) => Err(SenseiError::ConflictingInput),
            (None, None) => Err(SenseiError::MissingInput),
        }
    }

    /// Reject input that carries nothing to analyse, or a file whose payload
    /// is not standard base64.
    pub fn validate(&self) -> Result<(), SenseiError> {
        match self {
            IngestedInput::Text(t) if t.trim().is_empty() => Err(SenseiError::MissingInput),
            IngestedInput::File(f) => {
                encode::check_payload(&f.encoded_payload).map_err(|e| SenseiError::UnreadableInput {
                    name: f.display_name.clone(),
                    reason: e.to_string(),
                })
            }
            IngestedInput::Text(_) => Ok(()),
        }
    }

    /// Short human-readable label for logs and progress output.
    pub fn description(&self) -> &str {
        match self {
            IngestedInput::File(f) => &f.display_name,
            IngestedInput::Text(_) => "pasted text",
        }
    }

    /// Raw size in bytes of the file or text.
    pub fn byte_len(&self) -> usize {
        match self {
            IngestedInput::File(f) => f.byte_len(),
            IngestedInput::Text(t) => t.len(),
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or HTTP/HTTPS URL to an ingested document.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<IngestedFile, SenseiError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        ingest_file(input).await
    }
}

/// Read a local file and encode it.
pub async fn ingest_file(path: impl AsRef<Path>) -> Result<IngestedFile, SenseiError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SenseiError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => SenseiError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SenseiError::UnreadableInput {
            name: path.display().to_string(),
            reason: e.to_string(),
        },
    })?;

    let name = display_name(path);
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(ingest_bytes(name, bytes, None))
}

/// Encode bytes that are already in memory.
///
/// `mime_hint` wins over sniffing when given and non-empty.
pub fn ingest_bytes(
    display_name: impl Into<String>,
    bytes: Vec<u8>,
    mime_hint: Option<&str>,
) -> IngestedFile {
    let display_name = display_name.into();
    let mime_type = detect_mime(mime_hint, &bytes, &display_name);
    IngestedFile {
        encoded_payload: encode::encode_bytes(&bytes),
        mime_type,
        display_name,
    }
}

/// Ingest a `data:` URL, the string-already-encoded read path.
///
/// The MIME type declared in the URL header is used unless `mime_hint`
/// overrides it.
pub fn ingest_data_url(
    display_name: impl Into<String>,
    data_url: &str,
    mime_hint: Option<&str>,
) -> Result<IngestedFile, SenseiError> {
    let display_name = display_name.into();
    let read = encode::normalise(RawRead::DataUrl(data_url.to_string())).map_err(|e| {
        SenseiError::UnreadableInput {
            name: display_name.clone(),
            reason: e.to_string(),
        }
    })?;
    let hint = mime_hint
        .filter(|m| !m.trim().is_empty())
        .or(read.declared_mime.as_deref());
    let mime_type = detect_mime(hint, &read.bytes, &display_name);
    Ok(IngestedFile {
        encoded_payload: read.encoded,
        mime_type,
        display_name,
    })
}

/// Pick a MIME type: hint, then magic bytes, then extension, then fallback.
pub fn detect_mime(hint: Option<&str>, bytes: &[u8], name: &str) -> String {
    if let Some(h) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        return h.to_string();
    }
    if let Some(m) = sniff_magic(bytes) {
        return m.to_string();
    }
    if let Some(m) = mime_from_extension(name) {
        return m.to_string();
    }
    FALLBACK_MIME.to_string()
}

fn sniff_magic(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        Some("application/pdf")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        _ => return None,
    };
    Some(mime)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Download a URL into memory and ingest it.
async fn download_url(url: &str, timeout_secs: u64) -> Result<IngestedFile, SenseiError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SenseiError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SenseiError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SenseiError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SenseiError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v != FALLBACK_MIME);
    let filename = extract_filename(url);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SenseiError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SenseiError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    info!("Downloaded {} bytes as '{}'", bytes.len(), filename);
    Ok(ingest_bytes(filename, bytes.to_vec(), content_type.as_deref()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded".to_string()
}
