//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Both inputs (the disclosure form and the checklist workbook) are small
//! enough to hold in memory, and both downstream readers (lopdf, calamine)
//! parse from byte buffers, so nothing is written to disk. The leading bytes
//! are checked against the expected signature so callers get a meaningful
//! error rather than a parser failure deep inside a dependency.

use crate::error::AnalyzerError;
use std::path::PathBuf;
use tracing::{debug, info};

/// What an input is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A PDF document (`%PDF`).
    Pdf,
    /// A spreadsheet: xlsx/ods (zip, `PK\x03\x04`) or legacy xls (OLE2).
    Workbook,
}

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xd0, 0xcf, 0x11, 0xe0];

impl InputKind {
    pub fn label(self) -> &'static str {
        match self {
            InputKind::Pdf => "PDF",
            InputKind::Workbook => "spreadsheet",
        }
    }

    /// Whether `bytes` start with a signature of this kind.
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            InputKind::Pdf => bytes.starts_with(PDF_MAGIC),
            InputKind::Workbook => bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC),
        }
    }

    /// Validate `bytes`, naming `source_name` in the error.
    pub fn check(self, source_name: &str, bytes: &[u8]) -> Result<(), AnalyzerError> {
        if self.matches(bytes) {
            Ok(())
        } else {
            Err(AnalyzerError::UnexpectedFormat {
                source_name: source_name.to_string(),
                expected: self.label(),
                magic: bytes.iter().take(4).copied().collect(),
            })
        }
    }
}

/// An input held in memory.
#[derive(Debug, Clone)]
pub struct InputBytes {
    /// File name or URL it came from, for messages.
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load `input` (local path or HTTP(S) URL) and validate it is a `kind`.
pub async fn resolve_input(
    input: &str,
    kind: InputKind,
    timeout_secs: u64,
) -> Result<InputBytes, AnalyzerError> {
    if input.trim().is_empty() {
        return Err(AnalyzerError::InvalidInput {
            input: input.to_string(),
        });
    }

    let resolved = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    kind.check(&resolved.name, &resolved.bytes)?;
    Ok(resolved)
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path_str: &str) -> Result<InputBytes, AnalyzerError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(AnalyzerError::FileNotFound { path });
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AnalyzerError::PermissionDenied { path });
        }
        Err(_) => return Err(AnalyzerError::FileNotFound { path }),
    };

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(InputBytes {
        name: path.display().to_string(),
        bytes,
    })
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<InputBytes, AnalyzerError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            AnalyzerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyzerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    info!("Downloaded {} bytes from {}", bytes.len(), url);

    Ok(InputBytes {
        name: file_name_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// Last path segment of the URL when it looks like a file name, else the URL.
fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn magic_bytes() {
        assert!(InputKind::Pdf.matches(b"%PDF-1.7\n"));
        assert!(!InputKind::Pdf.matches(b"PK\x03\x04"));
        assert!(InputKind::Workbook.matches(b"PK\x03\x04rest"));
        assert!(InputKind::Workbook.matches(&[0xd0, 0xcf, 0x11, 0xe0, 0xa1]));
        assert!(!InputKind::Workbook.matches(b"%PDF"));
    }

    #[test]
    fn file_name_from_url_path() {
        assert_eq!(file_name_from_url("https://x.org/a/form.pdf"), "form.pdf");
        assert_eq!(file_name_from_url("https://x.org/a/"), "https://x.org/a/");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", InputKind::Pdf, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn wrong_format_is_reported() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello world").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap(), InputKind::Pdf, 5)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::UnexpectedFormat { expected: "PDF", .. }
        ));
    }

    #[tokio::test]
    async fn local_pdf_is_loaded() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.5\n%%EOF").unwrap();
        let input = resolve_input(tmp.path().to_str().unwrap(), InputKind::Pdf, 5)
            .await
            .unwrap();
        assert_eq!(input.bytes.len(), 14);
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("  ", InputKind::Workbook, 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput { .. }));
    }
}
