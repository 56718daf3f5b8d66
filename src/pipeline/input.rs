//! Input resolution: turn a path, URL or in-memory upload into a local PDF.
//!
//! pdfium opens files by path, so URL downloads and uploaded bytes are
//! written to a temp location owned by [`ResolvedInput`]; it is removed when
//! the value is dropped. `%PDF` magic is checked up front so a wrong file
//! yields a clear error rather than a pdfium failure.

use crate::error::ExtractError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF available on the local file system for the duration of one report.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; the PDF lives in a temp directory.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input was supplied as bytes.
    Uploaded(NamedTempFile),
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Uploaded(file) => file.path(),
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Short name for logs and progress output: the file name of a path or the
/// last URL segment, falling back to the input itself.
pub fn display_name(input: &str) -> String {
    let tail = if is_url(input) {
        reqwest::Url::parse(input)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|s| !s.is_empty())
    } else {
        Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    };
    tail.unwrap_or_else(|| input.to_string())
}

/// Resolve a path or URL to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Persist uploaded bytes to a managed temp file.
pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<ResolvedInput, ExtractError> {
    check_magic(bytes, Path::new(name))?;

    let mut file = tempfile::Builder::new()
        .prefix("trf-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    file.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;

    debug!("Staged upload '{}' ({} bytes) at {}", name, bytes.len(), file.path().display());
    Ok(ResolvedInput::Uploaded(file))
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, ExtractError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(ExtractError::FileNotFound { path });
    }

    let unreadable = |e: std::io::Error, path: PathBuf| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied { path },
        _ => ExtractError::FileNotFound { path },
    };

    let mut file = std::fs::File::open(&path).map_err(|e| unreadable(e, path.clone()))?;

    // A directory opens fine on Unix and only fails here.
    let mut head = [0u8; 4];
    let n = file.read(&mut head).map_err(|e| unreadable(e, path.clone()))?;
    check_magic(&head[..n], &path)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Reject anything that does not start with `%PDF`.
fn check_magic(bytes: &[u8], path: &Path) -> Result<(), ExtractError> {
    if bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ExtractError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ExtractError> {
    info!("Downloading report from: {}", url);

    let failed = |reason: String| ExtractError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| ExtractError::Internal(e.to_string()))?;
    let mut filename = display_name(url);
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        filename = "downloaded.pdf".to_string();
    }
    let file_path = temp_dir.path().join(filename);

    check_magic(&bytes, &file_path)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| ExtractError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/trf.pdf"));
        assert!(is_url("http://example.com/trf.pdf"));
        assert!(!is_url("/tmp/trf.pdf"));
        assert!(!is_url("trf.pdf"));
    }

    #[test]
    fn display_names() {
        assert_eq!(display_name("/scans/2025/amina_trf.pdf"), "amina_trf.pdf");
        assert_eq!(display_name("https://host/reports/k7.pdf?x=1"), "k7.pdf");
        assert_eq!(display_name("https://host/"), "https://host/");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/here.pdf").err().unwrap();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_file_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 a zip, not a pdf").unwrap();
        let err = resolve_local(f.path().to_str().unwrap()).err().unwrap();
        match err {
            ExtractError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        match resolve_local(dir.path().to_str().unwrap()) {
            Err(ExtractError::FileNotFound { path }) => assert_eq!(path, dir.path()),
            other => panic!("expected FileNotFound, got {:?}", other.err()),
        }
    }

    #[test]
    fn short_file_is_rejected() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"%P").unwrap();
        assert!(resolve_local(f.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn uploaded_bytes_are_staged_and_cleaned_up() {
        let resolved = from_bytes("upload.pdf", b"%PDF-1.7\n%%EOF\n").unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7\n%%EOF\n");
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn uploaded_non_pdf_is_rejected() {
        let err = from_bytes("photo.jpg", b"\xff\xd8\xff\xe0").err().unwrap();
        assert!(matches!(err, ExtractError::NotAPdf { .. }));
    }
}
