//! # pdfium-auto
//!
//! Find a usable PDFium shared library for `pdfium-render`, fetching it once
//! from [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! when none is available locally.
//!
//! Lookup order used by [`ensure_library`]:
//!
//! 1. `PDFIUM_LIB_PATH`, when it points at an existing file.
//! 2. The per-user cache, `{cache_dir}/ielts-extract/pdfium-{VERSION}/`.
//! 3. Download of the platform archive, extracting only the library member.
//!
//! The resolved path is memoised for the lifetime of the process.
//!
//! ```rust,no_run
//! let pdfium = pdfium_auto::bind().expect("PDFium unavailable");
//! ```
//!
//! Set `PDFIUM_AUTO_CACHE_DIR` to relocate the cache.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

/// pdfium-binaries release tag (`chromium/{VERSION}`).
pub const PDFIUM_VERSION: &str = "7690";

const RELEASES_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Sub-directory of the user cache dir that holds the library.
const CACHE_NAMESPACE: &str = "ielts-extract";

#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    #[error("No PDFium build is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Archive extraction failed: {0}")]
    Extract(String),

    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Platforms with a published pdfium-binaries archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacArm64,
    MacX64,
    LinuxX64,
    LinuxArm64,
    WinX64,
    WinArm64,
    WinX86,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Result<Self, PdfiumAutoError> {
        Self::from_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_target(os: &str, arch: &str) -> Result<Self, PdfiumAutoError> {
        match (os, arch) {
            ("macos", "aarch64") => Ok(Platform::MacArm64),
            ("macos", "x86_64") => Ok(Platform::MacX64),
            ("linux", "x86_64") => Ok(Platform::LinuxX64),
            ("linux", "aarch64") => Ok(Platform::LinuxArm64),
            ("windows", "x86_64") => Ok(Platform::WinX64),
            ("windows", "aarch64") => Ok(Platform::WinArm64),
            ("windows", "x86") => Ok(Platform::WinX86),
            (os, arch) => Err(PdfiumAutoError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Release asset name, e.g. `pdfium-linux-x64.tgz`.
    pub fn archive_name(self) -> &'static str {
        match self {
            Platform::MacArm64 => "pdfium-mac-arm64.tgz",
            Platform::MacX64 => "pdfium-mac-x64.tgz",
            Platform::LinuxX64 => "pdfium-linux-x64.tgz",
            Platform::LinuxArm64 => "pdfium-linux-arm64.tgz",
            Platform::WinX64 => "pdfium-win-x64.tgz",
            Platform::WinArm64 => "pdfium-win-arm64.tgz",
            Platform::WinX86 => "pdfium-win-x86.tgz",
        }
    }

    /// File name of the shared library on disk.
    pub fn library_name(self) -> &'static str {
        match self {
            Platform::MacArm64 | Platform::MacX64 => "libpdfium.dylib",
            Platform::LinuxX64 | Platform::LinuxArm64 => "libpdfium.so",
            Platform::WinX64 | Platform::WinArm64 | Platform::WinX86 => "pdfium.dll",
        }
    }

    /// Path of the library inside the release archive.
    pub fn archive_member(self) -> String {
        match self {
            Platform::WinX64 | Platform::WinArm64 | Platform::WinX86 => {
                format!("bin/{}", self.library_name())
            }
            _ => format!("lib/{}", self.library_name()),
        }
    }

    fn download_url(self) -> String {
        format!(
            "{RELEASES_URL}/chromium%2F{PDFIUM_VERSION}/{}",
            self.archive_name()
        )
    }
}

/// Versioned cache directory for the library.
pub fn cache_dir() -> PathBuf {
    let base = match std::env::var("PDFIUM_AUTO_CACHE_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
            .join(CACHE_NAMESPACE),
    };
    base.join(format!("pdfium-{PDFIUM_VERSION}"))
}

/// Path of an already available library, without touching the network.
pub fn locate() -> Option<PathBuf> {
    if let Some(p) = env_override() {
        return Some(p);
    }
    let platform = Platform::current().ok()?;
    let p = cache_dir().join(platform.library_name());
    p.exists().then_some(p)
}

/// `true` when [`ensure_library`] will not need to download anything.
pub fn is_available() -> bool {
    locate().is_some()
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Return a path to the PDFium library, downloading it if necessary.
///
/// `on_progress` receives `(bytes_so_far, content_length)` while downloading.
/// This performs blocking I/O.
pub fn ensure_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(p) = RESOLVED.get() {
        return Ok(p.clone());
    }

    let path = match locate() {
        Some(p) => p,
        None => fetch(Platform::current()?, &cache_dir(), on_progress)?,
    };

    let _ = RESOLVED.set(path.clone());
    Ok(path)
}

/// Bind to PDFium, downloading it on first use.
pub fn bind() -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_library(None)?;
    bind_from(&path)
}

/// Bind to the library at `path`.
pub fn bind_from(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn env_override() -> Option<PathBuf> {
    let raw = std::env::var("PDFIUM_LIB_PATH").ok()?;
    let p = PathBuf::from(raw);
    p.exists().then_some(p)
}

fn fetch(
    platform: Platform,
    dir: &Path,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    std::fs::create_dir_all(dir).map_err(|source| PdfiumAutoError::CacheDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let archive = download(&platform.download_url(), on_progress)?;
    let dest = dir.join(platform.library_name());
    unpack_member(&archive, &platform.archive_member(), &dest)?;
    Ok(dest)
}

fn download(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];

    loop {
        let n = match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("read: {e}"))),
        };
        body.extend_from_slice(&chunk[..n]);
        if let Some(cb) = on_progress {
            cb(body.len() as u64, total);
        }
    }

    Ok(body)
}

/// Write the archive entry named `member` from a `.tgz` to `dest`.
fn unpack_member(tgz: &[u8], member: &str, dest: &Path) -> Result<(), PdfiumAutoError> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(tgz));
    let entries = archive
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let is_member = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        if is_member {
            entry
                .unpack(dest)
                .map_err(|e| PdfiumAutoError::Extract(format!("unpack {member}: {e}")))?;
            return Ok(());
        }
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not present in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tgz_with(member: &str, contents: &[u8]) -> Vec<u8> {
        let gz = GzEncoder::new(Vec::new(), Compression::fast());
        let mut builder = tar::Builder::new(gz);
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, member, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn current_platform_is_known() {
        Platform::current().expect("test host should be a supported platform");
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = Platform::from_target("freebsd", "riscv64").unwrap_err();
        assert!(err.to_string().contains("freebsd/riscv64"));
    }

    #[test]
    fn windows_library_lives_under_bin() {
        assert_eq!(Platform::WinX64.archive_member(), "bin/pdfium.dll");
        assert_eq!(Platform::LinuxArm64.archive_member(), "lib/libpdfium.so");
        assert_eq!(Platform::MacX64.library_name(), "libpdfium.dylib");
    }

    #[test]
    fn download_url_encodes_release_tag() {
        let url = Platform::LinuxX64.download_url();
        assert!(url.ends_with("/chromium%2F7690/pdfium-linux-x64.tgz"), "{url}");
    }

    #[test]
    fn cache_dir_is_versioned() {
        let d = cache_dir();
        assert!(d.to_string_lossy().contains(PDFIUM_VERSION));
        assert_eq!(d, cache_dir());
    }

    #[test]
    fn unpack_member_writes_only_the_library() {
        let tgz = tgz_with("lib/libpdfium.so", b"\x7fELF-not-really");
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");

        unpack_member(&tgz, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"\x7fELF-not-really");
    }

    #[test]
    fn unpack_member_reports_missing_entry() {
        let tgz = tgz_with("include/fpdfview.h", b"/* header */");
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_member(&tgz, "lib/libpdfium.so", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Extract(_)));
    }
}
