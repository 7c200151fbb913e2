//! Input kind detection.
//!
//! Decides whether an input path is a directory, a ZIP archive, or a plain
//! dump file, based on file system metadata and the ZIP signature.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::Result;

/// Kind of input a dump path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// A directory of dump files.
    Directory,
    /// A ZIP archive of dump files.
    Zip,
    /// A single uncompressed dump file.
    Plain,
}

impl InputKind {
    /// Returns true for inputs that hold several entries.
    pub fn is_container(&self) -> bool {
        matches!(self, InputKind::Directory | InputKind::Zip)
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Directory => write!(f, "directory"),
            InputKind::Zip => write!(f, "ZIP archive"),
            InputKind::Plain => write!(f, "plain file"),
        }
    }
}

/// ZIP signatures: local file header and empty archive.
const ZIP_SIGNATURES: &[&[u8]] = &[&[0x50, 0x4B, 0x03, 0x04], &[0x50, 0x4B, 0x05, 0x06]];

/// Returns true if `header` starts with a ZIP signature.
pub fn is_zip_signature(header: &[u8]) -> bool {
    ZIP_SIGNATURES.iter().any(|sig| header.starts_with(sig))
}

/// Detects the kind of input at `path`.
///
/// Directories are recognized from metadata. Files are sniffed for a ZIP
/// signature first; the `.zip` extension is only a fallback for files too
/// short to carry one.
pub fn detect_input<P: AsRef<Path>>(path: P) -> Result<InputKind> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(InputKind::Directory);
    }

    let mut file = File::open(path)?;
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = file.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if is_zip_signature(&header[..filled]) {
        return Ok(InputKind::Zip);
    }

    if filled < header.len() && has_extension(path, "zip") {
        return Ok(InputKind::Zip);
    }

    Ok(InputKind::Plain)
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
