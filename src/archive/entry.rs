//! Streaming readers for individual archive entries.
//!
//! An [`ArchiveEntry`] owns its own file handle positioned at the entry's
//! data, so it can outlive the scanner call that produced it and be handed
//! to a record stream without borrowing the archive.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;

use crate::{Error, READ_BUFFER_SIZE, Result};

/// Compression method of a ZIP entry, as far as this crate cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EntryMethod {
    Stored,
    Deflated,
    Bzip2,
    Other(String),
}

impl From<zip::CompressionMethod> for EntryMethod {
    #[allow(deprecated)]
    fn from(method: zip::CompressionMethod) -> Self {
        match method {
            zip::CompressionMethod::Stored => EntryMethod::Stored,
            zip::CompressionMethod::Deflated => EntryMethod::Deflated,
            zip::CompressionMethod::Bzip2 => EntryMethod::Bzip2,
            other => EntryMethod::Other(format!("{:?}", other)),
        }
    }
}

/// Location of one entry's data, captured while enumerating.
#[derive(Debug, Clone)]
pub(crate) enum EntryLocation {
    /// Compressed data inside a ZIP archive.
    Zip {
        archive: PathBuf,
        data_start: u64,
        compressed_size: u64,
        size: u64,
        crc32: u32,
        method: EntryMethod,
        encrypted: bool,
    },
    /// A regular file found by a directory walk.
    File(PathBuf),
}

/// A readable stream over one selected archive entry.
///
/// # Example
///
/// ```rust,no_run
/// use bulkdump::{ArchiveScanner, EntrySelector};
/// use std::io::Read;
///
/// let mut scanner = ArchiveScanner::new("ipg050104.zip", EntrySelector::new().suffix("xml"));
/// scanner.open()?;
/// while let Some(mut entry) = scanner.next_entry()? {
///     let mut text = String::new();
///     entry.read_to_string(&mut text)?;
///     println!("{}: {} bytes", entry.name(), text.len());
/// }
/// # Ok::<(), bulkdump::Error>(())
/// ```
pub struct ArchiveEntry {
    name: String,
    index: usize,
    reader: Box<dyn Read + Send>,
}

impl ArchiveEntry {
    /// Opens the data stream described by `location`.
    pub(crate) fn open(name: String, index: usize, location: &EntryLocation) -> Result<Self> {
        let reader = open_location(&name, location)?;
        Ok(Self {
            name,
            index,
            reader,
        })
    }

    /// Full entry path inside the archive, using `/` separators.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final path component of the entry name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Position of the entry in the archive's enumeration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Consumes the entry and returns its boxed reader.
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl Read for ArchiveEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

fn open_location(name: &str, location: &EntryLocation) -> Result<Box<dyn Read + Send>> {
    match location {
        EntryLocation::File(path) => {
            let file = File::open(path)?;
            Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
        }
        EntryLocation::Zip {
            archive,
            data_start,
            compressed_size,
            size,
            crc32,
            method,
            encrypted,
        } => {
            if *encrypted {
                return Err(Error::UnsupportedCompression {
                    entry: name.to_string(),
                    method: "encrypted".into(),
                });
            }
            let raw = raw_zip_data(archive, *data_start, *compressed_size)?;
            let decoded = decode(name, method, raw)?;
            Ok(Box::new(VerifyingReader::new(
                name.to_string(),
                decoded,
                *size,
                *crc32,
            )))
        }
    }
}

fn raw_zip_data(
    archive: &Path,
    data_start: u64,
    compressed_size: u64,
) -> Result<io::Take<BufReader<File>>> {
    let mut file = File::open(archive)?;
    file.seek(SeekFrom::Start(data_start))?;
    Ok(BufReader::with_capacity(READ_BUFFER_SIZE, file).take(compressed_size))
}

fn decode(
    name: &str,
    method: &EntryMethod,
    raw: io::Take<BufReader<File>>,
) -> Result<Box<dyn Read + Send>> {
    match method {
        EntryMethod::Stored => Ok(Box::new(raw)),
        #[cfg(feature = "deflate")]
        EntryMethod::Deflated => Ok(Box::new(flate2::read::DeflateDecoder::new(raw))),
        #[cfg(feature = "bzip2")]
        EntryMethod::Bzip2 => Ok(Box::new(bzip2::read::BzDecoder::new(raw))),
        other => Err(Error::UnsupportedCompression {
            entry: name.to_string(),
            method: match other {
                EntryMethod::Other(m) => m.clone(),
                known => format!("{:?}", known),
            },
        }),
    }
}

/// Checks decoded entry data against the size and CRC-32 recorded in the
/// central directory.
///
/// The check runs on the read that reaches the recorded size, so a damaged
/// entry small enough for one read never reaches the caller. Truncated or
/// overlong data fails the same way.
struct VerifyingReader<R> {
    name: String,
    inner: R,
    hasher: Hasher,
    expected_size: u64,
    expected_crc: u32,
    read: u64,
    state: Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verify {
    Pending,
    Passed,
    Failed,
}

impl<R: Read> VerifyingReader<R> {
    fn new(name: String, inner: R, expected_size: u64, expected_crc: u32) -> Self {
        Self {
            name,
            inner,
            hasher: Hasher::new(),
            expected_size,
            expected_crc,
            read: 0,
            state: Verify::Pending,
        }
    }

    fn fail(&mut self, reason: String) -> io::Error {
        self.state = Verify::Failed;
        log::warn!("entry '{}' is damaged: {}", self.name, reason);
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("entry '{}': {}", self.name, reason),
        )
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.state == Verify::Failed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry '{}' failed verification", self.name),
            ));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.read += n as u64;

        if self.read > self.expected_size {
            let reason = format!("longer than its recorded {} bytes", self.expected_size);
            return Err(self.fail(reason));
        }
        if n == 0 && self.read < self.expected_size {
            let reason = format!(
                "truncated after {} of {} bytes",
                self.read, self.expected_size
            );
            return Err(self.fail(reason));
        }
        if self.state == Verify::Pending && self.read == self.expected_size {
            let actual = self.hasher.clone().finalize();
            if actual != self.expected_crc {
                let reason = format!(
                    "CRC-32 mismatch (expected {:08x}, got {:08x})",
                    self.expected_crc, actual
                );
                return Err(self.fail(reason));
            }
            self.state = Verify::Passed;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "PATN\nWKU  1\n").unwrap();

        let location = EntryLocation::File(path);
        let mut entry = ArchiveEntry::open("sub/a.txt".into(), 3, &location).unwrap();
        assert_eq!(entry.name(), "sub/a.txt");
        assert_eq!(entry.file_name(), "a.txt");
        assert_eq!(entry.index(), 3);

        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert_eq!(text, "PATN\nWKU  1\n");
    }

    #[test]
    fn test_encrypted_entry_rejected() {
        let location = EntryLocation::Zip {
            archive: PathBuf::from("unused.zip"),
            data_start: 0,
            compressed_size: 0,
            size: 0,
            crc32: 0,
            method: EntryMethod::Stored,
            encrypted: true,
        };
        let err = ArchiveEntry::open("secret.xml".into(), 0, &location).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCompression { .. }));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.zip");
        std::fs::write(&path, b"0123456789").unwrap();
        let location = EntryLocation::Zip {
            archive: path,
            data_start: 0,
            compressed_size: 4,
            size: 4,
            crc32: 0,
            method: EntryMethod::Other("Lzma".into()),
            encrypted: false,
        };
        let err = ArchiveEntry::open("x.xml".into(), 0, &location).unwrap_err();
        assert!(err.to_string().contains("Lzma"));
    }

    fn verify(data: &[u8], size: u64, crc: u32) -> io::Result<Vec<u8>> {
        let mut reader = VerifyingReader::new("d.xml".into(), data, size, crc);
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_verifying_reader_passes_intact_data() {
        let data = b"<doc>\nSECRET-AAAA\n</doc>\n";
        let crc = crc32fast::hash(data);
        assert_eq!(verify(data, data.len() as u64, crc).unwrap(), data);
        assert!(verify(b"", 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_verifying_reader_rejects_damage() {
        let data = b"<doc>\nSECRET-AAAA\n</doc>\n";
        let crc = crc32fast::hash(data);
        let damaged = b"<doc>\nGARBAGE-ZZZ\n</doc>\n";

        let err = verify(damaged, damaged.len() as u64, crc).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("CRC-32 mismatch"), "{}", err);

        let err = verify(&data[..10], data.len() as u64, crc).unwrap_err();
        assert!(err.to_string().contains("truncated"), "{}", err);

        let err = verify(data, 10, crc).unwrap_err();
        assert!(err.to_string().contains("longer"), "{}", err);
    }

    #[test]
    fn test_verifying_reader_stays_failed() {
        let mut reader = VerifyingReader::new("d.xml".into(), &b"abc"[..], 3, 0);
        let mut buf = [0u8; 8];
        assert!(reader.read(&mut buf).is_err());
        assert!(reader.read(&mut buf).is_err());
    }
}
