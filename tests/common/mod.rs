//! Shared test utilities for integration tests.
//!
//! This module provides fixture builders used across multiple test files:
//! synthetic dumps in each dialect and ZIP archives holding them.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Builds a flat (Green Book style) dump with `count` records.
///
/// Record `n` (1-based) carries `WKU  n` so tests can tell records apart.
pub fn flat_dump(count: usize) -> String {
    let mut text = String::from("HHHHHT  APS1\n");
    for n in 1..=count {
        text.push_str(&format!("PATN\nWKU  {:08}\nTTL  Widget number {}\n", n, n));
    }
    text
}

/// Builds a tagged XML dump with `count` records of the given body element.
///
/// Each record is preceded by its own XML declaration and DOCTYPE, as in
/// real concatenated weekly files.
pub fn tagged_dump(body_tag: &str, count: usize) -> String {
    let mut text = String::new();
    for n in 1..=count {
        text.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        text.push_str(&format!(
            "<!DOCTYPE {} SYSTEM \"{}.dtd\" [ ]>\n",
            body_tag, body_tag
        ));
        text.push_str(&format!("<{} lang=\"EN\" file=\"US{:08}.XML\">\n", body_tag, n));
        text.push_str(&format!("  <doc-number>{:08}</doc-number>\n", n));
        text.push_str(&format!("  <invention-title>Widget {}</invention-title>\n", n));
        text.push_str(&format!("</{}>\n", body_tag));
    }
    text
}

/// Writes `contents` to `name` inside `dir` and returns the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(&path, contents).expect("Failed to write fixture");
    path
}

/// Writes a ZIP archive with the given entries, compressed with `method`.
///
/// Entry names ending in `/` become directory entries.
pub fn write_zip_with(
    dir: &Path,
    name: &str,
    method: CompressionMethod,
    entries: &[(&str, &str)],
) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).expect("Failed to create archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(method);
    for (entry, contents) in entries {
        if entry.ends_with('/') {
            writer
                .add_directory(*entry, options)
                .expect("Failed to add directory");
        } else {
            writer
                .start_file(*entry, options)
                .expect("Failed to start entry");
            writer
                .write_all(contents.as_bytes())
                .expect("Failed to write entry");
        }
    }
    writer.finish().expect("Failed to finish archive");
    path
}

/// Writes a deflate-compressed ZIP archive (stored when the `deflate`
/// feature is off).
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let method = if cfg!(feature = "deflate") {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    write_zip_with(dir, name, method, entries)
}

/// Overwrites the first occurrence of `from` in the file at `path` with
/// `to`, which must have the same length.
pub fn replace_bytes(path: &Path, from: &str, to: &str) {
    assert_eq!(from.len(), to.len(), "replacement must keep the length");
    let mut bytes = std::fs::read(path).expect("Failed to read fixture");
    let start = bytes
        .windows(from.len())
        .position(|w| w == from.as_bytes())
        .expect("Pattern not found in fixture");
    bytes[start..start + to.len()].copy_from_slice(to.as_bytes());
    std::fs::write(path, bytes).expect("Failed to write fixture");
}

/// Zeroes up to `len` bytes in the middle of the compressed data of the
/// archive entry at `index`, leaving the archive directory intact.
pub fn damage_entry(path: &Path, index: usize, len: usize) {
    let (start, size) = {
        let file = File::open(path).expect("Failed to open archive");
        let mut archive = zip::ZipArchive::new(file).expect("Failed to read archive");
        let entry = archive.by_index_raw(index).expect("Missing entry");
        (entry.data_start(), entry.compressed_size())
    };
    let mut bytes = std::fs::read(path).expect("Failed to read archive");
    let from = (start + size / 2) as usize;
    let to = (from + len).min((start + size) as usize);
    bytes[from..to].fill(0);
    std::fs::write(path, bytes).expect("Failed to write archive");
}

/// Creates a temporary directory.
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}
