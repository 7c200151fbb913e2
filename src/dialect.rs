//! Document dialect detection.
//!
//! Bulk patent dumps come in several generations of incompatible encodings.
//! This module sniffs the first lines of a dump (and, failing that, its file
//! name) to decide which one it is and how its records are delimited.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::archive::{ArchiveScanner, InputKind, detect_input};
use crate::record::RecordFormat;
use crate::select::EntrySelector;
use crate::{READ_BUFFER_SIZE, Result};

/// Number of lines inspected before giving up on content sniffing.
const SNIFF_LINES: usize = 64;

/// Entry suffixes considered when sniffing inside archives.
const DUMP_SUFFIXES: &[&str] = &[".xml", ".sgm", ".sgml", ".txt"];

/// Number of candidate entries sniffed before falling back to name hints.
const SNIFF_ENTRIES: usize = 16;

/// DOCTYPE preamble declaring the character entities SGML dumps use
/// without defining them.
pub const ENTITY_HEADER: &str = concat!(
    "<!DOCTYPE PATDOC [\n",
    "<!ENTITY nbsp \"&#160;\">\n",
    "<!ENTITY ndash \"&#8211;\">\n",
    "<!ENTITY mdash \"&#8212;\">\n",
    "<!ENTITY lsquo \"&#8216;\">\n",
    "<!ENTITY rsquo \"&#8217;\">\n",
    "<!ENTITY ldquo \"&#8220;\">\n",
    "<!ENTITY rdquo \"&#8221;\">\n",
    "<!ENTITY deg \"&#176;\">\n",
    "<!ENTITY plusmn \"&#177;\">\n",
    "<!ENTITY times \"&#215;\">\n",
    "<!ENTITY divide \"&#247;\">\n",
    "<!ENTITY micro \"&#181;\">\n",
    "<!ENTITY middot \"&#183;\">\n",
    "<!ENTITY para \"&#182;\">\n",
    "<!ENTITY sect \"&#167;\">\n",
    "<!ENTITY reg \"&#174;\">\n",
    "<!ENTITY copy \"&#169;\">\n",
    "<!ENTITY trade \"&#8482;\">\n",
    "<!ENTITY lt \"&#38;#60;\">\n",
    "<!ENTITY gt \"&#62;\">\n",
    "<!ENTITY amp \"&#38;#38;\">\n",
    "]>\n",
);

/// Generation of the bulk dump encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Flat APS text ("Green Book"), records start at a `PATN` line.
    Greenbook,
    /// 2001 SGML grants, `<PATDOC>` records.
    Sgml,
    /// 2001-2004 application publications, `<patent-application-publication>`.
    PapXml,
    /// XML grants, `<us-patent-grant>` records.
    RedbookGrant,
    /// XML applications, `<us-patent-application>` records.
    RedbookApplication,
}

impl Dialect {
    /// All known dialects.
    pub const ALL: [Dialect; 5] = [
        Dialect::Greenbook,
        Dialect::Sgml,
        Dialect::PapXml,
        Dialect::RedbookGrant,
        Dialect::RedbookApplication,
    ];

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Greenbook => "greenbook",
            Dialect::Sgml => "sgml",
            Dialect::PapXml => "pap",
            Dialect::RedbookGrant => "redbook-grant",
            Dialect::RedbookApplication => "redbook-application",
        }
    }

    /// Body element for tagged dialects; `None` for the flat dialect.
    pub fn body_tag(&self) -> Option<&'static str> {
        match self {
            Dialect::Greenbook => None,
            Dialect::Sgml => Some("PATDOC"),
            Dialect::PapXml => Some("patent-application-publication"),
            Dialect::RedbookGrant => Some("us-patent-grant"),
            Dialect::RedbookApplication => Some("us-patent-application"),
        }
    }

    /// How records of this dialect are delimited.
    pub fn record_format(&self) -> RecordFormat {
        match self.body_tag() {
            Some(tag) => RecordFormat::tagged(tag),
            None => RecordFormat::flat(),
        }
    }

    /// Suffix of dump entries of this dialect inside archives.
    pub fn entry_suffix(&self) -> &'static str {
        match self {
            Dialect::Greenbook => ".txt",
            Dialect::Sgml => ".sgm",
            _ => ".xml",
        }
    }

    /// Whether records need [`ENTITY_HEADER`] before they can be parsed.
    pub fn needs_entity_header(&self) -> bool {
        matches!(self, Dialect::Sgml)
    }

    /// Guesses the dialect from a dump's file name.
    ///
    /// Only used when content sniffing is inconclusive.
    pub fn from_file_name(name: &str) -> Option<Dialect> {
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".sgm") || lower.ends_with(".sgml") {
            Some(Dialect::Sgml)
        } else if lower.starts_with("pftaps") || lower.ends_with(".txt") {
            Some(Dialect::Greenbook)
        } else if lower.starts_with("ipg") {
            Some(Dialect::RedbookGrant)
        } else if lower.starts_with("ipa") {
            Some(Dialect::RedbookApplication)
        } else if lower.starts_with("pa") && lower.ends_with(".xml") {
            Some(Dialect::PapXml)
        } else {
            None
        }
    }

    /// Inspects the first lines of a dump.
    pub fn sniff<R: BufRead>(reader: R) -> Result<Option<Dialect>> {
        for line in reader.split(b'\n').take(SNIFF_LINES) {
            let line = line?;
            let line = String::from_utf8_lossy(&line);
            if let Some(dialect) = sniff_line(line.trim()) {
                return Ok(Some(dialect));
            }
        }
        Ok(None)
    }

    /// Detects the dialect of the dump at `path`.
    ///
    /// See [`locate`](Self::locate) for which entry of an archive is used.
    pub fn detect<P: AsRef<Path>>(
        path: P,
        selector: Option<&EntrySelector>,
    ) -> Result<Option<Dialect>> {
        Ok(Self::locate(path, selector)?.dialect)
    }

    /// Detects the dialect of the dump at `path` and reports which archive
    /// entry it was read from.
    ///
    /// Plain files are sniffed directly. For archives and directories the
    /// entries passing `selector` (or, without one, the entries with a dump
    /// suffix) are sniffed in order until one is recognized by content. If
    /// none is, the first candidate's file name decides.
    pub fn locate<P: AsRef<Path>>(path: P, selector: Option<&EntrySelector>) -> Result<Detection> {
        let path = path.as_ref();
        let detection = match detect_input(path)? {
            InputKind::Plain => {
                let file = std::fs::File::open(path)?;
                let sniffed = Self::sniff(BufReader::with_capacity(READ_BUFFER_SIZE, file))?;
                Detection {
                    dialect: sniffed.or_else(|| Self::from_file_name(&path.to_string_lossy())),
                    entry: None,
                }
            }
            InputKind::Zip | InputKind::Directory => match selector {
                Some(selector) => sniff_entries(ArchiveScanner::new(path, selector.clone()))?,
                None => sniff_entries(ArchiveScanner::new(path, has_dump_suffix))?,
            },
        };
        match (detection.dialect, &detection.entry) {
            (Some(dialect), Some(entry)) => {
                log::debug!("'{}' detected as {} from '{}'", path.display(), dialect, entry)
            }
            (Some(dialect), None) => log::debug!("'{}' detected as {}", path.display(), dialect),
            (None, _) => log::debug!("no dialect detected for '{}'", path.display()),
        }
        Ok(detection)
    }
}

/// Outcome of [`Dialect::locate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Detected dialect, if any.
    pub dialect: Option<Dialect>,
    /// Full path of the archive entry the dialect was read from. `None` for
    /// plain files and for archives with no candidate entry.
    pub entry: Option<String>,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Dialect::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dialect '{}'", s))
    }
}

fn sniff_line(line: &str) -> Option<Dialect> {
    if line == "PATN" || line.starts_with("HHHHHT") {
        return Some(Dialect::Greenbook);
    }
    let element = if let Some(rest) = line.strip_prefix("<!DOCTYPE") {
        rest.trim_start()
    } else if let Some(rest) = line.strip_prefix('<') {
        rest
    } else {
        return None;
    };
    let name_end = element
        .find(|c: char| c.is_whitespace() || c == '>' || c == '[' || c == '/')
        .unwrap_or(element.len());
    match &element[..name_end] {
        "PATDOC" => Some(Dialect::Sgml),
        "patent-application-publication" => Some(Dialect::PapXml),
        "us-patent-grant" => Some(Dialect::RedbookGrant),
        "us-patent-application" => Some(Dialect::RedbookApplication),
        _ => None,
    }
}

fn has_dump_suffix(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    DUMP_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

fn sniff_entries<F: crate::EntryFilter>(mut scanner: ArchiveScanner<F>) -> Result<Detection> {
    scanner.open()?;
    let mut first = None;
    for _ in 0..SNIFF_ENTRIES {
        let Some(entry) = scanner.next_entry()? else {
            break;
        };
        let name = entry.name().to_string();
        let reader: Box<dyn Read + Send> = entry.into_reader();
        if let Some(dialect) = Dialect::sniff(BufReader::with_capacity(READ_BUFFER_SIZE, reader))? {
            scanner.close();
            return Ok(Detection {
                dialect: Some(dialect),
                entry: Some(name),
            });
        }
        log::trace!("'{}' not recognized by content", name);
        first.get_or_insert(name);
    }
    scanner.close();
    Ok(Detection {
        dialect: first.as_deref().and_then(Dialect::from_file_name),
        entry: first,
    })
}
