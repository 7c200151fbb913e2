//! Record boundary detection.
//!
//! A [`RecordFormat`] names how records are delimited; a [`Boundary`] is the
//! per-stream detector state that consumes one line at a time and reports
//! when a record is complete.
//!
//! Both detectors can run in *counting* mode, where they track boundaries
//! without accumulating record text. Skipping and record counting use it so
//! that skipped records are never materialized.

/// Default start-of-record marker for flat dumps.
pub const DEFAULT_MARKER: &str = "PATN";

/// Default body element for tagged XML dumps.
pub const DEFAULT_BODY_TAG: &str = "us-patent-grant";

/// How records are delimited inside a dump.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordFormat {
    /// Each record starts at a line equal to `marker` and runs until the
    /// next marker line or end of file.
    Flat {
        /// Start-of-record marker line, without terminator.
        marker: String,
    },
    /// Each record runs from a line starting with `<body_tag` through a
    /// line starting with `</body_tag`, inclusive.
    TaggedXml {
        /// Name of the body element.
        body_tag: String,
    },
}

impl RecordFormat {
    /// Flat format with the default `PATN` marker.
    pub fn flat() -> Self {
        RecordFormat::Flat {
            marker: DEFAULT_MARKER.to_string(),
        }
    }

    /// Tagged XML format with the given body element.
    pub fn tagged(body_tag: impl Into<String>) -> Self {
        RecordFormat::TaggedXml {
            body_tag: body_tag.into(),
        }
    }

    /// Entry name suffix to look for when the dump sits inside an archive.
    pub fn default_entry_suffix(&self) -> &'static str {
        match self {
            RecordFormat::Flat { .. } => ".txt",
            RecordFormat::TaggedXml { .. } => ".xml",
        }
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self::tagged(DEFAULT_BODY_TAG)
    }
}

impl std::fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordFormat::Flat { marker } => write!(f, "flat (marker '{}')", marker),
            RecordFormat::TaggedXml { body_tag } => write!(f, "tagged XML (<{}>)", body_tag),
        }
    }
}

enum Kind {
    Marker {
        marker: String,
        /// The marker line as read, terminator included.
        head: String,
        /// Lines were seen since the last marker.
        pending: bool,
    },
    Tagged {
        open: String,
        close: String,
        close_element: String,
    },
}

/// Line-driven boundary detector for one record stream.
pub(crate) struct Boundary {
    kind: Kind,
    in_record: bool,
    buffer: String,
}

impl Boundary {
    pub(crate) fn new(format: &RecordFormat) -> Self {
        let kind = match format {
            RecordFormat::Flat { marker } => Kind::Marker {
                marker: marker.clone(),
                head: String::new(),
                pending: false,
            },
            RecordFormat::TaggedXml { body_tag } => Kind::Tagged {
                open: format!("<{}", body_tag),
                close: format!("</{}", body_tag),
                close_element: format!("</{}>", body_tag),
            },
        };
        Self {
            kind,
            in_record: false,
            buffer: String::new(),
        }
    }

    /// Feeds one line. Returns the completed record, if this line finished
    /// one. In counting mode (`collect == false`) the returned record is
    /// empty.
    pub(crate) fn feed(&mut self, line: &str, collect: bool) -> Option<String> {
        match &mut self.kind {
            Kind::Marker {
                marker,
                head,
                pending,
            } => {
                if strip_terminator(line) == marker.as_str() {
                    let completed = if self.in_record && *pending {
                        Some(assemble(head, &mut self.buffer, collect))
                    } else {
                        None
                    };
                    head.clear();
                    head.push_str(line);
                    if !line.ends_with('\n') {
                        head.push('\n');
                    }
                    self.buffer.clear();
                    self.in_record = true;
                    *pending = false;
                    completed
                } else {
                    if self.in_record {
                        *pending = true;
                        if collect {
                            self.buffer.push_str(line);
                        }
                    }
                    None
                }
            }
            Kind::Tagged {
                open,
                close,
                close_element,
            } => {
                let trimmed = line.trim_start();
                if starts_with_tag(trimmed, open) {
                    self.buffer.clear();
                    if collect {
                        self.buffer.push_str(line);
                    }
                    if trimmed[open.len()..].contains(close_element.as_str()) {
                        self.in_record = false;
                        return Some(std::mem::take(&mut self.buffer));
                    }
                    self.in_record = true;
                    None
                } else if self.in_record {
                    if collect {
                        self.buffer.push_str(line);
                    }
                    if starts_with_tag(trimmed, close) {
                        self.in_record = false;
                        return Some(std::mem::take(&mut self.buffer));
                    }
                    None
                } else {
                    None
                }
            }
        }
    }

    /// Signals end of input. Returns a final record if one is pending.
    ///
    /// Flat records legitimately end at end of file. A tagged record still
    /// open at end of file is truncated and dropped.
    pub(crate) fn finish(&mut self, collect: bool) -> Option<String> {
        let in_record = std::mem::replace(&mut self.in_record, false);
        match &mut self.kind {
            Kind::Marker { head, pending, .. } => {
                let completed =
                    (in_record && *pending).then(|| assemble(head, &mut self.buffer, collect));
                *pending = false;
                self.buffer.clear();
                completed
            }
            Kind::Tagged { open, .. } => {
                if in_record {
                    log::warn!("dropping truncated record opened by '{}>'", open);
                }
                self.buffer.clear();
                None
            }
        }
    }

    /// Returns true if a flat record is waiting for end of file.
    pub(crate) fn has_pending(&self) -> bool {
        match &self.kind {
            Kind::Marker { pending, .. } => self.in_record && *pending,
            Kind::Tagged { .. } => false,
        }
    }
}

fn assemble(head: &str, buffer: &mut String, collect: bool) -> String {
    if !collect {
        buffer.clear();
        return String::new();
    }
    let mut record = String::with_capacity(head.len() + buffer.len());
    record.push_str(head);
    record.push_str(buffer);
    buffer.clear();
    record
}

/// True if `text` starts with `tag` followed by a delimiter, so that
/// `<PATDOC` does not match `<PATDOCS`.
fn starts_with_tag(text: &str, tag: &str) -> bool {
    match text.strip_prefix(tag) {
        Some(rest) => match rest.chars().next() {
            None => true,
            Some(c) => c == '>' || c == '/' || c.is_whitespace(),
        },
        None => false,
    }
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
