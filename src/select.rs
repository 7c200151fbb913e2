//! Entry selection for archive and directory scans.
//!
//! An [`EntrySelector`] decides which files inside an archive hold record
//! data. It combines up to three criteria: the normalized parent path, the
//! exact file name and a file name suffix. Every configured criterion must
//! hold; unconfigured criteria are ignored.
//!
//! ```rust
//! use bulkdump::EntrySelector;
//!
//! let selector = EntrySelector::new()
//!     .parent_path("corpus/patents")
//!     .suffix("xml");
//!
//! assert!(selector.matches("corpus/patents/foo.xml"));
//! assert!(!selector.matches("corpus/other/foo.xml"));
//! assert!(!selector.matches("corpus/patents/foo.sgm"));
//! ```

/// A filter deciding whether an entry path is a record source.
///
/// # Built-in Implementations
///
/// | Type | Behavior |
/// |------|----------|
/// | `()` | Selects all entries |
/// | [`EntrySelector`] | Parent path / name / suffix criteria |
/// | `Fn(&str) -> bool` | Custom predicate on the entry path |
pub trait EntryFilter {
    /// Returns true if the entry at `path` should be read.
    fn select(&self, path: &str) -> bool;

    /// Short description used in log lines and error messages.
    fn describe(&self) -> String {
        "custom filter".to_string()
    }
}

impl EntryFilter for () {
    fn select(&self, _path: &str) -> bool {
        true
    }

    fn describe(&self) -> String {
        "any entry".to_string()
    }
}

impl<F: Fn(&str) -> bool> EntryFilter for F {
    fn select(&self, path: &str) -> bool {
        self(path)
    }
}

impl EntryFilter for EntrySelector {
    fn select(&self, path: &str) -> bool {
        self.matches(path)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// Parent path, exact name and suffix criteria for archive entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySelector {
    parent_path: Option<String>,
    name: Option<String>,
    suffix: Option<String>,
}

impl EntrySelector {
    /// Creates a selector with no criteria; it matches every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the entry's parent directory to equal `path` exactly.
    ///
    /// The path is normalized the same way entry paths are: backslashes
    /// become forward slashes and one leading separator is dropped. An
    /// empty string clears the criterion.
    pub fn parent_path(mut self, path: impl AsRef<str>) -> Self {
        let normalized = normalize_path(path.as_ref());
        let normalized = normalized.trim_end_matches('/');
        self.parent_path = (!normalized.is_empty()).then(|| normalized.to_string());
        self
    }

    /// Requires the entry's file name to equal `name` exactly.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.is_empty()).then_some(name);
        self
    }

    /// Requires the entry's file name to end with `suffix`.
    ///
    /// The suffix is compared literally, so `"xml"` and `".xml"` both match
    /// `foo.xml`.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Returns true if no criterion is configured.
    pub fn is_empty(&self) -> bool {
        self.parent_path.is_none() && self.name.is_none() && self.suffix.is_none()
    }

    /// Tests an entry path against every configured criterion.
    pub fn matches(&self, entry_path: &str) -> bool {
        let normalized = normalize_path(entry_path);
        let (parent, file_name) = match normalized.rfind('/') {
            Some(pos) => (&normalized[..pos], &normalized[pos + 1..]),
            None => ("", normalized.as_str()),
        };

        if let Some(wanted) = &self.parent_path {
            if parent != wanted {
                return false;
            }
        }

        if let Some(wanted) = &self.name {
            if file_name != wanted {
                return false;
            }
        }

        if let Some(suffix) = &self.suffix {
            if !file_name.ends_with(suffix.as_str()) {
                return false;
            }
        }

        true
    }
}

impl std::fmt::Display for EntrySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "any entry");
        }
        let mut parts = Vec::new();
        if let Some(p) = &self.parent_path {
            parts.push(format!("parent '{}'", p));
        }
        if let Some(n) = &self.name {
            parts.push(format!("name '{}'", n));
        }
        if let Some(s) = &self.suffix {
            parts.push(format!("suffix '{}'", s));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Normalizes path separators to `/` and strips a single leading separator.
pub(crate) fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => path,
    }
}
