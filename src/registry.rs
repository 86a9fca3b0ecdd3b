use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Priority tier for sections that must appear in every retrieval.
pub const PRIORITY_CRITICAL: u8 = 1;
/// Priority tier for sections included only on keyword match.
pub const PRIORITY_NORMAL: u8 = 2;

/// Registration entry for one reference document.
///
/// Serialized as: `"key\0label\0path\0priority\0critical\0always_on"`.
///
/// # Examples
///
/// ```
/// use lorebook::registry::DocEntry;
///
/// let entry = DocEntry {
///     key: "rules_core".to_string(),
///     label: "집필 규칙 핵심".to_string(),
///     path: "/docs/집필_규칙_핵심.md".into(),
///     default_priority: 1,
///     always_critical: true,
///     always_on: true,
/// };
/// let bytes = entry.serialize();
/// let restored = DocEntry::deserialize(&bytes).unwrap();
/// assert_eq!(entry, restored);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    /// Stable document key used to address sections in the store.
    pub key: String,
    /// Human-readable label used when rendering result bundles.
    pub label: String,
    /// Absolute path to the markdown source file.
    pub path: PathBuf,
    /// Priority assigned to sections no classifier rule promotes (1 or 2).
    pub default_priority: u8,
    /// Every section of this document is priority 1, unconditionally.
    pub always_critical: bool,
    /// Critical sections of this document are pinned into every retrieval.
    pub always_on: bool,
}

impl DocEntry {
    /// Serialize to a byte vector for storage in the index database.
    pub fn serialize(&self) -> Vec<u8> {
        format!(
            "{}\0{}\0{}\0{}\0{}\0{}",
            self.key,
            self.label,
            self.path.display(),
            self.default_priority,
            u8::from(self.always_critical),
            u8::from(self.always_on),
        )
        .into_bytes()
    }

    /// Deserialize from bytes. Returns `None` if the format is invalid.
    pub fn deserialize(bytes: &[u8]) -> Option<Self> {
        let s = std::str::from_utf8(bytes).ok()?;
        let mut parts = s.splitn(6, '\0');
        let key = parts.next()?.to_string();
        let label = parts.next()?.to_string();
        let path = PathBuf::from(parts.next()?);
        let default_priority = parts.next()?.parse().ok()?;
        let always_critical = parts.next()? == "1";
        let always_on = parts.next()? == "1";
        Some(Self {
            key,
            label,
            path,
            default_priority,
            always_critical,
            always_on,
        })
    }

    /// Validate key and priority constraints before registration.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() || self.key.contains(['\0', '\n']) {
            return Err(Error::Config(format!(
                "invalid document key: {:?}",
                self.key
            )));
        }
        if !matches!(self.default_priority, PRIORITY_CRITICAL | PRIORITY_NORMAL)
        {
            return Err(Error::Config(format!(
                "default priority must be {PRIORITY_CRITICAL} or {PRIORITY_NORMAL}, got {}",
                self.default_priority
            )));
        }
        Ok(())
    }

    /// The source filename without extension, used by the fallback scorer.
    pub fn doc_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.key.clone())
    }
}

/// The set of registered reference documents.
///
/// An explicit value object handed to the indexer, retrieval engine and
/// fallback scorer at construction time; nothing in the crate reads
/// registration state from globals.
#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    entries: Vec<DocEntry>,
}

impl DocumentRegistry {
    pub fn new(entries: Vec<DocEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[DocEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, key: &str) -> Option<&DocEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Human-readable label for a document key, falling back to the raw key.
    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        match self.entry(key) {
            Some(entry) => &entry.label,
            None => key,
        }
    }

    /// Keys whose critical sections are pinned into every retrieval.
    pub fn always_on_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.always_on)
            .map(|e| e.key.as_str())
            .collect()
    }

    /// Entries reordered so that hint-matched documents are scanned first.
    /// A pure ordering hint, not a filter.
    pub fn ordered_by_hints(&self, hints: &[String]) -> Vec<&DocEntry> {
        let mut ordered: Vec<&DocEntry> = self.entries.iter().collect();
        if !hints.is_empty() {
            ordered.sort_by_key(|e| {
                let name = e.doc_name();
                usize::from(!hints.iter().any(|h| name.contains(h.as_str())))
            });
        }
        ordered
    }
}
