//! The section index store.
//!
//! One redb database holds every indexed section plus the document
//! registry. Section rows are keyed `"{doc_key}\0{section_title}"`, so a
//! document's rows form one contiguous, sorted key range; enumeration
//! order is therefore deterministic.
//!
//! A document's rows are fully replaced on reindex (delete-then-insert,
//! batched). There is no cross-document transaction: a reader running
//! mid-replace may observe zero or partial rows for that one document.
//! Callers needing strict consistency serialize sync and query phases.

use std::{collections::BTreeMap, path::Path};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    registry::{DocEntry, DocumentRegistry, PRIORITY_CRITICAL},
    section::Section,
};

const SECTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("sections");
const DOCUMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("documents");

/// Rows per insert transaction during a document replace.
pub const INSERT_BATCH_SIZE: usize = 50;

/// A section row as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSection {
    pub doc_key: String,
    pub title: String,
    pub body: String,
    pub keywords: Vec<String>,
    pub priority: u8,
    pub updated_at: u64,
}

impl StoredSection {
    fn from_section(section: &Section, updated_at: u64) -> Self {
        Self {
            doc_key: section.doc_key.clone(),
            title: section.title.clone(),
            body: section.body.clone(),
            keywords: section.keywords.clone(),
            priority: section.priority,
            updated_at,
        }
    }
}

/// Outcome of replacing one document's rows.
#[derive(Debug, Clone, Serialize)]
pub struct DocReport {
    pub doc_key: String,
    /// Rows successfully inserted before any failure.
    pub sections: usize,
    /// Detail of the first failed delete or insert batch, if any.
    pub error: Option<String>,
}

impl DocReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Flat listing entry for operational visibility.
#[derive(Debug, Clone, Serialize)]
pub struct SectionInfo {
    pub doc_key: String,
    pub title: String,
    pub priority: u8,
}

/// Store-wide summary returned by [`SectionStore::list_summary`].
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub total_sections: usize,
    pub by_document: BTreeMap<String, usize>,
    pub sections: Vec<SectionInfo>,
}

pub struct SectionStore {
    db: Database,
}

fn section_key(doc_key: &str, title: &str) -> String {
    format!("{doc_key}\0{title}")
}

/// Key range covering every section row of one document.
fn doc_range(doc_key: &str) -> (String, String) {
    (format!("{doc_key}\0"), format!("{doc_key}\u{1}"))
}

impl SectionStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        // Ensure all tables exist by opening them in a write transaction.
        let txn = db.begin_write()?;
        txn.open_table(SECTIONS)?;
        txn.open_table(DOCUMENTS)?;
        txn.commit()?;

        Ok(Self { db })
    }

    // -- Section rows --

    /// Replace every row of `doc_key` with `sections`.
    ///
    /// The old rows are deleted first, then the new set is inserted in
    /// batches of [`INSERT_BATCH_SIZE`]. A delete failure aborts the
    /// replace; an insert failure stops at that batch. Either way the
    /// returned report carries the inserted count and the error detail, so
    /// partial outcomes are visible, never silent.
    pub fn replace_document(
        &self,
        doc_key: &str,
        sections: &[Section],
        updated_at: u64,
    ) -> DocReport {
        if let Err(e) = self.delete_document(doc_key) {
            return DocReport {
                doc_key: doc_key.to_string(),
                sections: 0,
                error: Some(format!("delete failed: {e}")),
            };
        }

        let mut inserted = 0;
        for batch in sections.chunks(INSERT_BATCH_SIZE) {
            if let Err(e) = self.insert_batch(batch, updated_at) {
                return DocReport {
                    doc_key: doc_key.to_string(),
                    sections: inserted,
                    error: Some(format!("insert failed: {e}")),
                };
            }
            inserted += batch.len();
        }

        DocReport {
            doc_key: doc_key.to_string(),
            sections: inserted,
            error: None,
        }
    }

    fn delete_document(&self, doc_key: &str) -> Result<usize> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(SECTIONS)?;
            let (lo, hi) = doc_range(doc_key);
            let keys: Vec<String> = table
                .range(lo.as_str()..hi.as_str())?
                .map(|entry| entry.map(|(k, _)| k.value().to_string()))
                .collect::<std::result::Result<_, _>>()?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
            keys.len()
        };
        txn.commit()?;
        Ok(removed)
    }

    fn insert_batch(&self, batch: &[Section], updated_at: u64) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SECTIONS)?;
            for section in batch {
                let record = StoredSection::from_section(section, updated_at);
                let bytes = serde_json::to_vec(&record)?;
                let key = section_key(&section.doc_key, &section.title);
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// All rows of one document, in title key order.
    pub fn sections_for(&self, doc_key: &str) -> Result<Vec<StoredSection>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SECTIONS)?;
        let (lo, hi) = doc_range(doc_key);
        let mut rows = Vec::new();
        for entry in table.range(lo.as_str()..hi.as_str())? {
            let (_, value) = entry?;
            if let Ok(row) =
                serde_json::from_slice::<StoredSection>(value.value())
            {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Priority-1 rows belonging to the allow-listed documents.
    pub fn critical_sections(
        &self,
        allowed_keys: &[&str],
    ) -> Result<Vec<StoredSection>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SECTIONS)?;
        let mut rows = Vec::new();
        for key in allowed_keys {
            let (lo, hi) = doc_range(key);
            for entry in table.range(lo.as_str()..hi.as_str())? {
                let (_, value) = entry?;
                if let Ok(row) =
                    serde_json::from_slice::<StoredSection>(value.value())
                    && row.priority == PRIORITY_CRITICAL
                {
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    /// Case-insensitive substring match against title or body, across all
    /// documents, capped at `limit` rows. Rows come back in key order.
    pub fn match_keyword(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<StoredSection>> {
        let needle = keyword.to_lowercase();
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SECTIONS)?;
        let mut rows = Vec::new();
        for entry in table.iter()? {
            if rows.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            if let Ok(row) =
                serde_json::from_slice::<StoredSection>(value.value())
                && (row.title.to_lowercase().contains(&needle)
                    || row.body.to_lowercase().contains(&needle))
            {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    pub fn section_count(&self) -> Result<usize> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SECTIONS)?;
        Ok(table.iter()?.count())
    }

    /// Per-document counts plus a flat `(doc_key, title, priority)`
    /// listing, for operator visibility.
    pub fn list_summary(&self) -> Result<StoreSummary> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SECTIONS)?;

        let mut by_document: BTreeMap<String, usize> = BTreeMap::new();
        let mut sections = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            if let Ok(row) =
                serde_json::from_slice::<StoredSection>(value.value())
            {
                *by_document.entry(row.doc_key.clone()).or_insert(0) += 1;
                sections.push(SectionInfo {
                    doc_key: row.doc_key,
                    title: row.title,
                    priority: row.priority,
                });
            }
        }

        Ok(StoreSummary {
            total_sections: sections.len(),
            by_document,
            sections,
        })
    }

    // -- Document registry --

    pub fn put_doc_entry(&self, entry: &DocEntry) -> Result<()> {
        entry.validate()?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DOCUMENTS)?;
            table.insert(entry.key.as_str(), entry.serialize().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_doc_entry(&self, key: &str) -> Result<Option<DocEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        Ok(table
            .get(key)?
            .and_then(|v| DocEntry::deserialize(v.value())))
    }

    /// Remove a registration entry and all of its indexed rows.
    pub fn remove_doc_entry(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(DOCUMENTS)?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;

        if removed {
            self.delete_document(key)?;
        }
        Ok(removed)
    }

    /// Materialize the registry value object, in key order.
    pub fn load_registry(&self) -> Result<DocumentRegistry> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(DOCUMENTS)?;
        let mut entries = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            if let Some(doc) = DocEntry::deserialize(value.value()) {
                entries.push(doc);
            }
        }
        Ok(DocumentRegistry::new(entries))
    }
}

impl std::fmt::Debug for SectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionStore").finish_non_exhaustive()
    }
}
