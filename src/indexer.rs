//! Index build/sync: reference documents → sectioned, classified rows.
//!
//! Documents are independent units: each one is read, sectionized and
//! replaced in the store on its own, and a failure (missing source file,
//! write error) is recorded in that document's outcome without aborting
//! the rest of the run.

use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;

use crate::{
    error::Error,
    registry::{DocEntry, DocumentRegistry},
    section::{self, Section},
    store::{DocReport, SectionStore},
};

/// Aggregate outcome of one sync run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<DocReport>,
    pub total_sections: usize,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Reindex all registered documents, or only `keys` when given.
///
/// Files are read and sectionized in parallel; store writes are issued
/// sequentially per document. Returns a per-document report plus the
/// total inserted section count.
pub fn sync_documents(
    registry: &DocumentRegistry,
    store: &SectionStore,
    keys: Option<&[String]>,
) -> SyncReport {
    let mut outcomes = Vec::new();

    let targets: Vec<&DocEntry> = match keys {
        Some(keys) => {
            let mut targets = Vec::new();
            for key in keys {
                match registry.entry(key) {
                    Some(entry) => targets.push(entry),
                    None => outcomes.push(DocReport {
                        doc_key: key.clone(),
                        sections: 0,
                        error: Some(
                            Error::NotFound {
                                kind: "document",
                                name: key.clone(),
                            }
                            .to_string(),
                        ),
                    }),
                }
            }
            targets
        }
        None => registry.entries().iter().collect(),
    };

    // Read + sectionize in parallel; write sequentially below.
    let parsed: Vec<(
        String,
        std::result::Result<Vec<Section>, String>,
    )> = targets
        .par_iter()
        .map(|entry| {
            let sections = match std::fs::read_to_string(&entry.path) {
                Ok(text) => Ok(section::sectionize(
                    &text,
                    &entry.key,
                    entry.default_priority,
                    entry.always_critical,
                )),
                Err(e) => Err(Error::SourceUnavailable {
                    doc_key: entry.key.clone(),
                    detail: format!("{}: {e}", entry.path.display()),
                }
                .to_string()),
            };
            (entry.key.clone(), sections)
        })
        .collect();

    let updated_at = now_epoch_secs();
    let mut total_sections = 0;

    for (doc_key, parsed) in parsed {
        match parsed {
            Ok(sections) => {
                let report =
                    store.replace_document(&doc_key, &sections, updated_at);
                if let Some(ref error) = report.error {
                    tracing::warn!(
                        doc_key = %doc_key,
                        error = %error,
                        "document reindex failed"
                    );
                } else {
                    tracing::info!(
                        doc_key = %doc_key,
                        sections = report.sections,
                        "document reindexed"
                    );
                }
                total_sections += report.sections;
                outcomes.push(report);
            }
            Err(error) => {
                tracing::warn!(
                    doc_key = %doc_key,
                    error = %error,
                    "document source unreadable"
                );
                outcomes.push(DocReport {
                    doc_key,
                    sections: 0,
                    error: Some(error),
                });
            }
        }
    }

    SyncReport {
        outcomes,
        total_sections,
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
