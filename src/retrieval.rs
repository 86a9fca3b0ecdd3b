//! Hybrid retrieval over the section store.
//!
//! Every retrieval unconditionally includes the critical sections of the
//! pinned (always-on) documents, then adds keyword matches from the whole
//! store. Retrieval is about completeness and grounding, not relevance
//! ranking: within a group, sections keep fetch order, and the critical
//! set is first by construction.

use std::collections::{HashMap, HashSet};

use crate::{
    error::Result,
    registry::DocumentRegistry,
    store::{SectionStore, StoredSection},
    tags,
};

/// At most this many query keywords are looked up.
pub const MAX_QUERY_KEYWORDS: usize = 15;

/// Keywords shorter than this are skipped.
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Rows fetched per keyword.
pub const PER_KEYWORD_LIMIT: usize = 5;

const GROUP_DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";
const SECTION_DIVIDER: &str = "---";

/// One section in a result bundle.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RetrievedSection {
    pub title: String,
    pub body: String,
    pub priority: u8,
}

/// Sections of one document, rendered under its human-readable label.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocGroup {
    pub doc_key: String,
    pub label: String,
    pub sections: Vec<RetrievedSection>,
}

/// Grouped, formatted output of one retrieval call. Transient: built per
/// request, never persisted.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ResultBundle {
    pub groups: Vec<DocGroup>,
}

impl ResultBundle {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.groups.iter().map(|g| g.sections.len()).sum()
    }

    /// Every `(doc_key, title)` pair in the bundle, in render order.
    pub fn key_pairs(&self) -> Vec<(String, String)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.sections
                    .iter()
                    .map(|s| (g.doc_key.clone(), s.title.clone()))
            })
            .collect()
    }

    /// Render the bundle as grounding context: each group under its label,
    /// sections as `### title` blocks, groups separated by a divider.
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let sections: Vec<String> = group
                    .sections
                    .iter()
                    .map(|s| format!("### {}\n{}", s.title, s.body))
                    .collect();
                format!(
                    "## {}\n\n{}",
                    group.label,
                    sections.join(&format!("\n\n{SECTION_DIVIDER}\n\n"))
                )
            })
            .collect();
        parts.join(&format!("\n\n{GROUP_DIVIDER}\n\n"))
    }
}

/// Run one hybrid retrieval.
///
/// An empty (or all-too-short) keyword list still returns the critical
/// set; a keyword matching nothing contributes nothing. When `category`
/// is given, keyword matches from documents of other categories are
/// skipped; the critical set is unconditional by definition and is never
/// filtered.
pub fn retrieve(
    store: &SectionStore,
    registry: &DocumentRegistry,
    keywords: &[String],
    category: Option<&str>,
) -> Result<ResultBundle> {
    let always_on = registry.always_on_keys();
    let critical = store.critical_sections(&always_on)?;

    let mut seen: HashSet<(String, String)> = critical
        .iter()
        .map(|r| (r.doc_key.clone(), r.title.clone()))
        .collect();
    let mut merged: Vec<StoredSection> = critical;

    for keyword in keywords
        .iter()
        .filter(|k| k.chars().count() >= MIN_KEYWORD_CHARS)
        .take(MAX_QUERY_KEYWORDS)
    {
        for row in store.match_keyword(keyword, PER_KEYWORD_LIMIT)? {
            if let Some(category) = category {
                let doc_name = registry
                    .entry(&row.doc_key)
                    .map(|e| e.doc_name())
                    .unwrap_or_else(|| row.doc_key.clone());
                if !tags::guess_category(&doc_name).contains(category) {
                    continue;
                }
            }
            let pair = (row.doc_key.clone(), row.title.clone());
            if seen.insert(pair) {
                merged.push(row);
            }
        }
    }

    Ok(group_by_document(merged, registry))
}

/// Group merged rows by document in first-appearance order, which puts
/// the pinned documents first.
fn group_by_document(
    rows: Vec<StoredSection>,
    registry: &DocumentRegistry,
) -> ResultBundle {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<RetrievedSection>> = HashMap::new();

    for row in rows {
        if !grouped.contains_key(&row.doc_key) {
            order.push(row.doc_key.clone());
        }
        grouped.entry(row.doc_key.clone()).or_default().push(
            RetrievedSection {
                title: row.title,
                body: row.body,
                priority: row.priority,
            },
        );
    }

    let groups = order
        .into_iter()
        .map(|doc_key| {
            let sections = grouped.remove(&doc_key).unwrap_or_default();
            let label = registry.label_for(&doc_key).to_string();
            DocGroup {
                doc_key,
                label,
                sections,
            }
        })
        .collect();

    ResultBundle { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::{DocEntry, PRIORITY_CRITICAL, PRIORITY_NORMAL},
        section::Section,
    };

    fn entry(key: &str, file: &str, always_on: bool) -> DocEntry {
        DocEntry {
            key: key.to_string(),
            label: format!("{key} 문서"),
            path: format!("/docs/{file}").into(),
            default_priority: PRIORITY_NORMAL,
            always_critical: always_on,
            always_on,
        }
    }

    fn section(doc_key: &str, title: &str, body: &str, priority: u8) -> Section {
        Section {
            doc_key: doc_key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            keywords: vec![],
            priority,
        }
    }

    fn seeded() -> (tempfile::TempDir, SectionStore, DocumentRegistry) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SectionStore::open(&tmp.path().join("index.redb")).unwrap();

        store.replace_document(
            "rules_core",
            &[
                section("rules_core", "전수 정책", "전수의 범위와 한계", PRIORITY_CRITICAL),
                section("rules_core", "금지어", "금지 단어 목록", PRIORITY_CRITICAL),
                section("rules_core", "부록", "참고 자료 모음", PRIORITY_NORMAL),
            ],
            1000,
        );
        store.replace_document(
            "geo",
            &[
                section("geo", "화산파", "화산파는 섬서성 화산에 있다", PRIORITY_NORMAL),
                section("geo", "개봉", "개봉의 위치와 지형", PRIORITY_NORMAL),
            ],
            1000,
        );
        store.replace_document(
            "food",
            &[section("food", "면류", "객잔 국수 메뉴", PRIORITY_NORMAL)],
            1000,
        );

        let registry = DocumentRegistry::new(vec![
            entry("rules_core", "집필_규칙_핵심.md", true),
            entry("geo", "지리_상세.md", false),
            entry("food", "음식_DB.md", false),
        ]);
        (tmp, store, registry)
    }

    #[test]
    fn critical_set_always_included() {
        let (_tmp, store, registry) = seeded();

        for keywords in [vec![], vec!["화산파".to_string()]] {
            let bundle = retrieve(&store, &registry, &keywords, None).unwrap();
            let pairs = bundle.key_pairs();
            assert!(pairs.contains(&(
                "rules_core".to_string(),
                "전수 정책".to_string()
            )));
            assert!(pairs
                .contains(&("rules_core".to_string(), "금지어".to_string())));
        }
    }

    #[test]
    fn empty_keywords_return_critical_only() {
        let (_tmp, store, registry) = seeded();
        let bundle = retrieve(&store, &registry, &[], None).unwrap();

        assert_eq!(bundle.section_count(), 2);
        assert_eq!(bundle.groups.len(), 1);
        assert_eq!(bundle.groups[0].doc_key, "rules_core");
    }

    #[test]
    fn keyword_matches_added_after_critical() {
        let (_tmp, store, registry) = seeded();
        let bundle = retrieve(
            &store,
            &registry,
            &["화산파".to_string()],
            None,
        )
        .unwrap();

        assert_eq!(bundle.groups[0].doc_key, "rules_core");
        let pairs = bundle.key_pairs();
        assert!(pairs.contains(&("geo".to_string(), "화산파".to_string())));
    }

    #[test]
    fn no_duplicate_pairs() {
        let (_tmp, store, registry) = seeded();
        // "금지" matches a section already pinned by the critical set.
        let bundle = retrieve(
            &store,
            &registry,
            &["금지".to_string(), "금지어".to_string()],
            None,
        )
        .unwrap();

        let pairs = bundle.key_pairs();
        let unique: HashSet<_> = pairs.iter().collect();
        assert_eq!(pairs.len(), unique.len());
    }

    #[test]
    fn short_keywords_skipped() {
        let (_tmp, store, registry) = seeded();
        let bundle = retrieve(
            &store,
            &registry,
            &["면".to_string()],
            None,
        )
        .unwrap();

        // Single-char keyword filtered out: critical set only.
        assert_eq!(bundle.section_count(), 2);
    }

    #[test]
    fn unmatched_keyword_contributes_nothing() {
        let (_tmp, store, registry) = seeded();
        let a = retrieve(&store, &registry, &[], None).unwrap();
        let b = retrieve(&store, &registry, &["존재하지않는말".to_string()], None)
            .unwrap();
        assert_eq!(a.key_pairs(), b.key_pairs());
    }

    #[test]
    fn merge_idempotent() {
        let (_tmp, store, registry) = seeded();
        let keywords = vec!["화산파".to_string(), "국수".to_string()];
        let a = retrieve(&store, &registry, &keywords, None).unwrap();
        let b = retrieve(&store, &registry, &keywords, None).unwrap();
        assert_eq!(a.key_pairs(), b.key_pairs());
    }

    #[test]
    fn category_filter_limits_keyword_matches() {
        let (_tmp, store, registry) = seeded();
        // Both geo and food match "객잔" or "위치"-adjacent terms; restrict
        // keyword additions to the geography category.
        let bundle = retrieve(
            &store,
            &registry,
            &["개봉".to_string(), "국수".to_string()],
            Some("지리"),
        )
        .unwrap();

        let pairs = bundle.key_pairs();
        assert!(pairs.contains(&("geo".to_string(), "개봉".to_string())));
        assert!(!pairs.iter().any(|(k, _)| k == "food"));
        // Critical set untouched by the filter.
        assert!(pairs
            .contains(&("rules_core".to_string(), "금지어".to_string())));
    }

    #[test]
    fn render_groups_under_labels() {
        let (_tmp, store, registry) = seeded();
        let bundle =
            retrieve(&store, &registry, &["화산파".to_string()], None).unwrap();
        let text = bundle.render();

        assert!(text.contains("## rules_core 문서"));
        assert!(text.contains("### 금지어"));
        assert!(text.contains("### 화산파"));
        assert!(text.contains(GROUP_DIVIDER));
    }

    #[test]
    fn unregistered_doc_key_renders_raw() {
        let (_tmp, store, _) = seeded();
        let registry = DocumentRegistry::new(vec![]);
        let bundle =
            retrieve(&store, &registry, &["화산파".to_string()], None).unwrap();

        assert!(!bundle.is_empty());
        assert_eq!(bundle.groups[0].label, bundle.groups[0].doc_key);
    }
}
