//! Degraded-mode retrieval: score documents straight from disk.
//!
//! When the index store cannot answer, the same query is served by
//! re-reading the registered documents and ranking their sections with a
//! weighted term-frequency score. No state is persisted; every query
//! re-reads the sources. Query tokens are matched as literal substrings,
//! so regex metacharacters in tag-derived queries are inert.

use std::cmp::Ordering;

use crate::{registry::DocumentRegistry, section, tags};

/// Per-token cap on the body occurrence score.
const MAX_OCCURRENCE_SCORE: usize = 5;

/// Weight for a token appearing in the section heading.
const HEADING_BONUS: f64 = 3.0;

/// Weight for a token appearing in the document filename.
const FILENAME_BONUS: f64 = 2.0;

/// Bonus when the entire query appears verbatim in the body.
const PHRASE_BONUS: f64 = 5.0;

/// Bonus for documents named by a hint.
const HINT_BONUS: f64 = 3.0;

/// Returned section text is truncated to this many characters.
const SNIPPET_CHARS: usize = 800;

/// One scored fragment from the fallback path.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoredSection {
    pub doc_key: String,
    pub doc_name: String,
    pub category: String,
    pub heading: String,
    pub text: String,
    pub score: f64,
}

/// Scores registered documents directly from their source files.
#[derive(Debug)]
pub struct LocalScorer<'a> {
    registry: &'a DocumentRegistry,
}

impl<'a> LocalScorer<'a> {
    pub fn new(registry: &'a DocumentRegistry) -> Self {
        Self { registry }
    }

    /// Rank sections for `query`, descending by score; zero-score sections
    /// are excluded.
    ///
    /// `doc_hints` reorders scanning (hinted documents first) and grants a
    /// flat bonus; it never filters. `category` excludes documents whose
    /// inferred category does not match, before any scoring. A document
    /// whose source file cannot be read contributes zero sections.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        category: Option<&str>,
        doc_hints: &[String],
    ) -> Vec<ScoredSection> {
        let query_lower = query.to_lowercase();
        let tokens: Vec<&str> = query_lower
            .split([' ', '\t', '\n', ','])
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();

        for entry in self.registry.ordered_by_hints(doc_hints) {
            let doc_name = entry.doc_name();
            let doc_category = tags::guess_category(&doc_name);
            if let Some(category) = category
                && !doc_category.contains(category)
            {
                continue;
            }

            let Ok(content) = std::fs::read_to_string(&entry.path) else {
                continue;
            };

            let doc_name_lower = doc_name.to_lowercase();
            let hinted =
                doc_hints.iter().any(|h| doc_name.contains(h.as_str()));

            for fragment in section::split_headings(&content) {
                let text_lower = fragment.body.to_lowercase();
                let heading_lower = fragment.title.to_lowercase();

                let mut score = 0.0;
                for token in &tokens {
                    let count = text_lower.matches(token).count();
                    if count > 0 {
                        score += count.min(MAX_OCCURRENCE_SCORE) as f64;
                    }
                    if heading_lower.contains(token) {
                        score += HEADING_BONUS;
                    }
                    if doc_name_lower.contains(token) {
                        score += FILENAME_BONUS;
                    }
                }
                if text_lower.contains(&query_lower) {
                    score += PHRASE_BONUS;
                }
                if hinted {
                    score += HINT_BONUS;
                }

                if score > 0.0 {
                    results.push(ScoredSection {
                        doc_key: entry.key.clone(),
                        doc_name: doc_name.clone(),
                        category: doc_category.to_string(),
                        heading: fragment.title,
                        text: fragment
                            .body
                            .chars()
                            .take(SNIPPET_CHARS)
                            .collect(),
                        score: (score * 100.0).round() / 100.0,
                    });
                }
            }
        }

        results.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::registry::{DocEntry, PRIORITY_NORMAL};

    fn entry(key: &str, path: PathBuf) -> DocEntry {
        DocEntry {
            key: key.to_string(),
            label: key.to_string(),
            path,
            default_priority: PRIORITY_NORMAL,
            always_critical: false,
            always_on: false,
        }
    }

    fn corpus() -> (tempfile::TempDir, DocumentRegistry) {
        let tmp = tempfile::tempdir().unwrap();
        let geo = tmp.path().join("지리_상세.md");
        std::fs::write(
            &geo,
            "# 지리 개요\n중원의 전체 지형을 설명한다.\n\
             ## 화산파\n화산파는 섬서성 화산에 자리한 검법 문파이다. 위치는 산세가 험한 곳이다.\n\
             ## 개봉\n개봉은 하남성의 대도시이다.",
        )
        .unwrap();

        let food = tmp.path().join("음식_DB.md");
        std::fs::write(
            &food,
            "# 면류\n국수와 만두의 종류를 정리한다. 위치 좋은 객잔이 잘 판다.",
        )
        .unwrap();

        let registry = DocumentRegistry::new(vec![
            entry("geo", geo),
            entry("food", food),
        ]);
        (tmp, registry)
    }

    #[test]
    fn title_match_outranks_incidental_mention() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        let results = scorer.search("화산파 위치", 5, None, &[]);
        assert!(!results.is_empty());
        assert_eq!(results[0].heading, "화산파");
        assert_eq!(results[0].doc_name, "지리_상세");

        let food_hit = results.iter().find(|r| r.doc_key == "food");
        if let Some(food_hit) = food_hit {
            assert!(results[0].score > food_hit.score);
        }
    }

    #[test]
    fn scores_positive_and_sorted() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        let results = scorer.search("위치", 10, None, &[]);
        assert!(!results.is_empty());
        for r in &results {
            assert!(r.score > 0.0);
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        // Must neither panic nor match anything spuriously.
        let results = scorer.search(r".* ( ) [ ] \ 화산파", 5, None, &[]);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.score > 0.0));

        let weird = scorer.search(r"^$|?+", 5, None, &[]);
        assert!(weird.is_empty());
    }

    #[test]
    fn category_filter_excludes_documents() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        let results = scorer.search("위치", 10, Some("지리"), &[]);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.doc_key == "geo"));
    }

    #[test]
    fn hints_add_bonus_without_filtering() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        let hinted =
            scorer.search("위치", 10, None, &["음식".to_string()]);
        let food_hit =
            hinted.iter().find(|r| r.doc_key == "food").unwrap();
        let plain = scorer.search("위치", 10, None, &[]);
        let food_plain =
            plain.iter().find(|r| r.doc_key == "food").unwrap();

        assert_eq!(food_hit.score, food_plain.score + HINT_BONUS);
        assert!(hinted.iter().any(|r| r.doc_key == "geo"), "hints never filter");
    }

    #[test]
    fn missing_file_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("세력도.md");
        std::fs::write(&present, "# 천화련\n천화련의 세력 범위를 설명한다.")
            .unwrap();
        let registry = DocumentRegistry::new(vec![
            entry("ghost", tmp.path().join("없는_파일.md")),
            entry("factions", present),
        ]);
        let scorer = LocalScorer::new(&registry);

        let results = scorer.search("천화련", 5, None, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_key, "factions");
    }

    #[test]
    fn empty_query_returns_nothing() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);
        assert!(scorer.search("", 5, None, &[]).is_empty());
        assert!(scorer.search(" , ", 5, None, &[]).is_empty());
    }

    #[test]
    fn phrase_bonus_applies() {
        let (_tmp, registry) = corpus();
        let scorer = LocalScorer::new(&registry);

        let phrase = scorer.search("섬서성 화산", 5, None, &[]);
        assert!(!phrase.is_empty());
        // Token scores (1+1) + phrase bonus 5.
        assert!(phrase[0].score >= 7.0);
    }

    #[test]
    fn long_sections_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("무공_기법_대전.md");
        let body = "긴 설명 ".repeat(400);
        std::fs::write(&path, format!("# 기법 목록\n{body}")).unwrap();
        let registry = DocumentRegistry::new(vec![entry("dict", path)]);
        let scorer = LocalScorer::new(&registry);

        let results = scorer.search("기법", 5, None, &[]);
        assert_eq!(results.len(), 1);
        assert!(results[0].text.chars().count() <= SNIPPET_CHARS);
    }
}
