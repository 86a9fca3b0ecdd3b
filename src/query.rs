//! The query entry point: primary retrieval with a bounded first stage
//! and a guaranteed-terminating fallback.
//!
//! Stage 1 answers from the section store under a short timeout. On
//! timeout or store error the same query is answered by the local scorer
//! instead, and the response is flagged as degraded: which path served
//! the request is part of the return type, never inferred. A timed-out
//! primary task's result is discarded when its handle is dropped; it is
//! never merged after the fallback has answered. Dropping the `execute`
//! future cancels both stages.

use std::{sync::Arc, time::Duration};

use crate::{
    error::{Error, Result},
    fallback::{LocalScorer, ScoredSection},
    registry::DocumentRegistry,
    retrieval::{self, MIN_KEYWORD_CHARS, ResultBundle},
    store::SectionStore,
    tags,
};

/// How long the primary path may run before the fallback takes over.
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(3);

/// Default result cap for the fallback path.
pub const DEFAULT_TOP_K: usize = 5;

/// One retrieval request: free-text query or tag, never both.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub query: Option<String>,
    pub tag: Option<String>,
    pub top_k: usize,
    pub category: Option<String>,
}

/// Which path served the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Primary,
    Fallback,
}

/// Results from whichever path answered.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum QueryResults {
    Bundle(ResultBundle),
    Scored(Vec<ScoredSection>),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryResponse {
    pub source: QuerySource,
    pub results: QueryResults,
}

impl QueryResponse {
    pub fn result_count(&self) -> usize {
        match &self.results {
            QueryResults::Bundle(bundle) => bundle.section_count(),
            QueryResults::Scored(scored) => scored.len(),
        }
    }
}

/// Executes queries against the store, degrading to the local scorer.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<SectionStore>,
    registry: Arc<DocumentRegistry>,
    primary_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        store: Arc<SectionStore>,
        registry: Arc<DocumentRegistry>,
    ) -> Self {
        Self {
            store,
            registry,
            primary_timeout: DEFAULT_PRIMARY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = timeout;
        self
    }

    /// Run one query. Backend trouble is not surfaced: the fallback path
    /// answers instead and the response says so.
    pub async fn execute(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let (query_text, doc_hints) = resolve_request(request);

        match self
            .primary(&query_text, request.category.as_deref())
            .await
        {
            Ok(bundle) => Ok(QueryResponse {
                source: QuerySource::Primary,
                results: QueryResults::Bundle(bundle),
            }),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "primary retrieval unavailable, serving local fallback"
                );
                Ok(QueryResponse {
                    source: QuerySource::Fallback,
                    results: QueryResults::Scored(self.local_search(
                        &query_text,
                        request.top_k.max(1),
                        request.category.as_deref(),
                        &doc_hints,
                    )),
                })
            }
        }
    }

    /// The degraded-mode path, also reachable directly for offline use.
    pub fn local_search(
        &self,
        query_text: &str,
        top_k: usize,
        category: Option<&str>,
        doc_hints: &[String],
    ) -> Vec<ScoredSection> {
        // An empty or all-too-short query yields an empty result here,
        // where the primary path would still pin the critical set.
        if !has_searchable_keyword(query_text) {
            return Vec::new();
        }
        LocalScorer::new(&self.registry).search(
            query_text,
            top_k,
            category,
            doc_hints,
        )
    }

    async fn primary(
        &self,
        query_text: &str,
        category: Option<&str>,
    ) -> Result<ResultBundle> {
        // A zero timeout disables the primary stage outright (--local).
        if self.primary_timeout.is_zero() {
            return Err(Error::Backend("primary retrieval disabled".into()));
        }

        let store = Arc::clone(&self.store);
        let registry = Arc::clone(&self.registry);
        let keywords = split_keywords(query_text);
        let category = category.map(str::to_string);

        let task = tokio::task::spawn_blocking(move || {
            retrieval::retrieve(
                &store,
                &registry,
                &keywords,
                category.as_deref(),
            )
        });

        match tokio::time::timeout(self.primary_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                Err(Error::Backend(format!("retrieval task failed: {join_err}")))
            }
            // The handle is dropped here: a late primary result is
            // discarded, not merged after the fallback answers.
            Err(_) => Err(Error::Backend(format!(
                "primary retrieval timed out after {:?}",
                self.primary_timeout
            ))),
        }
    }
}

/// Resolve a request into query text plus document hints (tags expand
/// through the tag table; free text passes through with no hints).
fn resolve_request(request: &QueryRequest) -> (String, Vec<String>) {
    if let Some(tag) = &request.tag {
        let resolved = tags::resolve_tag(tag);
        (resolved.query, resolved.doc_hints)
    } else {
        (
            request.query.clone().unwrap_or_default(),
            Vec::new(),
        )
    }
}

/// Split a free-text query into keywords on whitespace and commas.
pub fn split_keywords(query: &str) -> Vec<String> {
    query
        .split([' ', '\t', '\n', ','])
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_searchable_keyword(query: &str) -> bool {
    split_keywords(query)
        .iter()
        .any(|k| k.chars().count() >= MIN_KEYWORD_CHARS)
}

/// Render a response for terminal output.
pub fn format_human(response: &QueryResponse, query_text: &str) {
    match &response.results {
        QueryResults::Bundle(bundle) => {
            if bundle.is_empty() {
                println!("No sections retrieved.");
                return;
            }
            println!("{}", bundle.render());
            println!(
                "\n{} section(s) in {} document(s)",
                bundle.section_count(),
                bundle.groups.len()
            );
        }
        QueryResults::Scored(scored) => {
            if scored.is_empty() {
                println!("No results for '{query_text}'.");
                return;
            }
            for (i, r) in scored.iter().enumerate() {
                println!(
                    "{:>3}. [{:.2}] {}:{} ({})",
                    i + 1,
                    r.score,
                    r.doc_name,
                    r.heading,
                    r.category
                );
            }
            println!(
                "\n{} result(s), served by local fallback",
                scored.len()
            );
        }
    }
}

/// Render a response as a JSON document.
pub fn to_json(response: &QueryResponse, query_text: &str) -> Result<String> {
    let value = serde_json::json!({
        "query": query_text,
        "source": response.source,
        "count": response.result_count(),
        "results": response.results,
    });
    Ok(serde_json::to_string(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::{DocEntry, PRIORITY_CRITICAL, PRIORITY_NORMAL},
        section::Section,
    };

    fn section(doc_key: &str, title: &str, body: &str, priority: u8) -> Section {
        Section {
            doc_key: doc_key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            keywords: vec![],
            priority,
        }
    }

    fn fixture() -> (tempfile::TempDir, QueryEngine) {
        let tmp = tempfile::tempdir().unwrap();
        let store =
            SectionStore::open(&tmp.path().join("index.redb")).unwrap();

        store.replace_document(
            "rules_core",
            &[section(
                "rules_core",
                "금지어",
                "사용 금지 단어 목록",
                PRIORITY_CRITICAL,
            )],
            1000,
        );

        let geo_path = tmp.path().join("지리_상세.md");
        std::fs::write(
            &geo_path,
            "# 화산파\n화산파는 섬서성 화산에 자리한 문파이다.",
        )
        .unwrap();
        store.replace_document(
            "geo",
            &[section(
                "geo",
                "화산파",
                "화산파는 섬서성 화산에 자리한 문파이다.",
                PRIORITY_NORMAL,
            )],
            1000,
        );

        let registry = DocumentRegistry::new(vec![
            DocEntry {
                key: "rules_core".to_string(),
                label: "집필 규칙 핵심".to_string(),
                path: tmp.path().join("rules.md"),
                default_priority: PRIORITY_CRITICAL,
                always_critical: true,
                always_on: true,
            },
            DocEntry {
                key: "geo".to_string(),
                label: "지리 상세".to_string(),
                path: geo_path,
                default_priority: PRIORITY_NORMAL,
                always_critical: false,
                always_on: false,
            },
        ]);

        let engine =
            QueryEngine::new(Arc::new(store), Arc::new(registry));
        (tmp, engine)
    }

    fn request(query: &str) -> QueryRequest {
        QueryRequest {
            query: Some(query.to_string()),
            tag: None,
            top_k: DEFAULT_TOP_K,
            category: None,
        }
    }

    #[tokio::test]
    async fn healthy_store_serves_primary() {
        let (_tmp, engine) = fixture();
        let response = engine.execute(&request("화산파")).await.unwrap();

        assert_eq!(response.source, QuerySource::Primary);
        let QueryResults::Bundle(bundle) = &response.results else {
            panic!("primary path must return a bundle");
        };
        let pairs = bundle.key_pairs();
        assert!(pairs.contains(&("geo".to_string(), "화산파".to_string())));
        assert!(pairs
            .contains(&("rules_core".to_string(), "금지어".to_string())));
    }

    #[tokio::test]
    async fn empty_query_still_returns_critical_set() {
        let (_tmp, engine) = fixture();
        let response = engine.execute(&request("")).await.unwrap();

        assert_eq!(response.source, QuerySource::Primary);
        assert_eq!(response.result_count(), 1);
    }

    #[tokio::test]
    async fn timeout_degrades_to_fallback() {
        let (_tmp, engine) = fixture();
        let engine = engine.with_timeout(Duration::ZERO);
        let response = engine.execute(&request("화산파")).await.unwrap();

        assert_eq!(response.source, QuerySource::Fallback);
        let QueryResults::Scored(scored) = &response.results else {
            panic!("fallback path must return scored sections");
        };
        assert!(!scored.is_empty());
        assert_eq!(scored[0].doc_key, "geo");
    }

    #[tokio::test]
    async fn fallback_empty_for_malformed_query() {
        let (_tmp, engine) = fixture();
        let engine = engine.with_timeout(Duration::ZERO);
        let response = engine.execute(&request("ㅁ")).await.unwrap();

        assert_eq!(response.source, QuerySource::Fallback);
        assert_eq!(response.result_count(), 0);
    }

    #[tokio::test]
    async fn tag_request_expands_before_search() {
        let (_tmp, engine) = fixture();
        let req = QueryRequest {
            query: None,
            tag: Some("@지리".to_string()),
            top_k: DEFAULT_TOP_K,
            category: None,
        };
        let response = engine.execute(&req).await.unwrap();
        // The expanded terms match nothing in the store, so the primary
        // path answers with the critical set alone.
        assert_eq!(response.source, QuerySource::Primary);
        assert_eq!(response.result_count(), 1);
    }

    #[test]
    fn split_keywords_handles_commas_and_blanks() {
        assert_eq!(
            split_keywords("화산파, 위치  개봉"),
            vec!["화산파", "위치", "개봉"]
        );
        assert!(split_keywords("  ,  ").is_empty());
    }

    #[test]
    fn json_rendering_includes_source() {
        let response = QueryResponse {
            source: QuerySource::Fallback,
            results: QueryResults::Scored(vec![]),
        };
        let json = to_json(&response, "화산파").unwrap();
        assert!(json.contains("\"source\":\"fallback\""));
        assert!(json.contains("\"count\":0"));
    }
}
