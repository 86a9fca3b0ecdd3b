//! lorebook - a priority-aware index and retrieval engine for world-building
//! reference documents.
//!
//! lorebook sectionizes long-form markdown references (story bibles,
//! character rosters, rules, lore encyclopedias) into addressable,
//! keyword-tagged, priority-ranked fragments, persists them in an embedded
//! [redb](https://github.com/cberner/redb) store, and serves a hybrid
//! query: the critical sections of pinned documents are always included,
//! the rest join by keyword match. When the store cannot answer in time,
//! the same query degrades to a scorer that re-reads the source files
//! directly, and the response says which path served it.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lorebook::{DataDir, QueryEngine, QueryRequest, SectionStore};
//!
//! fn main() -> lorebook::Result<()> {
//!     let data_dir = DataDir::resolve(None)?;
//!     let store = Arc::new(SectionStore::open(&data_dir.store_db())?);
//!     let registry = Arc::new(store.load_registry()?);
//!     let engine = QueryEngine::new(store, registry);
//!
//!     let request = QueryRequest {
//!         query: Some("화산파 위치".to_string()),
//!         tag: None,
//!         top_k: 5,
//!         category: None,
//!     };
//!
//!     let runtime = tokio::runtime::Runtime::new()?;
//!     let response = runtime.block_on(engine.execute(&request))?;
//!     println!("served by {:?}: {} result(s)", response.source, response.result_count());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod data_dir;
pub mod error;
pub mod fallback;
pub mod indexer;
pub mod keywords;
pub mod priority;
pub mod query;
pub mod registry;
pub mod retrieval;
pub mod section;
pub mod store;
pub mod tags;

pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use fallback::LocalScorer;
pub use query::{QueryEngine, QueryRequest, QueryResponse, QuerySource};
pub use registry::{DocEntry, DocumentRegistry};
pub use retrieval::ResultBundle;
pub use section::Section;
pub use store::SectionStore;
