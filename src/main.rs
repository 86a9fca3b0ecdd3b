use std::{path::Path, sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lorebook::{
    cli::{Cli, Command, DocAction, SearchArgs, SyncArgs},
    data_dir::DataDir,
    error::{self, Error},
    indexer, query,
    query::{QueryEngine, QueryRequest},
    registry::DocEntry,
    store::SectionStore,
    tags,
};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("LOREBOOK_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = SectionStore::open(&data_dir.store_db())?;

    match cli.command {
        Command::Doc { action } => match action {
            DocAction::Add {
                key,
                path,
                label,
                priority,
                critical,
                always_on,
            } => {
                doc_add(&store, &key, &path, label, priority, critical, always_on)?;
            }
            DocAction::Remove { key } => {
                doc_remove(&store, &key)?;
            }
            DocAction::List { json } => {
                doc_list(&store, json)?;
            }
        },
        Command::Sync(args) => {
            cmd_sync(&store, &args)?;
        }
        Command::Search(args) => {
            cmd_search(store, &args)?;
        }
        Command::Status(args) => {
            cmd_status(&store, &data_dir, args.json)?;
        }
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn doc_add(
    store: &SectionStore,
    key: &str,
    path: &Path,
    label: Option<String>,
    priority: u8,
    critical: bool,
    always_on: bool,
) -> error::Result<()> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "source file does not exist: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(Error::Config(format!(
            "source path is not a file: {}",
            path.display()
        )));
    }

    let abs_path = path.canonicalize().map_err(|e| {
        Error::Config(format!("cannot resolve path {}: {e}", path.display()))
    })?;

    if store.get_doc_entry(key)?.is_some() {
        return Err(Error::Config(format!("document '{key}' already exists")));
    }

    let entry = DocEntry {
        key: key.to_string(),
        label: label.unwrap_or_else(|| {
            abs_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| key.to_string())
        }),
        path: abs_path.clone(),
        default_priority: priority,
        always_critical: critical,
        always_on,
    };
    store.put_doc_entry(&entry)?;

    println!("Added document '{key}' -> {}", abs_path.display());
    Ok(())
}

fn doc_remove(store: &SectionStore, key: &str) -> error::Result<()> {
    if !store.remove_doc_entry(key)? {
        return Err(Error::NotFound {
            kind: "document",
            name: key.to_string(),
        });
    }
    println!("Removed document '{key}' and its indexed sections");
    Ok(())
}

fn doc_list(store: &SectionStore, json: bool) -> error::Result<()> {
    let registry = store.load_registry()?;

    if json {
        let entries: Vec<serde_json::Value> = registry
            .entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "key": e.key,
                    "label": e.label,
                    "path": e.path.display().to_string(),
                    "category": tags::guess_category(&e.doc_name()),
                    "default_priority": e.default_priority,
                    "always_critical": e.always_critical,
                    "always_on": e.always_on,
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&entries)?);
    } else if registry.is_empty() {
        println!("No documents registered.");
    } else {
        for e in registry.entries() {
            let mut flags = format!("p{}", e.default_priority);
            if e.always_critical {
                flags.push_str(" critical");
            }
            if e.always_on {
                flags.push_str(" pinned");
            }
            println!(
                "{}\t{}\t[{}]\t({})\t{}",
                e.key,
                e.label,
                flags,
                tags::guess_category(&e.doc_name()),
                e.path.display()
            );
        }
    }
    Ok(())
}

fn cmd_sync(store: &SectionStore, args: &SyncArgs) -> error::Result<()> {
    let registry = store.load_registry()?;
    if registry.is_empty() {
        eprintln!("No documents registered; nothing to sync.");
        return Ok(());
    }

    let keys = (!args.docs.is_empty()).then_some(args.docs.as_slice());
    let report = indexer::sync_documents(&registry, store, keys);

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        match &outcome.error {
            Some(error) => {
                println!("  {}: FAILED ({error})", outcome.doc_key)
            }
            None => println!(
                "  {}: {} section(s)",
                outcome.doc_key, outcome.sections
            ),
        }
    }
    println!(
        "Synced {} section(s) across {} document(s), {} failed",
        report.total_sections,
        report.succeeded(),
        report.failed()
    );
    Ok(())
}

fn cmd_search(store: SectionStore, args: &SearchArgs) -> error::Result<()> {
    let query_text = args
        .query
        .clone()
        .or_else(|| args.tag.clone())
        .ok_or_else(|| {
            Error::Config("provide a query or --tag".to_string())
        })?;

    let registry = store.load_registry()?;
    let mut engine =
        QueryEngine::new(Arc::new(store), Arc::new(registry))
            .with_timeout(Duration::from_secs(args.timeout));
    if args.local {
        engine = engine.with_timeout(Duration::ZERO);
    }

    let request = QueryRequest {
        query: args.query.clone(),
        tag: args.tag.clone(),
        top_k: args.count,
        category: args.category.clone(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let response = runtime.block_on(engine.execute(&request))?;

    if args.json {
        println!("{}", query::to_json(&response, &query_text)?);
    } else {
        query::format_human(&response, &query_text);
    }
    Ok(())
}

fn cmd_status(
    store: &SectionStore,
    data_dir: &DataDir,
    json: bool,
) -> error::Result<()> {
    let registry = store.load_registry()?;
    let summary = store.list_summary()?;

    if json {
        let value = serde_json::json!({
            "data_dir": data_dir.root().display().to_string(),
            "documents_registered": registry.len(),
            "total_sections": summary.total_sections,
            "by_document": summary.by_document,
            "sections": summary.sections,
        });
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    println!("Data directory: {}", data_dir.root().display());
    println!("Documents registered: {}", registry.len());
    println!("Total sections: {}", summary.total_sections);
    for (doc_key, count) in &summary.by_document {
        println!("  {doc_key}: {count}");
    }
    for info in &summary.sections {
        println!("  [p{}] {} :: {}", info.priority, info.doc_key, info.title);
    }
    Ok(())
}
