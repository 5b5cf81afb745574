//! Knowledge commands - add, ingest, search, list, get, delete, stats
//!
//! Each command opens its own store. With the local backend that store lives
//! only for the command, so one-shot `add` followed by `search` finds
//! nothing; use `kbase shell` for a session, or configure Pinecone.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use kbase::store::{BackendKind, KnowledgeEntry, Metadata, SearchOptions, SearchResult};
use kbase::VectorStore;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::open_store;

pub fn add(config: Option<&Path>, text: &str, meta: &[String]) -> Result<()> {
    let metadata = parse_metadata(meta)?;
    let store = open_store(config)?;
    let id = store.add_knowledge(text, Some(metadata))?;

    println!("✓ Added {}", id);
    warn_if_volatile(&store);
    store.close();
    Ok(())
}

pub fn ingest(config: Option<&Path>, files: &[PathBuf]) -> Result<()> {
    let store = open_store(config)?;

    let mut added = 0;
    for path in files {
        match ingest_file(&store, path) {
            Ok(id) => {
                println!("✓ {} → {}", path.display(), id);
                added += 1;
            }
            Err(e) => println!("{} {}: {:#}", "✗".red(), path.display(), e),
        }
    }

    println!("\nIngested {}/{} files", added, files.len());
    warn_if_volatile(&store);
    store.close();

    if added < files.len() {
        anyhow::bail!("{} file(s) could not be ingested", files.len() - added);
    }
    Ok(())
}

/// Store one UTF-8 file as a single record with file metadata
pub fn ingest_file(store: &VectorStore, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let size = bytes.len();
    let text = String::from_utf8(bytes)
        .map_err(|_| anyhow::anyhow!("not valid UTF-8 text; only text files can be ingested"))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut metadata = Metadata::new();
    metadata.insert("filename".into(), Value::String(filename));
    metadata.insert(
        "content_type".into(),
        Value::String(content_type(path).to_string()),
    );
    metadata.insert("size".into(), Value::from(size));

    Ok(store.add_knowledge(&text, Some(metadata))?)
}

pub fn search(
    config: Option<&Path>,
    query: &str,
    top_k: Option<usize>,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let mut options = store.defaults();
    if let Some(k) = top_k {
        options = options.top_k(k);
    }
    if let Some(t) = threshold {
        options = options.threshold(t);
    }

    let results = store.search_with(query, options)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results, options);
    }
    store.close();
    Ok(())
}

pub fn list(config: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let entries = store.list_knowledge()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        if store.backend_kind() == BackendKind::Pinecone {
            println!("Listing is not supported by the Pinecone backend.");
        } else {
            println!("No knowledge stored.");
        }
    } else {
        for entry in &entries {
            print_entry(entry);
        }
    }
    store.close();
    Ok(())
}

pub fn get(config: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let entry = store.get(id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        print_entry(&entry);
        println!("{}", entry.text);
    }
    store.close();
    Ok(())
}

pub fn delete(config: Option<&Path>, id: &str) -> Result<()> {
    let store = open_store(config)?;
    if store.delete_knowledge(id)? {
        println!("✓ Deleted {}", id);
    } else {
        println!("No entry with id {}", id);
    }
    store.close();
    Ok(())
}

pub fn stats(config: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", "📊 Knowledge Store".bold());
        println!("  Backend:   {}", stats.backend);
        println!("  Entries:   {}", stats.count);
        println!("  Dimension: {}", stats.dimension);
        println!("  Model:     {}", stats.model);
    }
    store.close();
    Ok(())
}

/// Parse `key=value` pairs. Values that parse as JSON keep their type.
pub fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid metadata '{}': expected key=value", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Invalid metadata '{}': empty key", pair);
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}

/// MIME type from the file extension; unknown types are plain text
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("md") | Some("markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("toml") => "application/toml",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("xml") => "application/xml",
        Some("rs") => "text/x-rust",
        Some("py") => "text/x-python",
        _ => "text/plain",
    }
}

pub fn print_results(results: &[SearchResult], options: SearchOptions) {
    if results.is_empty() {
        println!(
            "No results (top_k={}, threshold={:.2})",
            options.top_k, options.threshold
        );
        return;
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            i + 1,
            format!("{:.3}", result.score).green(),
            result.id.dimmed()
        );
        println!("   {}", preview(&result.text, 200));
        if !result.metadata.is_empty() {
            println!("   {}", Value::Object(result.metadata.clone()).to_string().dimmed());
        }
    }
}

pub fn print_entry(entry: &KnowledgeEntry) {
    println!(
        "{}  {}  {}",
        entry.id.dimmed(),
        created_label(entry.created_at),
        preview(&entry.text, 80)
    );
}

fn created_label(created_at: Option<DateTime<Utc>>) -> String {
    created_at.map_or_else(|| "-".repeat(19), |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}

fn warn_if_volatile(store: &VectorStore) {
    if store.backend_kind() == BackendKind::Memory {
        println!(
            "{}",
            "Note: local backend is in-memory; entries are gone when this command exits. Use `kbase shell` or configure Pinecone."
                .yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbase::EmbeddingProvider;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_metadata_types() {
        let metadata = parse_metadata(&[
            "source=manual".to_string(),
            "page=3".to_string(),
            "draft=true".to_string(),
            "note=a=b".to_string(),
        ])
        .unwrap();
        assert_eq!(metadata["source"], json!("manual"));
        assert_eq!(metadata["page"], json!(3));
        assert_eq!(metadata["draft"], json!(true));
        assert_eq!(metadata["note"], json!("a=b"));
    }

    #[test]
    fn test_parse_metadata_rejects_malformed() {
        assert!(parse_metadata(&["novalue".to_string()]).is_err());
        assert!(parse_metadata(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("notes.MD")), "text/markdown");
        assert_eq!(content_type(Path::new("data.json")), "application/json");
        assert_eq!(content_type(Path::new("README")), "text/plain");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("a  b\nc", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
    }

    #[test]
    fn test_ingest_file_metadata() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guide.md");
        std::fs::write(&path, "# Guide\nhow to ingest").unwrap();

        let store = VectorStore::in_memory(Arc::new(EmbeddingProvider::hashing(64)));
        let id = ingest_file(&store, &path).unwrap();

        let entry = store.get(&id).unwrap();
        assert_eq!(entry.text, "# Guide\nhow to ingest");
        assert_eq!(entry.metadata["filename"], json!("guide.md"));
        assert_eq!(entry.metadata["content_type"], json!("text/markdown"));
        assert_eq!(entry.metadata["size"], json!(21));
    }

    #[test]
    fn test_ingest_rejects_binary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blob.bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let store = VectorStore::in_memory(Arc::new(EmbeddingProvider::hashing(64)));
        let err = ingest_file(&store, &path).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
        assert_eq!(store.stats().unwrap().count, 0);
    }

    #[test]
    fn test_created_label_without_timestamp() {
        assert_eq!(created_label(None), "-------------------");
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:30:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(created_label(Some(ts)), "2024-03-01 12:30:00");
    }
}
