//! In-memory corpus with atomic snapshot replacement.
//!
//! Readers take an `Arc<CorpusSnapshot>` once per request and keep it for the
//! whole request, so a concurrent [`CorpusStore::reload`] can never be
//! observed halfway.

use crate::types::{CorpusStats, Document, TimelineEntry};
use chrono::{DateTime, Utc};
use curator_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// One immutable generation of the corpus.
#[derive(Debug)]
pub struct CorpusSnapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    /// Ascending by event date, undated last
    documents: Vec<Arc<Document>>,
    by_id: HashMap<i64, usize>,
}

impl CorpusSnapshot {
    pub fn new(mut documents: Vec<Document>, generation: u64) -> Self {
        // Stable: equal dates keep source order
        documents.sort_by(|a, b| match (a.event_date, b.event_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let mut by_id = HashMap::with_capacity(documents.len());
        let mut kept = Vec::with_capacity(documents.len());
        for doc in documents {
            if by_id.contains_key(&doc.id) {
                tracing::warn!("Duplicate document id {} ignored", doc.id);
                continue;
            }
            by_id.insert(doc.id, kept.len());
            kept.push(Arc::new(doc));
        }

        Self {
            generation,
            loaded_at: Utc::now(),
            documents: kept,
            by_id,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    /// Documents eligible for vector retrieval.
    pub fn vectorized(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.iter().filter(|d| d.has_vector())
    }

    pub fn get(&self, id: i64) -> Option<Arc<Document>> {
        self.by_id.get(&id).map(|&idx| Arc::clone(&self.documents[idx]))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            documents: self.documents.len(),
            vectorized: self.vectorized().count(),
            generation: self.generation,
            loaded_at: self.loaded_at,
        }
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.documents
            .iter()
            .map(|d| TimelineEntry {
                title: d.title.clone(),
                date: d.event_date,
                image_url: d.image_url.clone(),
            })
            .collect()
    }
}

/// Where documents come from on load and reload.
#[async_trait::async_trait]
pub trait CorpusSource: Send + Sync {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    async fn load(&self) -> AppResult<Vec<Document>>;
}

/// Reads a JSON array or a JSON-lines file of documents.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl CorpusSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> AppResult<Vec<Document>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Corpus(format!("Failed to read corpus {:?}: {}", self.path, e))
        })?;
        parse_documents(&contents)
            .map_err(|e| AppError::Corpus(format!("{:?}: {}", self.path, e)))
    }
}

/// Parse a JSON array, or one JSON document per non-blank line.
pub fn parse_documents(contents: &str) -> AppResult<Vec<Document>> {
    let trimmed = contents.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| AppError::Corpus(format!("Invalid JSON array: {}", e)));
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line)
                .map_err(|e| AppError::Corpus(format!("Invalid document on line {}: {}", idx + 1, e)))
        })
        .collect()
}

/// Fixed document set; useful for embedding the core and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<Document>,
}

impl InMemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait::async_trait]
impl CorpusSource for InMemorySource {
    fn describe(&self) -> String {
        format!("memory ({} documents)", self.documents.len())
    }

    async fn load(&self) -> AppResult<Vec<Document>> {
        Ok(self.documents.clone())
    }
}

/// Shared, read-mostly holder of the current snapshot.
#[derive(Debug)]
pub struct CorpusStore {
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl CorpusStore {
    /// Empty store at generation 0.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CorpusSnapshot::new(Vec::new(), 0))),
        }
    }

    /// Store holding `documents` as generation 1.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let store = Self::new();
        store.replace(documents);
        store
    }

    /// Current snapshot. Hold on to it for the duration of a request.
    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new document set as one unit.
    ///
    /// The generation is numbered under the write lock, so the installed
    /// generation only ever grows and the last swap to land is the current one.
    pub fn replace(&self, documents: Vec<Document>) -> CorpusStats {
        // Built outside the lock; readers only ever see a finished snapshot
        let mut snapshot = CorpusSnapshot::new(documents, 0);

        let stats = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            snapshot.generation = guard.generation + 1;
            let stats = snapshot.stats();
            *guard = Arc::new(snapshot);
            stats
        };

        tracing::info!(
            "Corpus generation {}: {} documents ({} with vectors)",
            stats.generation,
            stats.documents,
            stats.vectorized
        );
        stats
    }

    /// Load from `source` and swap atomically. On failure the old snapshot stays.
    pub async fn reload(&self, source: &dyn CorpusSource) -> AppResult<CorpusStats> {
        tracing::info!("Loading corpus from {}", source.describe());
        let documents = source.load().await?;
        Ok(self.replace(documents))
    }

    /// All documents, ascending by event date.
    pub fn get_all(&self) -> Vec<Arc<Document>> {
        self.snapshot().documents().to_vec()
    }

    pub fn get_by_id(&self, id: i64) -> Option<Arc<Document>> {
        self.snapshot().get(id)
    }

    pub fn stats(&self) -> CorpusStats {
        self.snapshot().stats()
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.snapshot().timeline()
    }
}

impl Default for CorpusStore {
    fn default() -> Self {
        Self::new()
    }
}
