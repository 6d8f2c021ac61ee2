//! In-memory vector index with SQLite persistence.
//!
//! Entries live in memory behind a read/write lock, so any number of
//! queries can run alongside each other while inserts and persistence take
//! the lock exclusively. Queries score every entry by cosine similarity;
//! ties go to the entry inserted first.
//!
//! Persistence writes a fresh SQLite file next to the target and renames it
//! into place, so a crash mid-write never leaves a half-written index.

use crate::types::{Chunk, IndexEntry, IndexStats, RetrievalResult, ScoredChunk};
use chrono::{DateTime, Utc};
use policyqa_core::{AppError, AppResult, Stage};
use rusqlite::{params, Connection, OpenFlags};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// On-disk format version written to `index_meta`.
pub const FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE index_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE entries (
        id TEXT PRIMARY KEY,
        seq INTEGER NOT NULL,
        document TEXT NOT NULL,
        path TEXT,
        page INTEGER NOT NULL,
        chunk_index INTEGER NOT NULL,
        token_offset INTEGER NOT NULL,
        token_count INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX idx_entries_document ON entries(document);
"#;

#[derive(Debug, Clone)]
struct StoredEntry {
    seq: u64,
    entry: IndexEntry,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<StoredEntry>,
    positions: HashMap<String, usize>,
    next_seq: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl IndexState {
    fn upsert(&mut self, entry: IndexEntry) {
        match self.positions.get(entry.id()) {
            // Replacing keeps the original insertion position for tie-breaks
            Some(&pos) => self.entries[pos].entry = entry,
            None => {
                self.positions
                    .insert(entry.id().to_string(), self.entries.len());
                self.entries.push(StoredEntry {
                    seq: self.next_seq,
                    entry,
                });
                self.next_seq += 1;
            }
        }
    }
}

/// Vector index over embedded chunks.
#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    model: String,
    path: Option<PathBuf>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index that is never written to disk.
    pub fn in_memory(dimension: usize, model: impl Into<String>) -> Self {
        Self {
            dimension,
            model: model.into(),
            path: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Open the index at `path`, or start an empty one there if none exists.
    ///
    /// An existing index built with a different model or dimension is a
    /// configuration error; re-ingest with a rebuild to replace it.
    pub fn open(path: &Path, dimension: usize, model: &str) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No index at {:?}, starting empty", path);
            return Ok(Self::create(path, dimension, model));
        }

        let index = Self::load(path)?;
        if index.dimension != dimension || index.model != model {
            return Err(AppError::Config(format!(
                "Index at {:?} was built with model '{}' ({} dims) but '{}' ({} dims) is configured. \
                 Re-run ingestion with --rebuild to re-embed.",
                path, index.model, index.dimension, model, dimension
            )));
        }
        Ok(index)
    }

    /// Start an empty index bound to `path` without reading what is there.
    ///
    /// The file on disk stays as it is until [`persist`](Self::persist)
    /// replaces it, so an abandoned rebuild leaves the old index intact.
    pub fn create(path: &Path, dimension: usize, model: &str) -> Self {
        let mut index = Self::in_memory(dimension, model);
        index.path = Some(path.to_path_buf());
        index
    }

    /// Load a persisted index, validating every entry.
    ///
    /// Any structural problem is reported as [`AppError::IndexCorruption`].
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::NotFound(format!("Index not found: {}", path.display())));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| corruption(path, e))?;

        let meta = read_meta(&conn).map_err(|e| corruption(path, e))?;
        let meta_value = |key: &str| {
            meta.get(key).ok_or_else(|| {
                AppError::IndexCorruption(format!("{}: missing metadata '{}'", path.display(), key))
            })
        };

        let version: u32 = meta_value("format_version")?
            .parse()
            .map_err(|_| AppError::IndexCorruption(format!("{}: bad format version", path.display())))?;
        if version != FORMAT_VERSION {
            return Err(AppError::IndexCorruption(format!(
                "{}: unsupported format version {} (expected {})",
                path.display(),
                version,
                FORMAT_VERSION
            )));
        }

        let dimension: usize = meta_value("dimension")?
            .parse()
            .map_err(|_| AppError::IndexCorruption(format!("{}: bad dimension", path.display())))?;
        if dimension == 0 {
            return Err(AppError::IndexCorruption(format!("{}: zero dimension", path.display())));
        }
        let model = meta_value("embedding_model")?.clone();
        let updated_at = meta
            .get("updated_at")
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|d| d.with_timezone(&Utc));

        let rows = read_entries(&conn).map_err(|e| corruption(path, e))?;

        let mut state = IndexState {
            updated_at,
            ..Default::default()
        };
        for (seq, blob, chunk) in rows {
            let vector = bytes_to_embedding(&blob).ok_or_else(|| {
                AppError::IndexCorruption(format!("{}: entry '{}' has a malformed vector", path.display(), chunk.id))
            })?;
            if vector.len() != dimension {
                return Err(AppError::IndexCorruption(format!(
                    "{}: entry '{}' has {} dimensions, expected {}",
                    path.display(),
                    chunk.id,
                    vector.len(),
                    dimension
                )));
            }
            if chunk.page == 0 || chunk.document.is_empty() {
                return Err(AppError::IndexCorruption(format!(
                    "{}: entry '{}' has no source attribution",
                    path.display(),
                    chunk.id
                )));
            }
            state
                .positions
                .insert(chunk.id.clone(), state.entries.len());
            state.entries.push(StoredEntry {
                seq,
                entry: IndexEntry::new(chunk, vector),
            });
            state.next_seq = seq + 1;
        }

        tracing::debug!(
            "Loaded {} entries ({} dims, model '{}') from {:?}",
            state.entries.len(),
            dimension,
            model,
            path
        );

        Ok(Self {
            dimension,
            model,
            path: Some(path.to_path_buf()),
            state: RwLock::new(state),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embedding model the stored vectors came from.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, IndexState>> {
        self.state
            .read()
            .map_err(|_| AppError::Other("index lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, IndexState>> {
        self.state
            .write()
            .map_err(|_| AppError::Other("index lock poisoned".to_string()))
    }

    /// Insert entries, replacing any with the same id.
    ///
    /// The batch is validated up front, so a bad entry leaves the index
    /// untouched.
    pub fn insert(&self, entries: Vec<IndexEntry>) -> AppResult<()> {
        for entry in &entries {
            if entry.vector.len() != self.dimension {
                return Err(AppError::invalid_input(
                    Stage::Ingestion,
                    format!(
                        "Entry '{}' has {} dimensions, index expects {}",
                        entry.id(),
                        entry.vector.len(),
                        self.dimension
                    ),
                ));
            }
            if entry.chunk.document.is_empty() || entry.chunk.page == 0 {
                return Err(AppError::invalid_input(
                    Stage::Ingestion,
                    format!("Entry '{}' is missing its document or page", entry.id()),
                ));
            }
        }

        let count = entries.len();
        let mut state = self.write()?;
        for entry in entries {
            state.upsert(entry);
        }

        tracing::debug!("Inserted {} entries ({} total)", count, state.entries.len());
        Ok(())
    }

    /// Return the `k` entries most similar to `vector`, best first.
    ///
    /// `k == 0` or an empty index yields an empty result. A vector of the
    /// wrong dimension is rejected.
    pub fn query(&self, vector: &[f32], k: usize) -> AppResult<RetrievalResult> {
        if vector.len() != self.dimension {
            return Err(AppError::invalid_input(
                Stage::Retrieval,
                format!(
                    "Query vector has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimension
                ),
            ));
        }
        if k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let state = self.read()?;
        let mut scored: Vec<(f32, u64, &IndexEntry)> = state
            .entries
            .iter()
            .map(|stored| {
                (
                    cosine_similarity(vector, &stored.entry.vector),
                    stored.seq,
                    &stored.entry,
                )
            })
            .collect();

        scored.sort_by(|a, b| match b.0.total_cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });
        scored.truncate(k);

        let hits = scored
            .into_iter()
            .map(|(score, _, entry)| ScoredChunk {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect::<Vec<_>>();

        tracing::debug!("Retrieved {} entries (requested top-{})", hits.len(), k);
        Ok(RetrievalResult::new(hits))
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> AppResult<Option<IndexEntry>> {
        let state = self.read()?;
        Ok(state
            .positions
            .get(id)
            .map(|&pos| state.entries[pos].entry.clone()))
    }

    pub fn len(&self) -> AppResult<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.read()?.entries.is_empty())
    }

    /// Number of distinct source documents.
    pub fn document_count(&self) -> AppResult<usize> {
        let state = self.read()?;
        let documents: HashSet<&str> = state
            .entries
            .iter()
            .map(|s| s.entry.chunk.document.as_str())
            .collect();
        Ok(documents.len())
    }

    /// Remove every entry.
    pub fn clear(&self) -> AppResult<()> {
        let mut state = self.write()?;
        *state = IndexState::default();
        tracing::info!("Cleared vector index");
        Ok(())
    }

    /// Write the index to the path it was opened from.
    pub fn persist(&self) -> AppResult<()> {
        let path = self.path.as_deref().ok_or_else(|| {
            AppError::Config("In-memory index has no path to persist to".to_string())
        })?;
        self.persist_to(path)
    }

    /// Write the index to `path`.
    ///
    /// Holds the write lock for the duration, so no insert can interleave
    /// with the snapshot.
    pub fn persist_to(&self, path: &Path) -> AppResult<()> {
        let mut state = self.write()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("sqlite.tmp");
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }

        let updated_at = Utc::now();
        write_database(&tmp_path, self, &state, updated_at).map_err(|e| {
            AppError::Other(format!("Failed to write index to {:?}: {}", tmp_path, e))
        })?;
        fs::rename(&tmp_path, path)?;

        state.updated_at = Some(updated_at);
        tracing::info!("Persisted {} entries to {:?}", state.entries.len(), path);
        Ok(())
    }

    /// Index statistics for a collection.
    pub fn stats(&self, collection: &str) -> AppResult<IndexStats> {
        let db_size_bytes = self
            .path
            .as_deref()
            .and_then(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);
        let documents = self.document_count()?;
        let state = self.read()?;

        Ok(IndexStats {
            collection: collection.to_string(),
            entries: state.entries.len() as u32,
            documents: documents as u32,
            dimension: self.dimension,
            embedding_model: self.model.clone(),
            db_size_bytes,
            updated_at: state.updated_at,
        })
    }
}

fn corruption(path: &Path, err: rusqlite::Error) -> AppError {
    AppError::IndexCorruption(format!("{}: {}", path.display(), err))
}

fn read_meta(conn: &Connection) -> rusqlite::Result<HashMap<String, String>> {
    let mut stmt = conn.prepare("SELECT key, value FROM index_meta")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    rows.collect()
}

fn read_entries(conn: &Connection) -> rusqlite::Result<Vec<(u64, Vec<u8>, Chunk)>> {
    let mut stmt = conn.prepare(
        "SELECT seq, embedding, id, document, path, page, chunk_index, token_offset, token_count, text
         FROM entries ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)? as u64,
            row.get::<_, Vec<u8>>(1)?,
            Chunk {
                id: row.get(2)?,
                document: row.get(3)?,
                path: row.get(4)?,
                page: row.get::<_, i64>(5)? as u32,
                chunk_index: row.get::<_, i64>(6)? as u32,
                token_offset: row.get::<_, i64>(7)? as u32,
                token_count: row.get::<_, i64>(8)? as u32,
                text: row.get(9)?,
            },
        ))
    })?;
    rows.collect()
}

fn write_database(
    path: &Path,
    index: &VectorIndex,
    state: &IndexState,
    updated_at: DateTime<Utc>,
) -> rusqlite::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    {
        let mut meta = tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
        meta.execute(params!["format_version", FORMAT_VERSION.to_string()])?;
        meta.execute(params!["dimension", index.dimension.to_string()])?;
        meta.execute(params!["embedding_model", index.model])?;
        meta.execute(params!["updated_at", updated_at.to_rfc3339()])?;

        let mut insert = tx.prepare(
            "INSERT INTO entries (id, seq, document, path, page, chunk_index, token_offset, token_count, text, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for stored in &state.entries {
            let chunk = &stored.entry.chunk;
            insert.execute(params![
                chunk.id,
                stored.seq as i64,
                chunk.document,
                chunk.path,
                chunk.page as i64,
                chunk.chunk_index as i64,
                chunk.token_offset as i64,
                chunk.token_count as i64,
                chunk.text,
                embedding_to_bytes(&stored.entry.vector),
            ])?;
        }
    }
    tx.commit()
}

/// Cosine similarity of two equal-length vectors; 0.0 if either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Encode a vector as little-endian f32 bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian f32 bytes; `None` if the length isn't a multiple of 4.
fn bytes_to_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(id: &str, document: &str, page: u32, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            Chunk {
                id: id.to_string(),
                text: format!("text of {}", id),
                document: document.to_string(),
                path: None,
                page,
                chunk_index: 0,
                token_offset: 0,
                token_count: 3,
            },
            vector,
        )
    }

    fn sample_entries() -> Vec<IndexEntry> {
        vec![
            entry("a:p1:c0", "a.pdf", 1, vec![1.0, 0.0, 0.0]),
            entry("b:p1:c0", "b.pdf", 1, vec![0.0, 1.0, 0.0]),
            entry("c:p2:c0", "c.pdf", 2, vec![0.7, 0.7, 0.0]),
        ]
    }

    fn sample_index() -> VectorIndex {
        let index = VectorIndex::in_memory(3, "test-model");
        index.insert(sample_entries()).unwrap();
        index
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let index = sample_index();
        let result = index.query(&[1.0, 0.1, 0.0], 3).unwrap();

        let ids: Vec<_> = result.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a:p1:c0", "c:p2:c0", "b:p1:c0"]);
        assert!(result.hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_k_larger_than_index_returns_all() {
        let index = sample_index();
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 10).unwrap().len(), 3);
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 0).unwrap().len(), 0);
    }

    #[test]
    fn test_empty_index_returns_empty() {
        let index = VectorIndex::in_memory(3, "test-model");
        assert!(index.query(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index();
        let err = index.query(&[1.0, 0.0], 3).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidInput {
                stage: Stage::Retrieval,
                ..
            }
        ));
    }

    #[test]
    fn test_insert_rejects_wrong_dimension_atomically() {
        let index = VectorIndex::in_memory(3, "test-model");
        let err = index
            .insert(vec![
                entry("ok", "a.pdf", 1, vec![1.0, 0.0, 0.0]),
                entry("bad", "a.pdf", 1, vec![1.0]),
            ])
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(index.len().unwrap(), 0);
    }

    #[test]
    fn test_ties_broken_by_insertion_order() {
        let index = VectorIndex::in_memory(2, "test-model");
        index
            .insert(vec![
                entry("first", "a.pdf", 1, vec![1.0, 0.0]),
                entry("second", "a.pdf", 2, vec![2.0, 0.0]),
                entry("third", "a.pdf", 3, vec![3.0, 0.0]),
            ])
            .unwrap();

        let ids: Vec<_> = index
            .query(&[1.0, 0.0], 3)
            .unwrap()
            .hits
            .into_iter()
            .map(|h| h.chunk.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_reinsert_replaces_without_duplicating() {
        let index = sample_index();
        index
            .insert(vec![entry("a:p1:c0", "a.pdf", 1, vec![0.0, 0.0, 1.0])])
            .unwrap();

        assert_eq!(index.len().unwrap(), 3);
        let top = index.query(&[0.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(top.hits[0].chunk.id, "a:p1:c0");
        assert_eq!(index.get("a:p1:c0").unwrap().unwrap().vector, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("index.sqlite");
        let index = VectorIndex::open(&path, 3, "test-model").unwrap();
        index.insert(sample_entries()).unwrap();
        index.persist().unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len().unwrap(), 3);
        assert_eq!(loaded.dimension(), 3);
        assert_eq!(loaded.model(), "test-model");

        let query = [0.9, 0.2, 0.1];
        assert_eq!(index.query(&query, 3).unwrap(), loaded.query(&query, 3).unwrap());
        assert!(loaded.stats("hr").unwrap().updated_at.is_some());
    }

    #[test]
    fn test_load_preserves_tie_break_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let index = VectorIndex::open(&path, 2, "m").unwrap();
        index
            .insert(vec![
                entry("z", "a.pdf", 1, vec![1.0, 0.0]),
                entry("a", "a.pdf", 2, vec![1.0, 0.0]),
            ])
            .unwrap();
        index.persist().unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        let ids: Vec<_> = loaded
            .query(&[1.0, 0.0], 2)
            .unwrap()
            .hits
            .into_iter()
            .map(|h| h.chunk.id)
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn test_open_rejects_model_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let index = VectorIndex::open(&path, 3, "model-a").unwrap();
        index.insert(vec![entry("x", "a.pdf", 1, vec![1.0, 0.0, 0.0])]).unwrap();
        index.persist().unwrap();

        let err = VectorIndex::open(&path, 3, "model-b").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(VectorIndex::open(&path, 3, "model-a").is_ok());
    }

    #[test]
    fn test_create_leaves_existing_file_until_persist() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let old = VectorIndex::open(&path, 3, "model-a").unwrap();
        old.insert(sample_entries()).unwrap();
        old.persist().unwrap();

        let fresh = VectorIndex::create(&path, 2, "model-b");
        assert!(fresh.is_empty().unwrap());
        assert_eq!(VectorIndex::load(&path).unwrap().len().unwrap(), 3);

        fresh.insert(vec![entry("x", "a.pdf", 1, vec![1.0, 0.0])]).unwrap();
        fresh.persist().unwrap();
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len().unwrap(), 1);
        assert_eq!(loaded.model(), "model-b");
    }

    #[test]
    fn test_garbage_file_is_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        fs::write(&path, b"this is not a database at all, not even close").unwrap();

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, AppError::IndexCorruption(_)));
    }

    #[test]
    fn test_truncated_vector_is_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let index = VectorIndex::open(&path, 3, "m").unwrap();
        index.insert(vec![entry("x", "a.pdf", 1, vec![1.0, 0.0, 0.0])]).unwrap();
        index.persist().unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("UPDATE entries SET embedding = ?1", params![vec![0u8; 8]])
            .unwrap();
        drop(conn);

        let err = VectorIndex::load(&path).unwrap_err();
        assert!(matches!(err, AppError::IndexCorruption(_)));
    }

    #[test]
    fn test_missing_metadata_is_corruption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let index = VectorIndex::open(&path, 3, "m").unwrap();
        index.persist().unwrap();

        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM index_meta WHERE key = 'dimension'", [])
            .unwrap();
        drop(conn);

        assert!(matches!(
            VectorIndex::load(&path),
            Err(AppError::IndexCorruption(_))
        ));
    }

    #[test]
    fn test_in_memory_persist_is_config_error() {
        let index = VectorIndex::in_memory(3, "m");
        assert!(matches!(index.persist(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_concurrent_inserts_and_queries() {
        let index = Arc::new(VectorIndex::in_memory(2, "m"));

        std::thread::scope(|scope| {
            for t in 0..4 {
                let index = Arc::clone(&index);
                scope.spawn(move || {
                    for i in 0..25 {
                        let id = format!("t{}-{}", t, i);
                        index
                            .insert(vec![entry(&id, "a.pdf", 1, vec![1.0, i as f32])])
                            .unwrap();
                        index.query(&[1.0, 0.0], 5).unwrap();
                    }
                });
            }
        });

        assert_eq!(index.len().unwrap(), 100);
    }

    #[test]
    fn test_stats_and_clear() {
        let index = sample_index();
        let stats = index.stats("hr").unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.dimension, 3);
        assert_eq!(stats.db_size_bytes, 0);

        index.clear().unwrap();
        assert!(index.is_empty().unwrap());
    }
}
