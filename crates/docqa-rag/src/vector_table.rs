//! Vector tables: on-disk SQLite and in-process memory

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use zerocopy::{FromBytes, IntoBytes};

use docqa_core::vector_store::{check_dimensions, rank_hits, squared_l2};
use docqa_core::{EmbeddingRecord, Error, Result, SearchConfig, SearchHit, VectorStore};

const NO_TABLE: usize = 0;

fn store_err(e: rusqlite::Error) -> Error {
    Error::VectorStore(e.to_string())
}

fn load_dimensions(slot: &AtomicUsize) -> Option<usize> {
    match slot.load(Ordering::SeqCst) {
        NO_TABLE => None,
        dims => Some(dims),
    }
}

fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % size_of::<f32>() != 0 {
        return Err(Error::VectorStore(format!(
            "Stored vector has {} bytes, not a whole number of f32 values",
            blob.len()
        )));
    }
    blob.chunks_exact(size_of::<f32>())
        .map(|chunk| {
            f32::read_from_bytes(chunk)
                .map_err(|_| Error::VectorStore("Unreadable vector blob".to_string()))
        })
        .collect()
}

/// Vector table stored in a SQLite file
///
/// The table holds `(vector, text, source)` rows. The schema
/// dimensionality lives in a `meta` table so a later run can reopen the
/// file and keep querying it.
pub struct SqliteVectorTable {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
    dimensions: AtomicUsize,
}

impl SqliteVectorTable {
    /// Open (or create) the database file, picking up an existing table
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// A table that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        let dimensions = Self::read_dimensions(&conn)?.unwrap_or(NO_TABLE);
        if dimensions != NO_TABLE {
            tracing::debug!(dimensions, "Reopened existing vector table");
        }
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            dimensions: AtomicUsize::new(dimensions),
        })
    }

    fn read_dimensions(conn: &Connection) -> Result<Option<usize>> {
        let has_meta: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
                [],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        if !has_meta {
            return Ok(None);
        }

        let value: Option<i64> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'dimensions'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(value.and_then(|v| usize::try_from(v).ok()).filter(|&v| v != NO_TABLE))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every stored vector, in insertion order
    pub fn vectors(&self) -> Result<Vec<Vec<f32>>> {
        if load_dimensions(&self.dimensions).is_none() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT vector FROM records ORDER BY id")
            .map_err(store_err)?;
        let blobs = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        blobs.iter().map(|blob| decode_vector(blob)).collect()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::VectorStore("Connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorTable {
    async fn create_table(&self, dimensions: usize) -> Result<()> {
        if dimensions == NO_TABLE {
            return Err(Error::InvalidInput(
                "Vector dimensionality must be positive".to_string(),
            ));
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_err)?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS records;
             DROP TABLE IF EXISTS meta;
             CREATE TABLE meta (
                 key TEXT PRIMARY KEY,
                 value INTEGER NOT NULL
             );
             CREATE TABLE records (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 vector BLOB NOT NULL,
                 text TEXT NOT NULL,
                 source TEXT
             );",
        )
        .map_err(store_err)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('dimensions', ?1)",
            params![dimensions as i64],
        )
        .map_err(store_err)?;
        tx.commit().map_err(store_err)?;

        self.dimensions.store(dimensions, Ordering::SeqCst);
        tracing::debug!(dimensions, path = ?self.path, "Created vector table");
        Ok(())
    }

    async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        let expected = load_dimensions(&self.dimensions);
        for record in &records {
            check_dimensions(expected, &record.vector)?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(store_err)?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO records (vector, text, source) VALUES (?1, ?2, ?3)")
                .map_err(store_err)?;
            for record in &records {
                stmt.execute(params![record.vector.as_bytes(), record.text, record.source])
                    .map_err(store_err)?;
            }
        }
        tx.commit().map_err(store_err)?;
        Ok(records.len())
    }

    async fn search(&self, vector: &[f32], config: &SearchConfig) -> Result<Vec<SearchHit>> {
        check_dimensions(load_dimensions(&self.dimensions), vector)?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT vector, text, source FROM records")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Vec<u8>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })
            .map_err(store_err)?;

        let mut hits = Vec::new();
        for row in rows {
            let (blob, text, source) = row.map_err(store_err)?;
            let stored = decode_vector(&blob)?;
            hits.push(SearchHit {
                distance: squared_l2(vector, &stored),
                text,
                source,
            });
        }
        Ok(rank_hits(hits, config))
    }

    async fn texts(&self) -> Result<Vec<String>> {
        if load_dimensions(&self.dimensions).is_none() {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT text FROM records ORDER BY id")
            .map_err(store_err)?;
        let texts = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;
        Ok(texts)
    }

    async fn count(&self) -> Result<usize> {
        if load_dimensions(&self.dimensions).is_none() {
            return Ok(0);
        }
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(count as usize)
    }

    fn dimensions(&self) -> Option<usize> {
        load_dimensions(&self.dimensions)
    }
}

/// Vector table kept in process memory
#[derive(Default)]
pub struct MemoryVectorTable {
    records: Mutex<Vec<EmbeddingRecord>>,
    dimensions: AtomicUsize,
}

impl MemoryVectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<EmbeddingRecord>>> {
        self.records
            .lock()
            .map_err(|_| Error::VectorStore("Record lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorTable {
    async fn create_table(&self, dimensions: usize) -> Result<()> {
        if dimensions == NO_TABLE {
            return Err(Error::InvalidInput(
                "Vector dimensionality must be positive".to_string(),
            ));
        }
        self.lock()?.clear();
        self.dimensions.store(dimensions, Ordering::SeqCst);
        Ok(())
    }

    async fn insert(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        let expected = load_dimensions(&self.dimensions);
        for record in &records {
            check_dimensions(expected, &record.vector)?;
        }
        let inserted = records.len();
        self.lock()?.extend(records);
        Ok(inserted)
    }

    async fn search(&self, vector: &[f32], config: &SearchConfig) -> Result<Vec<SearchHit>> {
        check_dimensions(load_dimensions(&self.dimensions), vector)?;
        let hits = self
            .lock()?
            .iter()
            .map(|record| SearchHit {
                text: record.text.clone(),
                source: record.source.clone(),
                distance: squared_l2(vector, &record.vector),
            })
            .collect();
        Ok(rank_hits(hits, config))
    }

    async fn texts(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.iter().map(|r| r.text.clone()).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    fn dimensions(&self) -> Option<usize> {
        load_dimensions(&self.dimensions)
    }
}
