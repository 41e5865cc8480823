use crate::error::{Result, VisualizerError};
use crate::summary::Summary;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

// Constants
const INDEX_FILE: &str = "datasets.json";
const BLOB_DIR: &str = "datasets";

lazy_static! {
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
}

/// A stored upload together with its computed summary
///
/// Records are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDataset {
    /// Monotonically assigned identifier, never reused
    pub id: u64,

    /// Location of the raw upload, relative to the store root
    pub file: String,

    /// Sanitized name the client gave the file
    pub original_name: String,

    /// Creation time
    pub uploaded_at: DateTime<Utc>,

    /// Principal that uploaded the file, if known
    pub uploaded_by: Option<String>,

    /// Statistics computed at creation
    pub summary: Summary,

    /// Number of data rows parsed at creation
    pub row_count: usize,
}

/// On-disk index, rewritten atomically on every change
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreIndex {
    next_id: u64,
    /// Ascending by `(uploaded_at, id)`, oldest first
    datasets: Vec<UploadedDataset>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            next_id: 1,
            datasets: Vec::new(),
        }
    }
}

/// File-backed dataset store with a bounded history
///
/// Every mutation happens under a single lock and is committed by one
/// atomic rename of the index file. The record count therefore never
/// exceeds `retention_limit` for any observer, and a failed create leaves
/// the index exactly as it was.
#[derive(Debug)]
pub struct DatasetStore {
    root: PathBuf,
    retention_limit: usize,
    index: Mutex<StoreIndex>,
}

impl DatasetStore {
    /// Open (or initialize) a store rooted at `root`
    ///
    /// Creates the directory layout if it does not exist and loads the
    /// existing index otherwise.
    ///
    /// # Arguments
    /// * `root` - Directory for the index and uploaded blobs
    /// * `retention_limit` - Maximum number of datasets kept
    ///
    /// # Errors
    /// * `Io`/`Json` if the directory cannot be created or the index is unreadable
    pub fn open(root: impl AsRef<Path>, retention_limit: usize) -> Result<Self> {
        if retention_limit == 0 {
            return Err(VisualizerError::Config(
                "retention limit must be at least 1".into(),
            ));
        }

        let root = root.as_ref().to_path_buf();
        create_dir_all(root.join(BLOB_DIR))?;

        let index_path = root.join(INDEX_FILE);
        let index = if index_path.exists() {
            let data = fs::read_to_string(&index_path)?;
            serde_json::from_str(&data)?
        } else {
            StoreIndex::default()
        };

        log::info!(
            "dataset store opened at {} with {} record(s)",
            root.display(),
            index.datasets.len()
        );

        Ok(Self {
            root,
            retention_limit,
            index: Mutex::new(index),
        })
    }

    /// Maximum number of datasets this store keeps
    pub fn retention_limit(&self) -> usize {
        self.retention_limit
    }

    /// Store a validated upload and trim the history
    ///
    /// After the record is added, the oldest records (by upload time, then
    /// id) are removed until at most `retention_limit` remain. Blobs of the
    /// removed records are reclaimed once the new index is committed.
    ///
    /// # Arguments
    /// * `raw_file` - The upload body exactly as received
    /// * `original_name` - Client-supplied file name
    /// * `summary` - Statistics computed from the upload
    /// * `row_count` - Number of parsed data rows
    /// * `principal` - Uploading principal, if any
    ///
    /// # Returns
    /// * `Result<UploadedDataset>` - The created record
    pub fn create(
        &self,
        raw_file: &[u8],
        original_name: &str,
        summary: Summary,
        row_count: usize,
        principal: Option<&str>,
    ) -> Result<UploadedDataset> {
        let mut index = self.lock()?;

        let id = index.next_id;
        let original_name = sanitize_file_name(original_name);
        let file = format!("{}/{}_{}", BLOB_DIR, id, original_name);
        let blob_path = self.root.join(&file);
        if let Err(e) = fs::write(&blob_path, raw_file) {
            log::error!("failed to write blob for dataset {}: {}", id, e);
            discard_blob(&blob_path);
            return Err(e.into());
        }

        // Keep creation order and timestamp order aligned even if the clock steps back
        let now = Utc::now();
        let uploaded_at = match index.datasets.last() {
            Some(newest) if newest.uploaded_at > now => newest.uploaded_at,
            _ => now,
        };

        let dataset = UploadedDataset {
            id,
            file,
            original_name,
            uploaded_at,
            uploaded_by: principal.map(str::to_string),
            summary,
            row_count,
        };

        let mut next = index.clone();
        next.next_id = id + 1;
        next.datasets.push(dataset.clone());
        let evicted = trim_oldest(&mut next.datasets, self.retention_limit);

        if let Err(e) = self.commit(&next) {
            log::error!("failed to commit dataset {}: {}", id, e);
            discard_blob(&blob_path);
            return Err(e);
        }
        *index = next;
        drop(index);

        log::info!("stored dataset {} ({} rows)", dataset.id, dataset.row_count);
        for old in &evicted {
            log::info!("retention trimmed dataset {}", old.id);
            self.remove_blob(old);
        }

        Ok(dataset)
    }

    /// Most recent datasets first, at most `limit` of them
    pub fn list_recent(&self, limit: usize) -> Result<Vec<UploadedDataset>> {
        let index = self.lock()?;
        Ok(index.datasets.iter().rev().take(limit).cloned().collect())
    }

    /// The most recently created dataset, if any
    pub fn latest(&self) -> Result<Option<UploadedDataset>> {
        let index = self.lock()?;
        Ok(index.datasets.last().cloned())
    }

    /// Look up a dataset by id
    ///
    /// # Errors
    /// * `NotFound` if no dataset has this id
    pub fn get(&self, id: u64) -> Result<UploadedDataset> {
        let index = self.lock()?;
        index
            .datasets
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or(VisualizerError::NotFound(id))
    }

    /// Administrative delete of one dataset and its blob
    ///
    /// # Errors
    /// * `NotFound` if no dataset has this id
    pub fn delete(&self, id: u64) -> Result<UploadedDataset> {
        let mut index = self.lock()?;
        let position = index
            .datasets
            .iter()
            .position(|d| d.id == id)
            .ok_or(VisualizerError::NotFound(id))?;

        let mut next = index.clone();
        let removed = next.datasets.remove(position);
        self.commit(&next)?;
        *index = next;
        drop(index);

        log::info!("deleted dataset {}", id);
        self.remove_blob(&removed);
        Ok(removed)
    }

    /// Number of datasets currently retained
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.datasets.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Absolute location of a dataset's raw upload
    pub fn blob_path(&self, dataset: &UploadedDataset) -> PathBuf {
        self.root.join(&dataset.file)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreIndex>> {
        self.index
            .lock()
            .map_err(|_| VisualizerError::Storage("dataset index lock poisoned".to_string()))
    }

    /// Write the index to a temporary file and rename it into place
    fn commit(&self, index: &StoreIndex) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut tmp, index)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.root.join(INDEX_FILE))
            .map_err(|e| VisualizerError::Io(e.error))?;
        Ok(())
    }

    fn remove_blob(&self, dataset: &UploadedDataset) {
        let path = self.blob_path(dataset);
        if let Err(e) = fs::remove_file(&path) {
            log::warn!("could not remove blob {}: {}", path.display(), e);
        }
    }
}

/// Remove the oldest entries until at most `limit` remain
/// Remove the blob of a create that did not go through
fn discard_blob(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("could not remove blob {}: {}", path.display(), e);
        }
    }
}

fn trim_oldest(datasets: &mut Vec<UploadedDataset>, limit: usize) -> Vec<UploadedDataset> {
    datasets.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
    let excess = datasets.len().saturating_sub(limit);
    datasets.drain(..excess).collect()
}

/// Reduce a client-supplied file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = UNSAFE_NAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned.to_string()
    }
}
