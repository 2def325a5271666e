//! Raw payload access for the static evaluation data store.
//!
//! The store is addressed by logical keys (`index`, `{run}/meta`,
//! `{run}/summary`, `{run}/samples/{dataset}`). A backend maps each key to
//! whatever physical object holds it and returns the payload bytes untouched.
//! Absence is reported as [`StoreError::NotFound`], every other access fault
//! as [`StoreError::Io`].

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Logical key of the run index
pub const INDEX_KEY: &str = "index";

/// Logical address of one object in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Index,
    Meta { run_id: String },
    Summary { run_id: String },
    Samples { run_id: String, dataset: String },
}

impl StoreKey {
    pub fn meta(run_id: &str) -> Self {
        Self::Meta {
            run_id: run_id.to_string(),
        }
    }

    pub fn summary(run_id: &str) -> Self {
        Self::Summary {
            run_id: run_id.to_string(),
        }
    }

    pub fn samples(run_id: &str, dataset: &str) -> Self {
        Self::Samples {
            run_id: run_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// Run id and dataset segments of the key, for path safety checks
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Index => Vec::new(),
            Self::Meta { run_id } | Self::Summary { run_id } => vec![run_id.as_str()],
            Self::Samples { run_id, dataset } => vec![run_id.as_str(), dataset.as_str()],
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str(INDEX_KEY),
            Self::Meta { run_id } => write!(f, "{run_id}/meta"),
            Self::Summary { run_id } => write!(f, "{run_id}/summary"),
            Self::Samples { run_id, dataset } => write!(f, "{run_id}/samples/{dataset}"),
        }
    }
}

/// Encoding of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// A single JSON document
    Json,
    /// One JSON document per line
    JsonLines,
}

/// Raw bytes of one stored object; decoding is left to the loader
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub format: PayloadFormat,
}

impl Payload {
    pub fn json(text: impl Into<String>) -> Self {
        Self {
            bytes: text.into().into_bytes(),
            format: PayloadFormat::Json,
        }
    }
}

/// Read-only access to stored payloads
#[async_trait]
pub trait RawStore: Send + Sync {
    /// Fetch the payload stored at `key`
    async fn read(&self, key: &StoreKey) -> Result<Payload, StoreError>;
}

/// Segments that cannot name a run or dataset directory
fn is_unsafe_segment(segment: &str) -> bool {
    segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
        || segment.contains('\0')
}

/// Store backed by the ETL output directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run directories are written either at the root or below `runs/`
    fn run_dirs(&self, run_id: &str) -> [PathBuf; 2] {
        [self.root.join(run_id), self.root.join("runs").join(run_id)]
    }

    /// Physical files that may hold `key`, in lookup order
    fn candidates(&self, key: &StoreKey) -> Vec<(PathBuf, PayloadFormat)> {
        match key {
            StoreKey::Index => vec![(self.root.join("index.json"), PayloadFormat::Json)],
            StoreKey::Meta { run_id } => self
                .run_dirs(run_id)
                .into_iter()
                .map(|dir| (dir.join("meta.json"), PayloadFormat::Json))
                .collect(),
            StoreKey::Summary { run_id } => self
                .run_dirs(run_id)
                .into_iter()
                .flat_map(|dir| {
                    [
                        (dir.join("summary.json"), PayloadFormat::Json),
                        (dir.join("eval_summary.json"), PayloadFormat::Json),
                    ]
                })
                .collect(),
            StoreKey::Samples { run_id, dataset } => self
                .run_dirs(run_id)
                .into_iter()
                .flat_map(|dir| {
                    let samples = dir.join("samples");
                    [
                        (samples.join(format!("{dataset}.json")), PayloadFormat::Json),
                        (
                            samples.join(format!("{dataset}.jsonl")),
                            PayloadFormat::JsonLines,
                        ),
                        (
                            samples.join(format!("{dataset}_head.jsonl")),
                            PayloadFormat::JsonLines,
                        ),
                    ]
                })
                .collect(),
        }
    }
}

#[async_trait]
impl RawStore for FsStore {
    async fn read(&self, key: &StoreKey) -> Result<Payload, StoreError> {
        if key.segments().into_iter().any(is_unsafe_segment) {
            return Err(StoreError::NotFound(key.to_string()));
        }

        for (path, format) in self.candidates(key) {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                // A file where a run directory is expected is a miss, not a fault
                Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                    continue;
                }
                Err(source) => {
                    return Err(StoreError::Io {
                        key: key.to_string(),
                        source,
                    });
                }
            };

            debug!(%key, path = %path.display(), bytes = bytes.len(), "read payload");
            return Ok(Payload { bytes, format });
        }

        Err(StoreError::NotFound(key.to_string()))
    }
}

/// In-memory store, mostly for tests and embedding pre-generated data
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<StoreKey, Payload>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: StoreKey, payload: Payload) {
        self.objects.insert(key, payload);
    }

    /// Builder-style insert of a JSON document
    pub fn with_json(self, key: StoreKey, text: impl Into<String>) -> Self {
        self.insert(key, Payload::json(text));
        self
    }

    /// Number of read attempts served so far, hits and misses alike
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawStore for MemoryStore {
    async fn read(&self, key: &StoreKey) -> Result<Payload, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
