use crate::cache::LoadCache;
use crate::decode::{self, SchemaError};
use crate::error::{LoaderError, LoaderResult};
use crate::models::{RunData, RunIndex, RunMeta, Sample, Summary};
use crate::store::{RawStore, StoreKey};
use crate::view::DatasetReconciliation;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Typed, validated and memoized access to the evaluation data store
pub struct DataLoader<S> {
    store: S,
    cache: LoadCache,
}

impl<S: RawStore> DataLoader<S> {
    /// Create a loader with a fresh cache
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: LoadCache::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the run index. `NotFound` here means nothing has been generated yet.
    #[instrument(skip(self))]
    pub async fn get_runs_index(&self) -> LoaderResult<Arc<RunIndex>> {
        self.cache
            .index
            .get_or_try_load((), || async {
                let index = self.load::<RunIndex>(StoreKey::Index).await?;
                check_index(&index);
                info!(runs = index.runs.len(), "loaded run index");
                Ok(index)
            })
            .await
    }

    /// Load a run's metadata and benchmark summary together
    #[instrument(skip(self))]
    pub async fn get_run_data(&self, run_id: &str) -> LoaderResult<RunData> {
        // Shares the cache entry with get_run_meta so both observe the same value
        let meta = self.get_run_meta(run_id).await?;

        let summary = self
            .cache
            .summary
            .get_or_try_load(run_id.to_string(), || async {
                let summary = self.load::<Summary>(StoreKey::summary(run_id)).await?;
                let reconciliation = DatasetReconciliation::between(&meta, &summary);
                if !reconciliation.is_consistent() {
                    warn!(
                        run_id,
                        missing_from_summary = ?reconciliation.missing_from_summary,
                        not_in_meta = ?reconciliation.not_in_meta,
                        "summary datasets differ from run metadata"
                    );
                }
                info!(run_id, datasets = summary.datasets.len(), "loaded summary");
                Ok(summary)
            })
            .await?;

        Ok(RunData { meta, summary })
    }

    /// Summary of a run, loaded through `get_run_data`
    pub async fn get_summary(&self, run_id: &str) -> LoaderResult<Arc<Summary>> {
        Ok(self.get_run_data(run_id).await?.summary)
    }

    /// Load only the metadata of a run
    #[instrument(skip(self))]
    pub async fn get_run_meta(&self, run_id: &str) -> LoaderResult<Arc<RunMeta>> {
        self.cache
            .meta
            .get_or_try_load(run_id.to_string(), || async {
                let meta = self.load::<RunMeta>(StoreKey::meta(run_id)).await?;
                if let Some(stored_id) = meta.run_id.as_deref().filter(|id| *id != run_id) {
                    warn!(run_id, stored_id, "meta.json names a different run id");
                }
                info!(run_id, datasets = meta.datasets.len(), "loaded run meta");
                Ok(meta)
            })
            .await
    }

    /// Load every stored sample of one dataset, in stored order
    #[instrument(skip(self))]
    pub async fn get_samples(
        &self,
        run_id: &str,
        dataset: &str,
    ) -> LoaderResult<Arc<Vec<Sample>>> {
        if dataset.trim().is_empty() {
            return Err(LoaderError::InvalidArgument(
                "no dataset specified".to_string(),
            ));
        }

        let meta = self.get_run_meta(run_id).await?;
        if !meta.has_dataset(dataset) {
            return Err(LoaderError::NotFound {
                key: StoreKey::samples(run_id, dataset).to_string(),
            });
        }

        self.cache
            .samples
            .get_or_try_load((run_id.to_string(), dataset.to_string()), || async {
                let samples = self
                    .load::<Vec<Sample>>(StoreKey::samples(run_id, dataset))
                    .await?;
                info!(run_id, dataset, samples = samples.len(), "loaded samples");
                Ok(samples)
            })
            .await
    }

    /// Read and decode one payload
    async fn load<T: DeserializeOwned>(&self, key: StoreKey) -> LoaderResult<T> {
        let payload = self.store.read(&key).await?;
        decode::decode(&payload.bytes, payload.format).map_err(|e| malformed(&key, e))
    }
}

fn malformed(key: &StoreKey, err: SchemaError) -> LoaderError {
    warn!(%key, path = %err.path, message = %err.message, "malformed payload");
    LoaderError::MalformedData {
        key: key.to_string(),
        path: err.path,
        message: err.message,
    }
}

/// Advisory consistency checks on the index
fn check_index(index: &RunIndex) {
    let runs = index.runs.len();
    if let Some(total) = index.total.filter(|total| *total != runs as u64) {
        warn!(total, runs, "index total disagrees with run count");
    }

    let mut seen = HashSet::new();
    for run in &index.runs {
        if !seen.insert(run.run_id.as_str()) {
            warn!(run_id = %run.run_id, "duplicate run id in index");
        }
    }
}
