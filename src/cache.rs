//! Process-lifetime memo of parsed payloads.
//!
//! One [`LoadCache`] is created with each [`crate::loader::DataLoader`] and lives
//! as long as it does. Entries are never invalidated: the store is regenerated
//! externally between process restarts. Each key owns a `OnceCell`, so
//! concurrent requests for the same key wait on a single in-flight load instead
//! of each parsing the payload. Failed loads leave the cell empty.

use crate::error::LoaderResult;
use crate::models::{RunIndex, RunMeta, Sample, Summary};
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Memo for one operation's results, keyed by its arguments
pub struct Memo<K, V> {
    cells: DashMap<K, Arc<OnceCell<Arc<V>>>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Return the memoized value for `key`, running `load` at most once per
    /// successful initialisation
    pub async fn get_or_try_load<F, Fut>(&self, key: K, load: F) -> LoaderResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LoaderResult<V>>,
    {
        // The map guard is released before awaiting
        let cell = self.cells.entry(key.clone()).or_default().value().clone();
        if let Some(value) = cell.get() {
            debug!(?key, "cache hit");
            return Ok(Arc::clone(value));
        }

        debug!(?key, "cache miss");
        cell.get_or_try_init(|| async { load().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Number of successfully loaded entries
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// All memos owned by a data loader
#[derive(Default)]
pub struct LoadCache {
    pub(crate) index: Memo<(), RunIndex>,
    pub(crate) meta: Memo<String, RunMeta>,
    pub(crate) summary: Memo<String, Summary>,
    pub(crate) samples: Memo<(String, String), Vec<Sample>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of parsed payloads held
    pub fn len(&self) -> usize {
        self.index.len() + self.meta.len() + self.summary.len() + self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_memo_loads_once() {
        let memo: Memo<String, u32> = Memo::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = memo
                .get_or_try_load("k".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memo.len(), 1);
    }

    #[tokio::test]
    async fn test_memo_returns_same_arc() {
        let memo: Memo<String, Vec<u8>> = Memo::new();
        let first = memo
            .get_or_try_load("k".to_string(), || async { Ok(vec![1, 2]) })
            .await
            .unwrap();
        let second = memo
            .get_or_try_load("k".to_string(), || async { Ok(vec![9]) })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_memo_does_not_cache_failures() {
        let memo: Memo<String, u32> = Memo::new();

        let err = memo
            .get_or_try_load("k".to_string(), || async {
                Err(LoaderError::InvalidArgument("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LoaderError::InvalidArgument(_)));
        assert!(memo.is_empty());

        let value = memo
            .get_or_try_load("k".to_string(), || async { Ok(3) })
            .await
            .unwrap();
        assert_eq!(*value, 3);
    }

    #[tokio::test]
    async fn test_memo_concurrent_loads_share_one_flight() {
        let memo: Arc<Memo<String, u32>> = Arc::new(Memo::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let memo = Arc::clone(&memo);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                memo.get_or_try_load("shared".to_string(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(11)
                })
                .await
                .map(|v| *v)
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 11);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_cache_len() {
        let cache = LoadCache::new();
        assert!(cache.is_empty());

        cache
            .meta
            .get_or_try_load("run".to_string(), || async {
                Err(LoaderError::InvalidArgument("no".to_string()))
            })
            .await
            .unwrap_err();
        assert_eq!(cache.len(), 0);
    }
}
