//! Shared query-time state.
//!
//! A [`SearchContext`] pairs the loaded engine with the embedder used to turn
//! query text into vectors. It is created once and shared; there is no
//! process-global index. A rebuild publishes a new engine with a single
//! atomic swap, so in-flight queries finish against the engine they started
//! with.
//!
//! Hits carry row ids only. Before joining them back to catalog rows, callers
//! check [`SearchContext::ensure_snapshot`] against the catalog's current
//! fingerprint so a re-imported catalog is never read through an old index.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::embed::Embedder;
use crate::engine::{QueryEngine, SearchHit};
use crate::error::{IndexError, IndexResult};
use crate::index::Index;
use crate::normalize::normalize;
use crate::store::IndexStore;

pub struct SearchContext {
    store: Option<IndexStore>,
    embedder: Arc<dyn Embedder>,
    engine: ArcSwap<QueryEngine>,
}

impl SearchContext {
    /// Load the index published in `store`.
    ///
    /// Fails with [`IndexError::NotFound`](crate::IndexError::NotFound) when
    /// nothing has been built yet, and with
    /// [`IndexError::Corrupt`](crate::IndexError::Corrupt) when the artifact
    /// does not validate.
    pub fn open(store: IndexStore, embedder: Arc<dyn Embedder>) -> IndexResult<Self> {
        let index = store.load()?;
        Ok(Self {
            store: Some(store),
            embedder,
            engine: ArcSwap::from_pointee(QueryEngine::flat(index)),
        })
    }

    /// A context over an in-memory index, with no backing store.
    #[must_use]
    pub fn from_index(index: Index, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store: None,
            embedder,
            engine: ArcSwap::from_pointee(QueryEngine::flat(index)),
        }
    }

    /// The engine currently serving queries.
    #[must_use]
    pub fn engine(&self) -> Arc<QueryEngine> {
        self.engine.load_full()
    }

    #[must_use]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    #[must_use]
    pub fn store(&self) -> Option<&IndexStore> {
        self.store.as_ref()
    }

    /// Fail with [`IndexError::Stale`] unless the serving engine was built
    /// from the catalog whose fingerprint is `catalog`.
    pub fn ensure_snapshot(&self, catalog: u32) -> IndexResult<()> {
        let index = self.engine.load().snapshot();
        if index == catalog {
            Ok(())
        } else {
            log::warn!("Index snapshot {index:08x} does not match catalog {catalog:08x}");
            Err(IndexError::Stale { index, catalog })
        }
    }

    /// Embed `text` and return its `k` nearest rows.
    ///
    /// `k == 0` returns immediately without calling the embedder.
    pub async fn search(&self, text: &str, k: usize) -> IndexResult<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let raw = self.embedder.encode(text).await?;
        let query = normalize(&raw)?;

        let engine = self.engine.load_full();
        let hits = engine.search(&query, k)?;
        log::debug!("Query {text:?} (k={k}) matched {} rows", hits.len());
        Ok(hits)
    }

    /// Re-read the store and publish whatever index it now holds.
    ///
    /// On failure the current engine keeps serving. Contexts built with
    /// [`from_index`](Self::from_index) have nothing to reload and keep
    /// their engine.
    pub fn reload(&self) -> IndexResult<()> {
        let Some(store) = &self.store else {
            log::debug!("No backing store; reload skipped");
            return Ok(());
        };

        let index = store.load()?;
        log::info!("Reloaded index of {} vectors", index.len());
        self.replace(index);
        Ok(())
    }

    /// Publish `index` as the new searchable index.
    pub fn replace(&self, index: Index) {
        self.engine.store(Arc::new(QueryEngine::flat(index)));
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = self.engine.load();
        f.debug_struct("SearchContext")
            .field("store", &self.store)
            .field("embedder", &self.embedder)
            .field("vectors", &engine.len())
            .field("dimension", &engine.dimension())
            .field("snapshot", &engine.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;
    use async_trait::async_trait;
    use sift_core::RowId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Fixed text-to-vector table that counts its calls.
    #[derive(Debug, Default)]
    struct TableEmbedder {
        table: HashMap<&'static str, Vec<f32>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .get(text)
                .cloned()
                .ok_or_else(|| EmbedError::Request(format!("unknown text {text:?}")))
        }
    }

    fn toy_embedder() -> Arc<TableEmbedder> {
        Arc::new(TableEmbedder {
            table: HashMap::from([
                ("email automation", vec![1.0, 0.0]),
                ("file backup", vec![0.0, 1.0]),
                ("payment processing", vec![0.7, 0.7]),
                ("send emails", vec![1.0, 0.0]),
                ("nothing", vec![0.0, 0.0]),
                ("wide", vec![1.0, 0.0, 0.0]),
            ]),
            calls: AtomicUsize::new(0),
        })
    }

    fn index_of(vectors: &[[f32; 2]]) -> Index {
        Index::from_entries(
            2,
            vectors
                .iter()
                .enumerate()
                .map(|(i, v)| (RowId::from_position(i), normalize(v).unwrap())),
        )
        .unwrap()
    }

    fn toy_index() -> Index {
        index_of(&[[1.0, 0.0], [0.0, 1.0], [0.7, 0.7]])
    }

    #[tokio::test]
    async fn test_search_by_text() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());

        let hits = context.search("send emails", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row_id, RowId::new(0));
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].row_id, RowId::new(2));
    }

    #[tokio::test]
    async fn test_row_name_finds_itself_first() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());

        for (i, name) in ["email automation", "file backup", "payment processing"]
            .iter()
            .enumerate()
        {
            let hits = context.search(name, 1).await.unwrap();
            assert_eq!(hits[0].row_id, RowId::from_position(i));
            assert!((hits[0].score - 1.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_zero_k_skips_the_embedder() {
        let embedder = toy_embedder();
        let context = SearchContext::from_index(toy_index(), embedder.clone());

        assert!(context.search("send emails", 0).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_degenerate_query_is_rejected() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());
        let result = context.search("nothing", 3).await;
        assert!(matches!(result, Err(IndexError::Degenerate(_))));
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());
        let result = context.search("wide", 3).await;
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_embedder_failure_is_reported() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());
        let err = context.search("unheard of", 3).await.unwrap_err();
        assert!(err.is_embedder_failure());
    }

    #[test]
    fn test_open_without_index_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = SearchContext::open(IndexStore::new(temp_dir.path()), toy_embedder());
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_reload_picks_up_rebuilt_index() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        store.save(&toy_index()).unwrap();

        let context = SearchContext::open(store.clone(), toy_embedder()).unwrap();
        assert_eq!(context.engine().len(), 3);

        store.save(&index_of(&[[0.0, 1.0]])).unwrap();
        context.reload().unwrap();

        assert_eq!(context.engine().len(), 1);
        let hits = context.search("send emails", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score.abs() < 1e-6);
    }

    #[test]
    fn test_failed_reload_keeps_current_engine() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        store.save(&toy_index()).unwrap();
        let context = SearchContext::open(store.clone(), toy_embedder()).unwrap();

        std::fs::write(store.index_path(), b"garbage").unwrap();

        assert!(context.reload().unwrap_err().is_corrupt());
        assert_eq!(context.engine().len(), 3);
    }

    #[test]
    fn test_snapshot_check_follows_reload() {
        let temp_dir = TempDir::new().unwrap();
        let store = IndexStore::new(temp_dir.path());
        store.save(&toy_index().with_snapshot(7)).unwrap();

        let context = SearchContext::open(store.clone(), toy_embedder()).unwrap();
        context.ensure_snapshot(7).unwrap();

        let err = context.ensure_snapshot(8).unwrap_err();
        assert!(err.is_stale());
        assert!(matches!(
            err,
            IndexError::Stale {
                index: 7,
                catalog: 8
            }
        ));

        store.save(&toy_index().with_snapshot(8)).unwrap();
        context.reload().unwrap();
        context.ensure_snapshot(8).unwrap();
        assert!(context.ensure_snapshot(7).unwrap_err().is_stale());
    }

    #[test]
    fn test_replace_does_not_disturb_held_engine() {
        let context = SearchContext::from_index(toy_index(), toy_embedder());
        let before = context.engine();

        context.replace(index_of(&[[1.0, 1.0]]));

        assert_eq!(before.len(), 3);
        assert_eq!(context.engine().len(), 1);
    }
}
