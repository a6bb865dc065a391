use crate::loader::DatasetSource;
use crate::record::Dataset;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use survey_core::{Result, SurveyError};
use survey_telemetry::info;
use tokio::sync::RwLock;

/// Holds the active [`Dataset`]. Either empty or fully loaded; a refresh swaps in a
/// complete replacement.
pub struct DatasetCache {
    source: Arc<dyn DatasetSource>,
    active: RwLock<Option<Arc<Dataset>>>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self { source, active: RwLock::new(None), loads: AtomicUsize::new(0) }
    }

    /// The active dataset, loading it first if nothing is cached yet. Concurrent
    /// first calls share a single load.
    pub async fn get_or_load(&self) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.active.read().await.as_ref() {
            return Ok(dataset.clone());
        }

        let mut active = self.active.write().await;
        if let Some(dataset) = active.as_ref() {
            return Ok(dataset.clone());
        }
        let dataset = Arc::new(self.load().await?);
        *active = Some(dataset.clone());
        Ok(dataset)
    }

    /// Reload from the source and replace the active dataset. On failure the
    /// previous dataset stays active.
    pub async fn refresh(&self) -> Result<Arc<Dataset>> {
        let dataset = Arc::new(self.load().await?);
        *self.active.write().await = Some(dataset.clone());
        Ok(dataset)
    }

    /// The active dataset without loading.
    pub async fn current(&self) -> Option<Arc<Dataset>> {
        self.active.read().await.clone()
    }

    /// Number of successful loads so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Result<Dataset> {
        let source = self.source.clone();
        let dataset = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| SurveyError::Internal(format!("dataset load task failed: {e}")))??;
        let loads = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        info!(source = %self.source.describe(), records = dataset.len(), loads, "Loaded responses");
        Ok(dataset)
    }
}
