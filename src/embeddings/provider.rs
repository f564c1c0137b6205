//! Lazy embedding provider
//!
//! Wraps an [`EmbeddingService`] that is expensive to load. The backend moves
//! through `Unloaded -> Loading -> Ready`, or ends in `Unavailable` when the
//! loader fails. None of the public operations return errors: a missing or
//! failing backend yields `None` and the caller scores without semantics.

use crate::config::EmbeddingConfig;
use crate::embeddings::{EmbeddingCache, EmbeddingService};
use crate::error::Result;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

/// Loads the embedding backend once
#[async_trait]
pub trait EmbeddingBackendLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmbeddingService>>;
}

/// Backend lifecycle
#[derive(Clone)]
pub enum BackendState {
    Unloaded,
    Loading,
    Ready(Arc<dyn EmbeddingService>),
    /// Terminal; carries the reason
    Unavailable(String),
}

impl BackendState {
    pub fn name(&self) -> &'static str {
        match self {
            BackendState::Unloaded => "unloaded",
            BackendState::Loading => "loading",
            BackendState::Ready(_) => "ready",
            BackendState::Unavailable(_) => "unavailable",
        }
    }
}

impl std::fmt::Debug for BackendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendState::Unavailable(reason) => write!(f, "Unavailable({})", reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Never-failing, lazily loaded embedding client with a per-agent cache
pub struct EmbeddingProvider {
    state: Arc<Mutex<BackendState>>,
    loader: Option<Arc<dyn EmbeddingBackendLoader>>,
    cache: EmbeddingCache,
    poll_interval: Duration,
    task_timeout: Duration,
}

impl EmbeddingProvider {
    /// Provider that loads its backend on first demand
    pub fn new(loader: Arc<dyn EmbeddingBackendLoader>, config: &EmbeddingConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::Unloaded)),
            loader: Some(loader),
            cache: EmbeddingCache::new(),
            poll_interval: config.poll_interval(),
            task_timeout: config.task_timeout(),
        }
    }

    /// Provider backed by an already loaded service
    pub fn with_service(service: Arc<dyn EmbeddingService>, config: &EmbeddingConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::Ready(service))),
            loader: None,
            cache: EmbeddingCache::new(),
            poll_interval: config.poll_interval(),
            task_timeout: config.task_timeout(),
        }
    }

    /// Provider that is permanently unavailable
    pub fn disabled() -> Self {
        let config = EmbeddingConfig::default();
        Self {
            state: Arc::new(Mutex::new(BackendState::Unavailable(
                "semantic matching disabled".to_string(),
            ))),
            loader: None,
            cache: EmbeddingCache::new(),
            poll_interval: config.poll_interval(),
            task_timeout: config.task_timeout(),
        }
    }

    pub fn state(&self) -> BackendState {
        self.state.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), BackendState::Ready(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(*self.state.lock(), BackendState::Unavailable(_))
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Start loading the backend if nothing has started it yet
    pub fn ensure_loading(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, BackendState::Unloaded) {
            return;
        }

        let loader = match &self.loader {
            Some(loader) => Arc::clone(loader),
            None => {
                *state = BackendState::Unavailable("no embedding backend configured".to_string());
                return;
            }
        };

        *state = BackendState::Loading;
        drop(state);

        info!("Loading embedding backend in the background");
        let shared_state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let outcome = loader.load().await;
            let mut state = shared_state.lock();
            *state = match outcome {
                Ok(service) => {
                    info!("Embedding backend ready: {}", service.model_name());
                    BackendState::Ready(service)
                }
                Err(e) => {
                    debug!("Embedding backend unavailable: {}", e);
                    BackendState::Unavailable(e.to_string())
                }
            };
        });
    }

    /// Poll until the backend is ready, it becomes unavailable, or `limit` passes
    pub async fn wait_until_ready(&self, limit: Duration) -> bool {
        self.ensure_loading();
        let deadline = Instant::now() + limit;

        loop {
            match &*self.state.lock() {
                BackendState::Ready(_) => return true,
                BackendState::Unavailable(_) => return false,
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    fn ready_service(&self) -> Option<Arc<dyn EmbeddingService>> {
        match &*self.state.lock() {
            BackendState::Ready(service) => Some(Arc::clone(service)),
            _ => None,
        }
    }

    /// Cached vector for `key`, computed on demand only when the backend is ready
    pub async fn get_embedding(&self, key: &str, text: &str) -> Option<Arc<Vec<f32>>> {
        if let Some(hit) = self.cache.get(key) {
            return Some(hit);
        }

        let service = self.ready_service()?;
        match service.embed(text).await {
            Ok(vector) if usable(&vector, service.as_ref()) => Some(self.cache.insert(key, vector)),
            Ok(vector) => {
                debug!("Unusable embedding ({} dims) returned for {}", vector.len(), key);
                None
            }
            Err(e) => {
                debug!("Embedding failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Vectors for `(key, text)` pairs, with one backend batch call for the uncached ones
    ///
    /// A failing batch falls back to embedding each pair on its own, so one bad
    /// text only costs its own slot.
    pub async fn get_embeddings(&self, items: &[(&str, &str)]) -> Vec<Option<Arc<Vec<f32>>>> {
        let mut vectors: Vec<Option<Arc<Vec<f32>>>> =
            items.iter().map(|(key, _)| self.cache.get(key)).collect();
        let missing: Vec<usize> = (0..items.len()).filter(|&i| vectors[i].is_none()).collect();
        if missing.is_empty() {
            return vectors;
        }
        let Some(service) = self.ready_service() else {
            return vectors;
        };

        let texts: Vec<&str> = missing.iter().map(|&i| items[i].1).collect();
        let batch = match service.embed_batch(&texts).await {
            Ok(batch) if batch.len() == texts.len() => Some(batch),
            Ok(batch) => {
                debug!(
                    "Batch returned {} vectors for {} texts, embedding one by one",
                    batch.len(),
                    texts.len()
                );
                None
            }
            Err(e) => {
                debug!("Batch embedding failed, embedding one by one: {}", e);
                None
            }
        };

        match batch {
            Some(batch) => {
                for (&i, vector) in missing.iter().zip(batch) {
                    if usable(&vector, service.as_ref()) {
                        vectors[i] = Some(self.cache.insert(items[i].0, vector));
                    } else {
                        debug!("Unusable embedding ({} dims) for {}", vector.len(), items[i].0);
                    }
                }
            }
            None => {
                let singles = join_all(
                    missing
                        .iter()
                        .map(|&i| self.get_embedding(items[i].0, items[i].1)),
                )
                .await;
                for (&i, vector) in missing.iter().zip(singles) {
                    vectors[i] = vector;
                }
            }
        }

        vectors
    }

    /// Embedding of free task text, waiting at most the configured task timeout
    pub async fn get_task_embedding(&self, text: &str) -> Option<Vec<f32>> {
        if text.trim().is_empty() {
            return None;
        }

        let started = Instant::now();
        if !self.wait_until_ready(self.task_timeout).await {
            debug!(
                "Embedding backend not ready after {:?} ({}), scoring without semantics",
                started.elapsed(),
                self.state().name()
            );
            return None;
        }

        let service = self.ready_service()?;
        let remaining = self.task_timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            debug!("Task embedding budget spent waiting for the backend");
            return None;
        }
        match timeout(remaining, service.embed(text)).await {
            Ok(Ok(vector)) if usable(&vector, service.as_ref()) => Some(vector),
            Ok(Ok(_)) => None,
            Ok(Err(e)) => {
                debug!("Task embedding failed: {}", e);
                None
            }
            Err(_) => {
                debug!("Task embedding timed out");
                None
            }
        }
    }

    pub fn similarity(&self, a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
        crate::embeddings::similarity(a, b)
    }
}

/// Non-empty and of the model's dimensionality
fn usable(vector: &[f32], service: &dyn EmbeddingService) -> bool {
    !vector.is_empty() && vector.len() == service.dimensions()
}
