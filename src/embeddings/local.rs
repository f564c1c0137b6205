//! fastembed backend
//!
//! Runs a sentence model through ONNX Runtime. The model is fetched into
//! `EmbeddingConfig::cache_dir` the first time it is loaded, which can take
//! a minute or more; [`LocalModelLoader`] does that on a blocking thread so the
//! provider can keep answering keyword-only in the meantime.

use crate::config::EmbeddingConfig;
use crate::embeddings::{EmbeddingBackendLoader, EmbeddingService};
use crate::error::{AgentRankError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

/// fastembed model for one of the names in [`crate::config::SUPPORTED_MODELS`]
fn fastembed_model(name: &str) -> Result<EmbeddingModel> {
    let model = match name {
        "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
        "all-MiniLM-L12-v2" => EmbeddingModel::AllMiniLML12V2,
        "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
        other => {
            return Err(AgentRankError::Validation(format!(
                "No fastembed model for '{}'",
                other
            )))
        }
    };
    Ok(model)
}

/// Agent and task embeddings from a locally loaded model
pub struct LocalEmbeddingService {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl LocalEmbeddingService {
    /// Load (and if needed download) the configured model
    pub async fn new(config: EmbeddingConfig) -> Result<Self> {
        config.validate()?;
        let started = std::time::Instant::now();

        let mut options = InitOptions::default();
        options.model_name = fastembed_model(&config.model)?;
        options.show_download_progress = config.show_download_progress;
        options.cache_dir = config.cache_dir.clone();

        debug!("Loading {} from {:?}", config.model, config.cache_dir);
        let model = task::spawn_blocking(move || TextEmbedding::try_new(options))
            .await
            .map_err(|e| AgentRankError::Other(format!("Model load task failed: {}", e)))?
            .map_err(|e| AgentRankError::Embedding(format!("Failed to load {}: {}", config.model, e)))?;

        info!(
            "Loaded embedding model {} in {:?}",
            config.model,
            started.elapsed()
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions: config.dimensions(),
            model_name: config.model,
        })
    }

    /// One synchronous model call on the blocking pool
    async fn run_model(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if let Some(position) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(AgentRankError::Validation(format!(
                "Cannot embed blank text at position {}",
                position
            )));
        }

        let count = texts.len();
        let model = Arc::clone(&self.model);
        let vectors = task::spawn_blocking(move || {
            let mut model = model.lock();
            model.embed(texts, None)
        })
        .await
        .map_err(|e| AgentRankError::Other(format!("Embedding task failed: {}", e)))?
        .map_err(|e| AgentRankError::Embedding(e.to_string()))?;

        if vectors.len() != count {
            return Err(AgentRankError::Embedding(format!(
                "Model returned {} vectors for {} texts",
                vectors.len(),
                count
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run_model(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AgentRankError::Embedding("Model returned no vector".to_string()))
    }

    /// The index job sizes batches, so the whole slice goes through in one call
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} agent texts in one call", texts.len());
        self.run_model(texts.iter().map(|t| t.to_string()).collect())
            .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Loads a [`LocalEmbeddingService`] on demand for the provider
#[derive(Debug, Clone)]
pub struct LocalModelLoader {
    config: EmbeddingConfig,
}

impl LocalModelLoader {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EmbeddingBackendLoader for LocalModelLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingService>> {
        let service = LocalEmbeddingService::new(self.config.clone()).await?;
        Ok(Arc::new(service))
    }
}
