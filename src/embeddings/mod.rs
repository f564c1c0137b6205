//! Embedding generation for semantic agent matching
//!
//! - [`EmbeddingService`]: backend trait (local fastembed model by default)
//! - [`EmbeddingProvider`]: lazily loaded, never-failing adapter used by the
//!   scorer and the index store
//! - [`EmbeddingCache`]: process-wide, append-only vectors keyed by agent name

pub mod cache;
pub mod local;
pub mod provider;

pub use cache::EmbeddingCache;
pub use local::{LocalEmbeddingService, LocalModelLoader};
pub use provider::{BackendState, EmbeddingBackendLoader, EmbeddingProvider};

use crate::error::Result;
use async_trait::async_trait;

/// Embedding service trait defining required operations
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batched)
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensionality (e.g., 384 for all-MiniLM-L6-v2)
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Calculate cosine similarity between two vectors
///
/// Mismatched lengths, empty or zero vectors yield exactly 0.0, never NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (magnitude_a * magnitude_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Similarity of two optional vectors, 0.0 when either is absent
pub fn similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => 0.0,
    }
}
