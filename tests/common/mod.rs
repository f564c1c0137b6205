//! Common test utilities and helpers

#![allow(dead_code)]

use agentrank_core::config::EmbeddingConfig;
use agentrank_core::AgentRankConfig;
use agentrank_core::error::{AgentRankError, Result};
use agentrank_core::{EmbeddingBackendLoader, EmbeddingProvider, EmbeddingService};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Dimensions of the hashing test embeddings
pub const TEST_DIMENSIONS: usize = 64;

/// Deterministic bag-of-words embedding: texts sharing words point the same way
pub struct HashingEmbeddingService;

impl HashingEmbeddingService {
    fn bucket(word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % TEST_DIMENSIONS as u64) as usize
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; TEST_DIMENSIONS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            vector[Self::bucket(word)] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AgentRankError::Validation("Text cannot be empty".to_string()));
        }
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        TEST_DIMENSIONS
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

/// Loader whose backend never comes up
pub struct FailingLoader;

#[async_trait]
impl EmbeddingBackendLoader for FailingLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingService>> {
        Err(AgentRankError::Embedding("model download failed".to_string()))
    }
}

/// Loader that takes longer than any test waits
pub struct StalledLoader;

#[async_trait]
impl EmbeddingBackendLoader for StalledLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingService>> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Err(AgentRankError::Embedding("never ready".to_string()))
    }
}

/// Short timeouts so fallbacks resolve quickly
pub fn fast_embedding_config() -> EmbeddingConfig {
    EmbeddingConfig {
        task_timeout_ms: 100,
        poll_interval_ms: 5,
        ready_timeout_ms: 200,
        batch_size: 4,
        ..Default::default()
    }
}

/// Full configuration carrying the short embedding timeouts
pub fn fast_config() -> AgentRankConfig {
    AgentRankConfig {
        embedding: fast_embedding_config(),
        ..Default::default()
    }
}

pub fn hashing_provider() -> Arc<EmbeddingProvider> {
    Arc::new(EmbeddingProvider::with_service(
        Arc::new(HashingEmbeddingService),
        &fast_embedding_config(),
    ))
}

pub fn failing_provider() -> Arc<EmbeddingProvider> {
    Arc::new(EmbeddingProvider::new(
        Arc::new(FailingLoader),
        &fast_embedding_config(),
    ))
}

pub fn stalled_provider() -> Arc<EmbeddingProvider> {
    Arc::new(EmbeddingProvider::new(
        Arc::new(StalledLoader),
        &fast_embedding_config(),
    ))
}

/// Write one markdown agent definition under `agents_dir`
pub fn write_agent(agents_dir: &Path, relative: &str, name: &str, description: &str, body: &str) -> PathBuf {
    let path = agents_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create agent directory");
    }
    let content = format!(
        "---\nname: {}\ndescription: {}\n---\n{}\n",
        name, description, body
    );
    fs::write(&path, content).expect("Failed to write agent file");
    path
}

/// Temp project with `myapp/` as project root and `myapp/agents/` holding definitions
pub struct TestProject {
    pub dir: TempDir,
    pub root: PathBuf,
    pub agents_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().join("myapp");
        let agents_dir = root.join("agents");
        fs::create_dir_all(&agents_dir).expect("Failed to create agents dir");
        Self {
            dir,
            root,
            agents_dir,
        }
    }

    pub fn agent(&self, relative: &str, name: &str, description: &str) -> &Self {
        write_agent(&self.agents_dir, relative, name, description, "");
        self
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(".agentrank").join("capabilities-index.json")
    }
}

/// Twenty agents spanning unrelated domains
pub fn twenty_agent_catalog(project: &TestProject) {
    let agents = [
        ("security/security-auditor.md", "security-auditor", "Audits code for security vulnerabilities and insecure patterns"),
        ("frontend/frontend-developer.md", "frontend-developer", "Builds responsive user interfaces with React"),
        ("backend/api-designer.md", "api-designer", "Designs REST and GraphQL APIs"),
        ("backend/database-admin.md", "database-admin", "Tunes Postgres schemas and queries"),
        ("devops/deployment-engineer.md", "deployment-engineer", "Ships services with Docker and Kubernetes"),
        ("testing/test-writer.md", "test-writer", "Writes unit and integration tests"),
        ("docs/docs-writer.md", "docs-writer", "Writes user documentation and guides"),
        ("data/data-analyst.md", "data-analyst", "Explores analytics data and dashboards"),
        ("ml/ml-engineer.md", "ml-engineer", "Trains machine learning models"),
        ("mobile/mobile-developer.md", "mobile-developer", "Builds mobile applications"),
        ("quality/refactor-expert.md", "refactor-expert", "Refactors tangled modules"),
        ("quality/performance-tuner.md", "performance-tuner", "Finds performance bottlenecks"),
        ("architecture/system-architect.md", "system-architect", "Plans system architecture"),
        ("ui/ux-designer.md", "ux-designer", "Designs colour palettes and layouts"),
        ("devops/monitoring-specialist.md", "monitoring-specialist", "Sets up monitoring and alerting"),
        ("backend/queue-engineer.md", "queue-engineer", "Builds event queues"),
        ("general/prompt-engineer.md", "prompt-engineer", "Crafts LLM prompts"),
        ("general/incident-responder.md", "incident-responder", "Leads incident response"),
        ("general/seo-specialist.md", "seo-specialist", "Improves search ranking"),
        ("general/payment-integrator.md", "payment-integrator", "Integrates payment providers"),
    ];
    for (relative, name, description) in agents {
        project.agent(relative, name, description);
    }
}
