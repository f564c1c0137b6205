//! Capability index store
//!
//! The index is built in two phases. [`CapabilityIndexStore::build`] extracts
//! keyword/tech records, writes them and returns at once, so keyword matching
//! works before any model is loaded. It then schedules a single background
//! job that embeds every record and rewrites the index in place.
//!
//! At most one job runs per store. Scheduling while a job is running returns
//! the running job's [`GenerationHandle`]. The index file is always replaced
//! by rename, so readers never observe a partial write. Builds and job writes
//! share one write lock, so a job's read-merge-write never straddles a build.

use crate::capabilities::{AgentSource, CapabilityExtractor};
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::types::{CapabilitiesIndex, CapabilityRecord};
use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

/// Bumped whenever the record layout or extraction rules change
pub const INDEX_VERSION: &str = "2.0.0";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// How a background embedding job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Backend never became ready; the keyword-only index was kept
    BackendUnavailable,

    Completed {
        embedded: usize,
        failed: usize,
        /// False when nothing was embedded or the write failed
        written: bool,
    },

    /// The job stopped before reporting
    Aborted,
}

/// Shared completion handle of one background job
#[derive(Debug, Clone)]
pub struct GenerationHandle {
    id: u64,
    outcome: watch::Receiver<Option<GenerationOutcome>>,
}

impl PartialEq for GenerationHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenerationHandle {}

impl GenerationHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Wait for the job to finish
    pub async fn wait(&self) -> GenerationOutcome {
        let mut rx = self.outcome.clone();
        let outcome = rx.wait_for(|o| o.is_some()).await.ok().and_then(|o| o.clone());
        outcome.unwrap_or(GenerationOutcome::Aborted)
    }
}

/// Publishes the outcome; reports `Aborted` if dropped without one
struct Completion {
    tx: watch::Sender<Option<GenerationOutcome>>,
}

impl Completion {
    fn finish(&self, outcome: GenerationOutcome) {
        self.tx.send_replace(Some(outcome));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.tx.borrow().is_none() {
            self.tx.send_replace(Some(GenerationOutcome::Aborted));
        }
    }
}

/// Builds, persists and caches the capability index of one project
pub struct CapabilityIndexStore {
    index_path: PathBuf,
    source: Arc<dyn AgentSource>,
    extractor: CapabilityExtractor,
    provider: Arc<EmbeddingProvider>,
    batch_size: usize,
    ready_timeout: Duration,
    generation: Mutex<Option<GenerationHandle>>,
    next_job_id: AtomicU64,
    write_lock: Arc<AsyncMutex<()>>,
}

impl CapabilityIndexStore {
    pub fn new(
        index_path: PathBuf,
        source: Arc<dyn AgentSource>,
        extractor: CapabilityExtractor,
        provider: Arc<EmbeddingProvider>,
    ) -> Self {
        Self {
            index_path,
            source,
            extractor,
            provider,
            batch_size: 10,
            ready_timeout: Duration::from_secs(30),
            generation: Mutex::new(None),
            next_job_id: AtomicU64::new(1),
            write_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Records embedded concurrently per batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// How long the background job waits for the backend
    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Cached index when current, otherwise a fresh build
    pub async fn load(&self, source_path: &Path, force_regenerate: bool) -> Result<CapabilitiesIndex> {
        if force_regenerate {
            info!("Regenerating capability index (forced)");
            return self.build(source_path).await;
        }

        match read_index(&self.index_path).await {
            Some(index) if is_current(&index, source_path) => {
                debug!(
                    "Using cached capability index: {} agents, {} embedded",
                    index.total_agents,
                    index.embedded_count()
                );
                if index.embedded_count() == 0 && !self.provider.is_unavailable() {
                    self.schedule_embedding_generation(index.clone());
                }
                Ok(index)
            }
            Some(index) => {
                info!(
                    "Capability index is stale (version {}, path {}), regenerating",
                    index.version, index.agents_path
                );
                self.build(source_path).await
            }
            None => self.build(source_path).await,
        }
    }

    /// Keyword-phase build: extract, persist, return, then schedule embeddings
    pub async fn build(&self, source_path: &Path) -> Result<CapabilitiesIndex> {
        let definitions = self.source.load_agents(source_path).await?;

        let agents: Vec<CapabilityRecord> = definitions
            .iter()
            .map(|definition| self.extractor.record_for(definition))
            .collect();

        let index = CapabilitiesIndex {
            version: INDEX_VERSION.to_string(),
            generated_at: Utc::now(),
            agents_path: source_key(source_path),
            total_agents: agents.len(),
            agents,
        };

        {
            let _guard = self.write_lock.lock().await;
            write_index(&self.index_path, &index).await?;
        }
        info!(
            "Wrote capability index with {} agents to {:?}",
            index.total_agents, self.index_path
        );

        if !index.agents.is_empty() {
            self.schedule_embedding_generation(index.clone());
        }

        Ok(index)
    }

    /// Start the background embedding job unless one is already running
    pub fn schedule_embedding_generation(&self, snapshot: CapabilitiesIndex) -> GenerationHandle {
        let mut slot = self.generation.lock();
        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                debug!("Embedding generation already running (job {})", handle.id());
                return handle.clone();
            }
        }

        let id = self.next_job_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = watch::channel(None);
        let handle = GenerationHandle { id, outcome: rx };

        let job = EmbeddingJob {
            index_path: self.index_path.clone(),
            provider: Arc::clone(&self.provider),
            batch_size: self.batch_size,
            ready_timeout: self.ready_timeout,
            write_lock: Arc::clone(&self.write_lock),
            snapshot,
        };

        debug!("Scheduling embedding generation job {}", id);
        tokio::spawn(async move {
            let completion = Completion { tx };
            let outcome = job.run().await;
            completion.finish(outcome);
        });

        *slot = Some(handle.clone());
        handle
    }

    pub fn is_generation_in_progress(&self) -> bool {
        self.generation
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Wait for the current or last job; `None` if none was ever scheduled
    pub async fn wait_for_generation(&self) -> Option<GenerationOutcome> {
        let handle = self.generation.lock().clone()?;
        Some(handle.wait().await)
    }
}

/// Background embedding pass over one index snapshot
struct EmbeddingJob {
    index_path: PathBuf,
    provider: Arc<EmbeddingProvider>,
    batch_size: usize,
    ready_timeout: Duration,
    write_lock: Arc<AsyncMutex<()>>,
    snapshot: CapabilitiesIndex,
}

impl EmbeddingJob {
    async fn run(mut self) -> GenerationOutcome {
        if !self.provider.wait_until_ready(self.ready_timeout).await {
            info!(
                "Embedding backend not available after {:?}, keeping keyword-only index",
                self.ready_timeout
            );
            return GenerationOutcome::BackendUnavailable;
        }

        let mut embedded = 0;
        let mut failed = 0;

        for batch in self.snapshot.agents.chunks_mut(self.batch_size) {
            let items: Vec<(String, String)> = batch
                .iter()
                .map(|record| (record.name.clone(), record.embedding_text()))
                .collect();
            let keyed: Vec<(&str, &str)> = items
                .iter()
                .map(|(name, text)| (name.as_str(), text.as_str()))
                .collect();

            let vectors = match AssertUnwindSafe(self.provider.get_embeddings(&keyed))
                .catch_unwind()
                .await
            {
                Ok(vectors) => vectors,
                Err(_) => {
                    warn!("Embedding batch of {} agents panicked, skipping it", batch.len());
                    failed += batch.len();
                    continue;
                }
            };

            for (record, vector) in batch.iter_mut().zip(vectors) {
                match vector {
                    Some(vector) => {
                        record.embedding = Some(vector.as_ref().clone());
                        embedded += 1;
                    }
                    None => {
                        debug!("No embedding for agent {}", record.name);
                        failed += 1;
                    }
                }
            }
        }

        if embedded == 0 {
            info!("No embeddings computed ({} failed), index left unchanged", failed);
            return GenerationOutcome::Completed {
                embedded,
                failed,
                written: false,
            };
        }

        let index_path = self.index_path.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let _guard = write_lock.lock().await;
        let index = self.merge_into_latest().await;
        let written = match write_index(&index_path, &index).await {
            Ok(()) => {
                info!(
                    "Capability index updated with {} embeddings ({} failed)",
                    embedded, failed
                );
                true
            }
            Err(e) => {
                warn!("Failed to write embedded capability index: {}", e);
                false
            }
        };

        GenerationOutcome::Completed {
            embedded,
            failed,
            written,
        }
    }

    /// Attach computed vectors to the index on disk if it was rebuilt meanwhile
    async fn merge_into_latest(self) -> CapabilitiesIndex {
        let latest = match read_index(&self.index_path).await {
            Some(latest)
                if latest.generated_at != self.snapshot.generated_at
                    && latest.version == self.snapshot.version =>
            {
                latest
            }
            _ => return self.snapshot,
        };

        debug!("Index was rebuilt during embedding, merging vectors by agent");
        let vectors: HashMap<(String, String), Vec<f32>> = self
            .snapshot
            .agents
            .into_iter()
            .filter_map(|record| {
                let vector = record.embedding?;
                Some(((record.name, record.description), vector))
            })
            .collect();

        let mut merged = latest;
        for record in merged.agents.iter_mut().filter(|r| r.embedding.is_none()) {
            let key = (record.name.clone(), record.description.clone());
            if let Some(vector) = vectors.get(&key) {
                record.embedding = Some(vector.clone());
            }
        }
        merged
    }
}

fn source_key(source_path: &Path) -> String {
    source_path.display().to_string()
}

/// Version and source path both match, and there is something to use
fn is_current(index: &CapabilitiesIndex, source_path: &Path) -> bool {
    index.version == INDEX_VERSION
        && index.agents_path == source_key(source_path)
        && !index.agents.is_empty()
}

async fn read_index(path: &Path) -> Option<CapabilitiesIndex> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No readable capability index at {:?}: {}", path, e);
            return None;
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(index) => Some(index),
        Err(e) => {
            debug!("Ignoring unparsable capability index {:?}: {}", path, e);
            None
        }
    }
}

/// Write to a unique sibling temp file, then rename over the target
async fn write_index(path: &Path, index: &CapabilitiesIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(index)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("capabilities-index.json");
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
