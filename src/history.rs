//! Agent usage history
//!
//! Usage records live in an external tagged record store. Every record of an
//! agent run carries the bare tag `agent`, one `agent:<name>` tag and any
//! number of `feature:<name>` tags. [`HistoryTracker`] reads those records and
//! aggregates them into [`AgentSuccessHistory`] entries; it never writes.

use crate::error::{AgentRankError, Result};
use crate::types::{AgentSuccessHistory, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tag present on every agent usage record
pub const AGENT_TAG: &str = "agent";

/// Prefix of the agent-identifying tag
pub const AGENT_TAG_PREFIX: &str = "agent:";

/// Prefix of feature tags
pub const FEATURE_TAG_PREFIX: &str = "feature:";

/// Days a use counts as recent
pub const DEFAULT_RECENT_WINDOW_DAYS: i64 = 30;

/// One entry of the external record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub project: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
}

impl HistoryRecord {
    /// Record of one agent run
    pub fn agent_run(project: &str, agent: &str, features: &[&str], at: DateTime<Utc>) -> Self {
        let mut tags = vec![AGENT_TAG.to_string(), format!("{}{}", AGENT_TAG_PREFIX, agent)];
        tags.extend(features.iter().map(|f| format!("{}{}", FEATURE_TAG_PREFIX, f)));
        Self {
            project: project.to_string(),
            tags,
            created_at: at,
            content: String::new(),
        }
    }

    fn agent_name(&self) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|t| t.strip_prefix(AGENT_TAG_PREFIX))
            .filter(|name| !name.is_empty())
    }

    fn features(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter_map(|t| t.strip_prefix(FEATURE_TAG_PREFIX))
            .filter(|f| !f.is_empty())
    }
}

/// Query against the record store
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub project: String,

    /// Every tag must be present on a returned record
    pub tags: Vec<String>,

    pub range: TimeRange,
}

impl HistoryQuery {
    fn matches(&self, record: &HistoryRecord) -> bool {
        record.project == self.project
            && self.tags.iter().all(|t| record.tags.contains(t))
            && self.range.contains(record.created_at)
    }
}

/// External append-only tagged record store
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>>;
}

/// Store held in memory
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    records: parking_lot::RwLock<Vec<HistoryRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: parking_lot::RwLock::new(records),
        }
    }

    pub fn append(&self, record: HistoryRecord) {
        self.records.write().push(record);
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }
}

/// Store read from a JSON array of records on every query
#[derive(Debug, Clone)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
}

impl JsonFileHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn query(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AgentRankError::HistoryStore(format!("cannot read {:?}: {}", self.path, e))
        })?;
        let records: Vec<HistoryRecord> = serde_json::from_str(&raw)?;
        Ok(records.into_iter().filter(|r| query.matches(r)).collect())
    }
}

/// `round(min(recent/10, 1) * 60 + min(total/20, 1) * 40)`
pub fn success_score(recent_uses: u32, total_uses: u32) -> u32 {
    let recent = (recent_uses as f64 / 10.0).min(1.0) * 60.0;
    let total = (total_uses as f64 / 20.0).min(1.0) * 40.0;
    (recent + total).round() as u32
}

/// Apply the x1.1 feature affinity multiplier, capped at 100
pub fn with_feature_affinity(score: u32) -> u32 {
    ((score as f64 * 1.1).round() as u32).min(100)
}

/// Aggregates usage records into per-agent statistics
#[derive(Clone)]
pub struct HistoryTracker {
    store: Arc<dyn HistoryStore>,
    recent_window: Duration,
}

impl HistoryTracker {
    /// Windows chrono cannot represent fall back to the default 30 days
    pub fn new(store: Arc<dyn HistoryStore>, recent_window_days: i64) -> Self {
        let recent_window = Duration::try_days(recent_window_days)
            .filter(|window| *window >= Duration::zero())
            .unwrap_or_else(|| {
                warn!(
                    "Invalid history window of {} days, using {}",
                    recent_window_days, DEFAULT_RECENT_WINDOW_DAYS
                );
                Duration::days(DEFAULT_RECENT_WINDOW_DAYS)
            });
        Self {
            store,
            recent_window,
        }
    }

    /// Per-agent history for a project; empty on any storage failure
    pub async fn agent_history(
        &self,
        project: &str,
        feature: Option<&str>,
        range: TimeRange,
    ) -> HashMap<String, AgentSuccessHistory> {
        let query = HistoryQuery {
            project: project.to_string(),
            tags: vec![AGENT_TAG.to_string()],
            range,
        };

        match self.store.query(&query).await {
            Ok(records) => self.aggregate(&records, feature, Utc::now()),
            Err(e) => {
                debug!("History unavailable for project {}: {}", project, e);
                HashMap::new()
            }
        }
    }

    /// Fold records into statistics relative to `now`
    pub fn aggregate(
        &self,
        records: &[HistoryRecord],
        feature: Option<&str>,
        now: DateTime<Utc>,
    ) -> HashMap<String, AgentSuccessHistory> {
        struct Tally {
            total: u32,
            recent: u32,
            features: BTreeSet<String>,
        }

        // A window reaching past the earliest representable time counts everything
        let recent_cutoff = now
            .checked_sub_signed(self.recent_window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut tallies: HashMap<String, Tally> = HashMap::new();

        for record in records {
            let Some(agent) = record.agent_name() else {
                continue;
            };
            let tally = tallies.entry(agent.to_string()).or_insert_with(|| Tally {
                total: 0,
                recent: 0,
                features: BTreeSet::new(),
            });
            tally.total += 1;
            if record.created_at >= recent_cutoff {
                tally.recent += 1;
            }
            tally.features.extend(record.features().map(str::to_string));
        }

        let wanted = feature.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty());

        tallies
            .into_iter()
            .map(|(agent_name, tally)| {
                let feature_matched = wanted.as_ref().map_or(false, |wanted| {
                    tally.features.iter().any(|f| f.to_lowercase() == *wanted)
                });

                let mut score = success_score(tally.recent, tally.total);
                if feature_matched {
                    score = with_feature_affinity(score);
                }

                let history = AgentSuccessHistory {
                    agent_name: agent_name.clone(),
                    total_uses: tally.total,
                    recent_uses: tally.recent,
                    features: tally.features.into_iter().collect(),
                    success_score: score,
                    feature_matched,
                };
                (agent_name, history)
            })
            .collect()
    }
}
