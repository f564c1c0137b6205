//! End-to-end selection over on-disk agent catalogs

mod common;

use agentrank_core::error::{AgentRankError, Result};
use agentrank_core::{
    AgentRankConfig, AgentSelector, EmbeddingProvider, HistoryRecord, InMemoryHistoryStore, ProjectProfile,
    ProjectProfileSource, ProjectType, SelectionOptions, StaticProfileSource, Vocabulary,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{failing_provider, hashing_provider, twenty_agent_catalog, TestProject};
use std::path::Path;
use std::sync::Arc;

const SECURITY_TASK: &str = "Please audit this code for security vulnerabilities";

fn all_candidates() -> SelectionOptions {
    SelectionOptions {
        max_agents: 20,
        min_score: 0,
        ..Default::default()
    }
}

struct BrokenProfiles;

#[async_trait]
impl ProjectProfileSource for BrokenProfiles {
    async fn profile(&self, _project_root: &Path) -> Result<ProjectProfile> {
        Err(AgentRankError::Profile("detector crashed".to_string()))
    }
}

#[tokio::test]
async fn test_security_auditor_ranks_first_among_twenty() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .build();
    let result = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();

    assert_eq!(result.total_candidates, 20);
    let top = &result.agents[0];
    assert_eq!(top.agent.name, "security-auditor");
    assert!(top.breakdown.keyword_match >= 16);
    assert!(top
        .breakdown
        .matched_keywords
        .iter()
        .any(|k| k == "security"));

    let auditor_rank = result
        .agents
        .iter()
        .position(|a| a.agent.name == "security-auditor");
    let frontend_rank = result
        .agents
        .iter()
        .position(|a| a.agent.name == "frontend-developer");
    match (auditor_rank, frontend_rank) {
        (Some(a), Some(f)) => assert!(a < f),
        (Some(_), None) => {}
        other => panic!("unexpected ranking: {:?}", other),
    }
}

#[tokio::test]
async fn test_null_task_embedding_falls_back_to_keywords() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(failing_provider())
        .build();
    let result = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();

    assert!(!result.used_semantic_matching);
    assert!(!result.agents.is_empty());
    assert!(result.agents.iter().all(|a| a.breakdown.semantic_match == 0));
    assert!(result.agents.iter().all(|a| a.breakdown.similarity.is_none()));
    assert_eq!(result.agents[0].agent.name, "security-auditor");
}

#[tokio::test]
async fn test_semantic_matching_active_with_backend() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(hashing_provider())
        .build();
    let result = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();

    assert!(result.used_semantic_matching);
    let auditor = result
        .agents
        .iter()
        .find(|a| a.agent.name == "security-auditor")
        .unwrap();
    assert!(auditor.breakdown.similarity.unwrap() > 0.25);
    assert!(auditor.breakdown.semantic_match > 0);
}

#[tokio::test]
async fn test_results_respect_threshold_and_limit() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .profile_source(Arc::new(StaticProfileSource::new(ProjectProfile::new(
            ["react", "docker", "kubernetes", "postgres"],
            Some(ProjectType::Fullstack),
        ))))
        .build();

    let everything = selector
        .select("deploy the api and database services", &all_candidates())
        .await
        .unwrap();

    let options = SelectionOptions {
        max_agents: 2,
        min_score: 15,
        ..Default::default()
    };
    let limited = selector
        .select("deploy the api and database services", &options)
        .await
        .unwrap();

    assert!(!limited.agents.is_empty());
    assert!(limited.agents.len() <= 2);
    assert!(limited.agents.iter().all(|a| a.score >= 15));

    // Nothing left out ranks above anything kept
    let lowest_kept = limited.agents.iter().map(|a| a.score).min().unwrap();
    let kept: Vec<&str> = limited.agents.iter().map(|a| a.agent.name.as_str()).collect();
    assert!(everything
        .agents
        .iter()
        .filter(|a| !kept.contains(&a.agent.name.as_str()))
        .all(|a| a.score <= lowest_kept));

    // Sorted descending
    assert!(everything.agents.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_duplicate_names_keep_best_entry() {
    let project = TestProject::new();
    project
        .agent(
            "core/reviewer.md",
            "code-reviewer",
            "Reviews pull requests for security and performance",
        )
        .agent("extras/reviewer.md", "code-reviewer", "Reviews pull requests");

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .build();
    let result = selector
        .select("review security and performance", &all_candidates())
        .await
        .unwrap();

    let reviewers: Vec<_> = result
        .agents
        .iter()
        .filter(|a| a.agent.name == "code-reviewer")
        .collect();
    assert_eq!(result.total_candidates, 2);
    assert_eq!(reviewers.len(), 1);
    assert_eq!(reviewers[0].agent.plugin_id, "core");
}

#[tokio::test]
async fn test_selection_is_deterministic() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(hashing_provider())
        .build();

    let first = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();
    let second = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();

    let breakdowns = |r: &agentrank_core::SelectionResult| {
        r.agents
            .iter()
            .map(|a| (a.agent.name.clone(), a.breakdown.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(breakdowns(&first), breakdowns(&second));
}

#[tokio::test]
async fn test_history_and_feature_boost() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let now = Utc::now();
    let store = InMemoryHistoryStore::default();
    for days_ago in 0..6 {
        store.append(HistoryRecord::agent_run(
            "myapp",
            "docs-writer",
            &["onboarding"],
            now - Duration::days(days_ago),
        ));
    }
    // Other projects never count
    store.append(HistoryRecord::agent_run("other", "seo-specialist", &[], now));

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .history_store(Arc::new(store))
        .build();

    let options = SelectionOptions {
        feature: Some("Onboarding".to_string()),
        ..all_candidates()
    };
    let result = selector.select("write the guides", &options).await.unwrap();

    let docs = result
        .agents
        .iter()
        .find(|a| a.agent.name == "docs-writer")
        .unwrap();
    // score round(0.6 * 60 + 0.3 * 40) = 48, x1.1 = 53; 53 * 0.15 + 5 = 12.95
    assert_eq!(docs.breakdown.history_boost, 13);
    assert_eq!(docs.breakdown.freshness_bonus, 10);

    assert!(result
        .agents
        .iter()
        .filter(|a| a.agent.name == "seo-specialist")
        .all(|a| a.breakdown.history_boost == 0));
}

#[tokio::test]
async fn test_profile_failure_degrades_to_empty_profile() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .profile_source(Arc::new(BrokenProfiles))
        .build();
    let result = selector.select(SECURITY_TASK, &all_candidates()).await.unwrap();

    assert_eq!(result.profile, ProjectProfile::default());
    assert!(result.agents.iter().all(|a| a.breakdown.context_boost == 0));
}

#[tokio::test]
async fn test_class_does_not_match_as_keyword() {
    let project = TestProject::new();
    project.agent("general/aliaser.md", "aliaser", "Renames imports as aliases");

    // Vocabulary that extracts "as" and filters no stopwords
    let vocabulary = Vocabulary::from_tables(&["as", "imports"], &[], &[], &[], &[], &[]).unwrap();
    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .vocabulary(Arc::new(vocabulary))
        .build();

    let index = selector.load_index(false).await.unwrap();
    assert_eq!(index.agents[0].keywords, vec!["as", "imports"]);

    let result = selector
        .select("Refactor this class", &all_candidates())
        .await
        .unwrap();
    assert_eq!(result.agents.len(), 1);
    assert_eq!(result.agents[0].breakdown.keyword_match, 0);
    assert!(result.agents[0].breakdown.matched_keywords.is_empty());
}

#[tokio::test]
async fn test_quick_select_over_catalog() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .build();
    let matches = selector.quick_select(SECURITY_TASK, 3).await.unwrap();

    assert!(!matches.is_empty());
    assert!(matches.len() <= 3);
    assert_eq!(matches[0].agent.name, "security-auditor");
    assert!(matches.iter().all(|m| m.score > 0));
}

#[tokio::test]
async fn test_missing_agents_dir_is_an_error() {
    let project = TestProject::new();
    let selector = AgentSelector::builder(&project.root, project.root.join("missing"))
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .build();

    let err = selector
        .select(SECURITY_TASK, &SelectionOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentRankError::SourceUnavailable { .. }));
}

#[tokio::test]
async fn test_oversized_history_window_does_not_panic() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let store = InMemoryHistoryStore::default();
    store.append(HistoryRecord::agent_run(
        "myapp",
        "docs-writer",
        &[],
        Utc::now() - Duration::days(3650),
    ));

    let mut config = AgentRankConfig::default();
    config.history.recent_window_days = 1_000_000_000;
    assert!(config.validate().is_err());

    // Unvalidated configs handed straight to the builder still select
    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .config(config)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .history_store(Arc::new(store))
        .build();
    let result = selector.select("write the guides", &all_candidates()).await.unwrap();

    let docs = result
        .agents
        .iter()
        .find(|a| a.agent.name == "docs-writer")
        .unwrap();
    // The single use counts as recent under a window that covers all time
    assert_eq!(docs.breakdown.freshness_bonus, 4);
}
