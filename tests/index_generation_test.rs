//! Two-phase capability index generation against real directories

mod common;

use agentrank_core::{
    AgentSelector, CapabilitiesIndex, EmbeddingProvider, GenerationOutcome, SelectionOptions,
    INDEX_VERSION,
};
use common::{
    fast_config, failing_provider, hashing_provider, stalled_provider, twenty_agent_catalog, TestProject,
};
use std::fs;
use std::sync::Arc;

fn read_index(project: &TestProject) -> CapabilitiesIndex {
    let raw = fs::read_to_string(project.index_path()).expect("index file should exist");
    serde_json::from_str(&raw).expect("index file should parse")
}

#[tokio::test]
async fn test_keyword_phase_then_embeddings_written() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(hashing_provider())
        .config(fast_config())
        .build();

    let index = selector.load_index(false).await.unwrap();
    assert_eq!(index.version, INDEX_VERSION);
    assert_eq!(index.total_agents, 20);
    assert_eq!(index.embedded_count(), 0);
    assert_eq!(index.agents_path, project.agents_dir.display().to_string());

    let outcome = selector.wait_for_embeddings().await.unwrap();
    assert_eq!(
        outcome,
        GenerationOutcome::Completed {
            embedded: 20,
            failed: 0,
            written: true
        }
    );

    let on_disk = read_index(&project);
    assert_eq!(on_disk.embedded_count(), 20);
    assert!(!selector.index_store().is_generation_in_progress());

    // The persisted contract uses camelCase field names
    let raw = fs::read_to_string(project.index_path()).unwrap();
    assert!(raw.contains("\"generatedAt\""));
    assert!(raw.contains("\"totalAgents\""));
    assert!(raw.contains("\"agentsPath\""));
}

#[tokio::test]
async fn test_concurrent_triggers_share_one_job() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(stalled_provider())
        .config(fast_config())
        .build();
    let store = selector.index_store();

    let index = selector.load_index(false).await.unwrap();
    assert!(store.is_generation_in_progress());

    let (first, second) = tokio::join!(
        async { store.schedule_embedding_generation(index.clone()) },
        async { store.schedule_embedding_generation(index.clone()) },
    );
    assert_eq!(first, second);
    assert!(!first.is_finished());

    // The stalled backend gives up after the configured ready timeout
    let outcome = first.wait().await;
    assert_eq!(outcome, GenerationOutcome::BackendUnavailable);
    assert!(second.is_finished());
}

#[tokio::test]
async fn test_unavailable_backend_leaves_index_unchanged() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(failing_provider())
        .config(fast_config())
        .build();

    selector.load_index(false).await.unwrap();
    let before = fs::read(project.index_path()).unwrap();

    assert_eq!(
        selector.wait_for_embeddings().await,
        Some(GenerationOutcome::BackendUnavailable)
    );
    let after = fs::read(project.index_path()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_version_mismatch_regenerates() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .config(fast_config())
        .build();
    selector.load_index(false).await.unwrap();

    let mut stale = read_index(&project);
    stale.version = "1.0.0".to_string();
    stale.agents.truncate(1);
    stale.total_agents = 1;
    fs::write(project.index_path(), serde_json::to_vec(&stale).unwrap()).unwrap();

    let reloaded = selector.load_index(false).await.unwrap();
    assert_eq!(reloaded.version, INDEX_VERSION);
    assert_eq!(reloaded.total_agents, 20);
}

#[tokio::test]
async fn test_cached_index_is_reused_until_forced() {
    let project = TestProject::new();
    project.agent("security/auditor.md", "security-auditor", "Audits code for security flaws");

    let selector = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(Arc::new(EmbeddingProvider::disabled()))
        .config(fast_config())
        .build();
    let first = selector.load_index(false).await.unwrap();

    // New files are only picked up by a rebuild
    project.agent("testing/tester.md", "test-writer", "Writes tests");
    let cached = selector.load_index(false).await.unwrap();
    assert_eq!(cached, first);

    let rebuilt = selector.load_index(true).await.unwrap();
    assert_eq!(rebuilt.total_agents, 2);
}

#[tokio::test]
async fn test_precomputed_embeddings_feed_scoring() {
    let project = TestProject::new();
    twenty_agent_catalog(&project);

    let writer = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(hashing_provider())
        .config(fast_config())
        .build();
    writer.load_index(false).await.unwrap();
    writer.wait_for_embeddings().await;

    // A fresh process with a cold cache still scores semantically from the index
    let reader = AgentSelector::builder(&project.root, &project.agents_dir)
        .provider(hashing_provider())
        .config(fast_config())
        .build();
    let result = reader
        .select(
            "Please audit this code for security vulnerabilities",
            &SelectionOptions {
                max_agents: 20,
                min_score: 0,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(result.used_semantic_matching);
    assert_eq!(result.agents.len(), 20);
    assert!(reader.provider().cache().is_empty());
    assert!(!reader.index_store().is_generation_in_progress());
    assert!(result.agents.iter().all(|a| a.breakdown.similarity.is_some()));
}
