//! agentrank - Explainable Agent Relevance Ranking
//!
//! Command-line front end: ranks the agents of a project for a task, runs the
//! cheap quick select, or builds the capability index ahead of time.

use agentrank_core::{
    AgentRankConfig, AgentSelector, EmbeddingProvider, GenerationOutcome, HistoryStore,
    InMemoryHistoryStore, JsonFileHistoryStore, ProjectProfile, ProjectType, SelectionResult,
    StaticProfileSource,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "agentrank")]
#[command(about = "Rank specialized agents by relevance to a task", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Project root holding the index directory
    #[arg(long, default_value = ".", env = "AGENTRANK_PROJECT_ROOT", global = true)]
    project_root: PathBuf,

    /// Directory with agent definitions (default: <project-root>/agents)
    #[arg(long, env = "AGENTRANK_AGENTS_DIR", global = true)]
    agents_dir: Option<PathBuf>,

    /// Config file (default: <project-root>/.agentrank/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable the embedding model and rank by keywords and context only
    #[arg(long, global = true)]
    no_semantic: bool,

    /// Print machine readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank agents for a task using every signal
    Select {
        /// Task description
        task: String,

        /// Maximum agents returned (default from config)
        #[arg(short, long)]
        max_agents: Option<usize>,

        /// Minimum score 0-100 (default from config)
        #[arg(long)]
        min_score: Option<u32>,

        /// Feature the task belongs to, for history affinity
        #[arg(short, long)]
        feature: Option<String>,

        /// JSON file with usage history records
        #[arg(long)]
        history: Option<PathBuf>,

        /// Project technology, repeatable
        #[arg(short, long = "tech")]
        tech: Vec<String>,

        /// Project type (monorepo, single, backend, frontend, fullstack)
        #[arg(long)]
        project_type: Option<ProjectType>,

        /// Rebuild the capability index
        #[arg(long)]
        force_regenerate: bool,

        /// Wait for background embeddings before exiting
        #[arg(long)]
        wait_for_embeddings: bool,
    },

    /// Cheap substring ranking without context or embeddings
    Quick {
        /// Task description
        task: String,

        /// Maximum agents returned
        #[arg(short = 'n', long, default_value = "5")]
        limit: usize,
    },

    /// Build or refresh the capability index
    Index {
        /// Rebuild even if the cached index is current
        #[arg(long)]
        force: bool,

        /// Wait for embeddings to be computed and written
        #[arg(long)]
        wait: bool,
    },
}

/// How long background work may run once a command has finished
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let runtime = build_runtime()?;
    let result = runtime.block_on(run(cli));

    // A model still loading on the blocking pool must not keep the process alive
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // ONNX Runtime is chatty at info
    let filter = EnvFilter::new(format!(
        "agentrank={level},agentrank_core={level},ort=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    debug!("agentrank v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| AgentRankConfig::default_path(&cli.project_root));
    let config = AgentRankConfig::load(Some(&config_path))
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let agents_dir = cli
        .agents_dir
        .clone()
        .unwrap_or_else(|| cli.project_root.join("agents"));

    let mut builder = AgentSelector::builder(cli.project_root.clone(), agents_dir).config(config);
    if cli.no_semantic {
        builder = builder.provider(Arc::new(EmbeddingProvider::disabled()));
    }

    match cli.command {
        Commands::Select {
            task,
            max_agents,
            min_score,
            feature,
            history,
            tech,
            project_type,
            force_regenerate,
            wait_for_embeddings,
        } => {
            let history_store: Arc<dyn HistoryStore> = match history {
                Some(path) => Arc::new(JsonFileHistoryStore::new(path)),
                None => Arc::new(InMemoryHistoryStore::default()),
            };
            let profile = ProjectProfile::new(tech, project_type);

            let selector = builder
                .history_store(history_store)
                .profile_source(Arc::new(StaticProfileSource::new(profile)))
                .build();

            let mut options = selector.default_options();
            if let Some(max_agents) = max_agents {
                options.max_agents = max_agents;
            }
            if let Some(min_score) = min_score {
                options.min_score = min_score;
            }
            options.feature = feature;
            options.force_regenerate = force_regenerate;

            let result = selector.select(&task, &options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_selection(&result);
            }

            if wait_for_embeddings {
                report_generation(selector.wait_for_embeddings().await);
            } else {
                report_deferred(&selector);
            }
        }
        Commands::Quick { task, limit } => {
            // Quick select never uses embeddings
            let selector = builder
                .provider(Arc::new(EmbeddingProvider::disabled()))
                .build();
            let matches = selector.quick_select(&task, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else if matches.is_empty() {
                println!("No matching agents");
            } else {
                for m in &matches {
                    println!("{:>4}  {} ({})", m.score, m.agent.name, m.agent.plugin_id);
                }
            }
        }
        Commands::Index { force, wait } => {
            let selector = builder.build();
            let index = selector.load_index(force).await?;

            info!(
                "Index at {:?}: {} agents, {} embedded",
                selector.index_store().index_path(),
                index.total_agents,
                index.embedded_count()
            );
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "indexPath": selector.index_store().index_path(),
                        "version": index.version,
                        "totalAgents": index.total_agents,
                        "embedded": index.embedded_count(),
                    })
                );
            } else {
                println!(
                    "{} agents indexed ({} with embeddings)",
                    index.total_agents,
                    index.embedded_count()
                );
            }

            if wait {
                report_generation(selector.wait_for_embeddings().await);
            } else {
                report_deferred(&selector);
            }
        }
    }

    Ok(())
}

fn print_selection(result: &SelectionResult) {
    if result.agents.is_empty() {
        println!(
            "No agents above the score threshold ({} candidates)",
            result.total_candidates
        );
        return;
    }

    for (rank, scored) in result.agents.iter().enumerate() {
        let b = &scored.breakdown;
        println!(
            "{}. {} [{}] score {}",
            rank + 1,
            scored.agent.name,
            scored.agent.plugin_id,
            scored.score
        );
        println!(
            "   keyword {} | semantic {} | context {} | history {} | freshness {}",
            b.keyword_match, b.semantic_match, b.context_boost, b.history_boost, b.freshness_bonus
        );
        if !b.matched_keywords.is_empty() {
            println!("   matched: {}", b.matched_keywords.join(", "));
        }
        if !b.matched_tech.is_empty() {
            println!("   tech: {}", b.matched_tech.join(", "));
        }
    }

    println!(
        "\n{} of {} candidates in {}ms (semantic matching {})",
        result.agents.len(),
        result.total_candidates,
        result.elapsed.as_millis(),
        if result.used_semantic_matching { "on" } else { "off" }
    );
}

fn report_deferred(selector: &AgentSelector) {
    if selector.index_store().is_generation_in_progress() {
        info!("Embedding generation deferred; run `agentrank index --wait` to store embeddings");
    }
}

fn report_generation(outcome: Option<GenerationOutcome>) {
    match outcome {
        Some(GenerationOutcome::Completed { embedded, failed, written }) => info!(
            "Embedding generation finished: {} embedded, {} failed, index {}",
            embedded,
            failed,
            if written { "updated" } else { "unchanged" }
        ),
        Some(GenerationOutcome::BackendUnavailable) => {
            info!("Embedding backend unavailable, index kept keyword-only")
        }
        Some(GenerationOutcome::Aborted) => info!("Embedding generation stopped early"),
        None => debug!("No embedding generation was scheduled"),
    }
}
