//! Agent definition sources
//!
//! The ranking core consumes raw definitions through [`AgentSource`]. The
//! default [`MarkdownAgentSource`] reads `*.md` files with optional YAML
//! frontmatter:
//!
//! ```text
//! ---
//! name: security-auditor
//! description: Audits code for vulnerabilities
//! category: security
//! model: sonnet
//! ---
//! You are a security auditor...
//! ```

use crate::error::{AgentRankError, Result};
use crate::types::AgentDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum description length taken from the body when frontmatter has none
const BODY_DESCRIPTION_CHARS: usize = 200;

/// Provider of raw agent definitions
#[async_trait]
pub trait AgentSource: Send + Sync {
    /// Load every definition found under `path`
    ///
    /// Fails only when `path` itself cannot be read.
    async fn load_agents(&self, path: &Path) -> Result<Vec<AgentDefinition>>;
}

/// Markdown-with-frontmatter agent directory reader
#[derive(Debug, Clone, Default)]
pub struct MarkdownAgentSource;

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    model: Option<String>,
    plugin: Option<String>,
}

#[async_trait]
impl AgentSource for MarkdownAgentSource {
    async fn load_agents(&self, path: &Path) -> Result<Vec<AgentDefinition>> {
        let root = path.to_path_buf();
        let agents = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .map_err(|e| AgentRankError::Other(format!("Task join error: {}", e)))??;

        info!("Loaded {} agent definitions from {:?}", agents.len(), path);
        Ok(agents)
    }
}

impl MarkdownAgentSource {
    pub fn new() -> Self {
        Self
    }

    fn scan(root: &Path) -> Result<Vec<AgentDefinition>> {
        // The root must be readable; anything below it is best-effort
        fs::read_dir(root).map_err(|source| AgentRankError::SourceUnavailable {
            path: root.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        Self::collect_markdown(root, &mut files);
        files.sort();

        let agents = files
            .iter()
            .filter_map(|file| match Self::parse_agent_file(root, file) {
                Ok(agent) => Some(agent),
                Err(e) => {
                    debug!("Skipping agent file {:?}: {}", file, e);
                    None
                }
            })
            .collect();

        Ok(agents)
    }

    /// Recursively collect .md files
    fn collect_markdown(dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read directory {:?}: {}", dir, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                Self::collect_markdown(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("md") {
                files.push(path);
            }
        }
    }

    /// Parse one agent file
    fn parse_agent_file(root: &Path, path: &Path) -> Result<AgentDefinition> {
        let content = fs::read_to_string(path)?;
        let (frontmatter, body) = split_frontmatter(&content);

        let meta = parse_frontmatter(frontmatter);

        let name = meta.name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string()
        });

        let category = meta.category.unwrap_or_else(|| {
            path.parent()
                .filter(|p| p != &root)
                .and_then(|p| p.file_name())
                .and_then(|s| s.to_str())
                .unwrap_or("general")
                .to_string()
        });

        let plugin_id = meta.plugin.unwrap_or_else(|| plugin_from_path(root, path));

        let description = match meta.description {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => first_paragraph(body),
        };

        Ok(AgentDefinition {
            name,
            description,
            category,
            plugin_id,
            file_path: path.to_path_buf(),
            model: meta.model,
            body: body.trim().to_string(),
        })
    }
}

/// Parse frontmatter as YAML, falling back to plain `key: value` lines
///
/// Hand-written agent files often carry unquoted colons in descriptions,
/// which strict YAML rejects.
fn parse_frontmatter(frontmatter: &str) -> Frontmatter {
    if frontmatter.trim().is_empty() {
        return Frontmatter::default();
    }

    match serde_yaml::from_str::<Frontmatter>(frontmatter) {
        Ok(meta) => meta,
        Err(e) => {
            debug!("Frontmatter is not valid YAML ({}), reading key/value lines", e);
            let mut meta = Frontmatter::default();
            for line in frontmatter.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    let value = value.trim().trim_matches('"').to_string();
                    match key.trim() {
                        "name" => meta.name = Some(value),
                        "description" => meta.description = Some(value),
                        "category" => meta.category = Some(value),
                        "model" => meta.model = Some(value),
                        "plugin" => meta.plugin = Some(value),
                        _ => {}
                    }
                }
            }
            meta
        }
    }
}

/// Split `---` delimited frontmatter from the body
fn split_frontmatter(content: &str) -> (&str, &str) {
    if content.starts_with("---") {
        let parts: Vec<&str> = content.splitn(3, "---").collect();
        if parts.len() >= 3 {
            return (parts[1], parts[2]);
        }
    }
    ("", content)
}

fn first_paragraph(body: &str) -> String {
    body.lines()
        .skip_while(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
        .take_while(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(BODY_DESCRIPTION_CHARS)
        .collect()
}

/// First directory below the root, or "local" for top-level files
fn plugin_from_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .ok()
        .and_then(|rel| {
            let mut components = rel.components();
            let first = components.next()?;
            // A bare file name has no plugin directory
            components.next()?;
            first.as_os_str().to_str().map(str::to_string)
        })
        .unwrap_or_else(|| "local".to_string())
}
