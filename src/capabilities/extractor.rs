//! Capability extraction
//!
//! Turns an agent definition into a [`CapabilityRecord`]: domain keywords,
//! technology tags and project-type affinities. Pure and deterministic; output
//! order follows vocabulary order.

use crate::types::{AgentDefinition, CapabilityRecord, ProjectType};
use crate::vocabulary::Vocabulary;
use std::sync::Arc;

/// Extracted capabilities of one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCapabilities {
    pub keywords: Vec<String>,
    pub tech_stack: Vec<String>,
    pub project_types: Vec<ProjectType>,
}

/// Stateless extractor over an injected vocabulary
#[derive(Debug, Clone)]
pub struct CapabilityExtractor {
    vocabulary: Arc<Vocabulary>,
}

impl Default for CapabilityExtractor {
    fn default() -> Self {
        Self::new(Vocabulary::standard())
    }
}

impl CapabilityExtractor {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Extract from the description and body of an agent
    pub fn extract(&self, category: &str, description: &str, body: &str) -> ExtractedCapabilities {
        let text = format!("{} {}", description, body).to_lowercase();

        ExtractedCapabilities {
            keywords: self.extract_keywords(&text),
            tech_stack: self.extract_tech_stack(&text),
            project_types: self.extract_project_types(category, &text),
        }
    }

    /// Build the capability record for a raw definition
    pub fn record_for(&self, agent: &AgentDefinition) -> CapabilityRecord {
        let extracted = self.extract(&agent.category, &agent.description, &agent.body);

        CapabilityRecord {
            name: agent.name.clone(),
            description: agent.description.clone(),
            category: agent.category.clone(),
            plugin_id: agent.plugin_id.clone(),
            keywords: extracted.keywords,
            tech_stack: extracted.tech_stack,
            project_types: extracted.project_types,
            model: agent.model.clone(),
            file_path: agent.file_path.clone(),
            embedding: None,
        }
    }

    fn extract_keywords(&self, text: &str) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        for keyword in &self.vocabulary.domain_keywords {
            if text.contains(keyword.as_str()) && !keywords.contains(keyword) {
                keywords.push(keyword.clone());
            }
        }
        keywords
    }

    fn extract_tech_stack(&self, text: &str) -> Vec<String> {
        self.vocabulary
            .tech_patterns
            .iter()
            .filter(|tech| tech.pattern.is_match(text))
            .map(|tech| tech.name.clone())
            .collect()
    }

    fn extract_project_types(&self, category: &str, text: &str) -> Vec<ProjectType> {
        let mut types: Vec<ProjectType> = self.vocabulary.project_types_for(category).to_vec();

        let mentions = |phrases: &[String]| phrases.iter().any(|p| text.contains(p.as_str()));

        if mentions(&self.vocabulary.monorepo_indicators) && !types.contains(&ProjectType::Monorepo)
        {
            types.push(ProjectType::Monorepo);
        }
        if mentions(&self.vocabulary.fullstack_indicators)
            && !types.contains(&ProjectType::Fullstack)
        {
            types.push(ProjectType::Fullstack);
        }

        types
    }
}
