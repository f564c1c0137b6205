//! Static matching vocabularies
//!
//! Domain keywords, technology patterns, category affinities and stopwords are
//! plain immutable data. [`Vocabulary::standard`] returns the built-in tables
//! shared process-wide; callers that need different tables build their own
//! [`Vocabulary`] and inject it into the extractor and scorer.

use crate::error::Result;
use crate::types::ProjectType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

/// Domain keywords recognised in agent descriptions (substring match)
const DOMAIN_KEYWORDS: &[&str] = &[
    // Quality
    "security", "audit", "vulnerability", "performance", "optimization", "refactor",
    "review", "testing", "test", "debug", "lint", "accessibility",
    // Architecture
    "architecture", "design", "api", "microservice", "database", "schema", "migration",
    "cache", "queue", "event", "graphql", "rest",
    // Surfaces
    "frontend", "backend", "fullstack", "mobile", "ui", "ux", "cli",
    // Operations
    "deployment", "infrastructure", "devops", "ci/cd", "monitoring", "observability",
    "logging", "container", "cloud", "serverless",
    // Data and ML
    "data", "analytics", "machine learning", "ml", "ai", "llm", "prompt", "embedding",
    // Process
    "documentation", "docs", "planning", "incident", "compliance", "authentication",
    "authorization", "payment", "seo", "i18n",
];

/// Technology name and the pattern that detects it (lowercase input)
const TECH_PATTERNS: &[(&str, &str)] = &[
    ("typescript", r"\btypescript\b|\bts\b|\.tsx?\b"),
    ("javascript", r"\bjavascript\b|\bjs\b|\bnode(\.js|js)?\b"),
    ("python", r"\bpython\b|\bpy\b"),
    ("rust", r"\brust\b|\bcargo\b"),
    ("go", r"\bgolang\b|\bgo\s+(service|module|code)"),
    ("java", r"\bjava\b|\bspring\b"),
    ("react", r"\breact\b|\bjsx\b"),
    ("nextjs", r"\bnext\.?js\b"),
    ("vue", r"\bvue(\.js)?\b|\bnuxt\b"),
    ("svelte", r"\bsvelte(kit)?\b"),
    ("angular", r"\bangular\b"),
    ("django", r"\bdjango\b"),
    ("fastapi", r"\bfastapi\b"),
    ("express", r"\bexpress(\.js)?\b"),
    ("postgres", r"\bpostgres(ql)?\b"),
    ("mysql", r"\bmysql\b"),
    ("mongodb", r"\bmongo(db)?\b"),
    ("redis", r"\bredis\b"),
    ("sqlite", r"\bsqlite\b"),
    ("docker", r"\bdocker(file)?\b"),
    ("kubernetes", r"\bkubernetes\b|\bk8s\b|\bhelm\b"),
    ("terraform", r"\bterraform\b"),
    ("aws", r"\baws\b|\bamazon web services\b|\blambda\b"),
    ("gcp", r"\bgcp\b|\bgoogle cloud\b"),
    ("azure", r"\bazure\b"),
    ("graphql", r"\bgraphql\b"),
    ("tailwind", r"\btailwind(css)?\b"),
    ("jest", r"\bjest\b"),
    ("vitest", r"\bvitest\b"),
    ("pytest", r"\bpytest\b"),
    ("playwright", r"\bplaywright\b"),
];

/// Category and the project shapes its agents usually serve
const CATEGORY_PROJECT_TYPES: &[(&str, &[ProjectType])] = &[
    ("frontend", &[ProjectType::Frontend, ProjectType::Fullstack]),
    ("ui", &[ProjectType::Frontend, ProjectType::Fullstack]),
    ("mobile", &[ProjectType::Frontend]),
    ("backend", &[ProjectType::Backend, ProjectType::Fullstack]),
    ("api", &[ProjectType::Backend, ProjectType::Fullstack]),
    ("database", &[ProjectType::Backend, ProjectType::Fullstack]),
    ("data", &[ProjectType::Backend]),
    ("infrastructure", &[ProjectType::Backend, ProjectType::Monorepo]),
    ("devops", &[ProjectType::Backend, ProjectType::Monorepo]),
    ("security", &[ProjectType::Backend, ProjectType::Frontend, ProjectType::Fullstack]),
    ("quality", &[ProjectType::Single, ProjectType::Fullstack]),
    ("testing", &[ProjectType::Single, ProjectType::Fullstack]),
    ("architecture", &[ProjectType::Monorepo, ProjectType::Fullstack]),
    ("general", &[ProjectType::Single]),
];

const MONOREPO_INDICATORS: &[&str] = &[
    "monorepo", "mono-repo", "workspaces", "turborepo", "nx workspace", "lerna",
    "pnpm workspace", "multiple packages",
];

const FULLSTACK_INDICATORS: &[&str] = &[
    "fullstack", "full-stack", "full stack", "end-to-end", "frontend and backend",
    "client and server",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can", "code",
    "do", "does", "for", "from", "has", "have", "help", "how", "i", "in", "into", "is",
    "it", "its", "me", "my", "need", "of", "on", "or", "our", "please", "should", "so",
    "that", "the", "their", "them", "then", "there", "these", "this", "to", "use", "using",
    "want", "was", "we", "what", "when", "where", "which", "while", "who", "will", "with",
    "you", "your", "agent", "expert", "specialist", "tasks", "task", "work", "all", "also",
    "other", "such", "more", "most", "like", "make", "new", "get",
];

static STANDARD: Lazy<Arc<Vocabulary>> = Lazy::new(|| {
    let vocabulary = Vocabulary::from_tables(
        DOMAIN_KEYWORDS,
        TECH_PATTERNS,
        CATEGORY_PROJECT_TYPES,
        MONOREPO_INDICATORS,
        FULLSTACK_INDICATORS,
        STOPWORDS,
    )
    .unwrap_or_else(|e| {
        error!("Built-in vocabulary failed to compile, capability extraction is disabled: {}", e);
        Vocabulary::empty()
    });
    Arc::new(vocabulary)
});

/// A technology and its compiled detector
#[derive(Debug, Clone)]
pub struct TechPattern {
    pub name: String,
    pub pattern: Regex,
}

/// Immutable matching tables
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub domain_keywords: Vec<String>,
    pub tech_patterns: Vec<TechPattern>,
    pub category_project_types: Vec<(String, Vec<ProjectType>)>,
    pub monorepo_indicators: Vec<String>,
    pub fullstack_indicators: Vec<String>,
    stopwords: HashSet<String>,
}

impl Vocabulary {
    /// Built-in tables, shared
    pub fn standard() -> Arc<Vocabulary> {
        Arc::clone(&STANDARD)
    }

    /// Build a vocabulary from raw tables, compiling the tech patterns
    pub fn from_tables(
        domain_keywords: &[&str],
        tech_patterns: &[(&str, &str)],
        category_project_types: &[(&str, &[ProjectType])],
        monorepo_indicators: &[&str],
        fullstack_indicators: &[&str],
        stopwords: &[&str],
    ) -> Result<Self> {
        let tech_patterns = tech_patterns
            .iter()
            .map(|(name, pattern)| {
                Ok(TechPattern {
                    name: name.to_string(),
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            domain_keywords: lowercase_all(domain_keywords),
            tech_patterns,
            category_project_types: category_project_types
                .iter()
                .map(|(category, types)| (category.to_lowercase(), types.to_vec()))
                .collect(),
            monorepo_indicators: lowercase_all(monorepo_indicators),
            fullstack_indicators: lowercase_all(fullstack_indicators),
            stopwords: lowercase_all(stopwords).into_iter().collect(),
        })
    }

    /// Vocabulary that extracts nothing and filters nothing
    pub fn empty() -> Self {
        Self {
            domain_keywords: Vec::new(),
            tech_patterns: Vec::new(),
            category_project_types: Vec::new(),
            monorepo_indicators: Vec::new(),
            fullstack_indicators: Vec::new(),
            stopwords: HashSet::new(),
        }
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Project types mapped from a category, empty when unknown
    pub fn project_types_for(&self, category: &str) -> &[ProjectType] {
        let category = category.trim().to_lowercase();
        self.category_project_types
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, types)| types.as_slice())
            .unwrap_or(&[])
    }
}

fn lowercase_all(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns_compile() {
        let vocab = Vocabulary::from_tables(
            DOMAIN_KEYWORDS,
            TECH_PATTERNS,
            CATEGORY_PROJECT_TYPES,
            MONOREPO_INDICATORS,
            FULLSTACK_INDICATORS,
            STOPWORDS,
        )
        .unwrap();
        assert_eq!(vocab.tech_patterns.len(), TECH_PATTERNS.len());
        assert_eq!(Vocabulary::standard().tech_patterns.len(), TECH_PATTERNS.len());
    }

    #[test]
    fn test_stopwords_case_insensitive() {
        let vocab = Vocabulary::standard();
        assert!(vocab.is_stopword("The"));
        assert!(vocab.is_stopword("as"));
        assert!(!vocab.is_stopword("security"));
    }

    #[test]
    fn test_category_lookup() {
        let vocab = Vocabulary::standard();
        assert!(vocab
            .project_types_for("Frontend")
            .contains(&ProjectType::Frontend));
        assert!(vocab.project_types_for("astrology").is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let result = Vocabulary::from_tables(&[], &[("broken", "(unclosed")], &[], &[], &[], &[]);
        assert!(result.is_err());
    }
}
