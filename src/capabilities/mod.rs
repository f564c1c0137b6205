//! Agent capabilities
//!
//! Raw agent definitions come from an [`AgentSource`], are summarised into
//! capability records by the [`CapabilityExtractor`], and are persisted per
//! project by the [`CapabilityIndexStore`].

pub mod extractor;
pub mod index;
pub mod source;

pub use extractor::{CapabilityExtractor, ExtractedCapabilities};
pub use index::{CapabilityIndexStore, GenerationHandle, GenerationOutcome, INDEX_VERSION};
pub use source::{AgentSource, MarkdownAgentSource};
