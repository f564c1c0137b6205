//! Project profile collaborators
//!
//! Tech-stack detection is not part of this crate. The selector asks a
//! [`ProjectProfileSource`] for the profile of the project root and treats a
//! failure as an empty profile.

use crate::error::Result;
use crate::types::ProjectProfile;
use async_trait::async_trait;
use std::path::Path;

/// External, independently cached project detector
#[async_trait]
pub trait ProjectProfileSource: Send + Sync {
    async fn profile(&self, project_root: &Path) -> Result<ProjectProfile>;
}

/// Returns the same profile for every project
#[derive(Debug, Clone, Default)]
pub struct StaticProfileSource {
    profile: ProjectProfile,
}

impl StaticProfileSource {
    pub fn new(profile: ProjectProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ProjectProfileSource for StaticProfileSource {
    async fn profile(&self, _project_root: &Path) -> Result<ProjectProfile> {
        Ok(self.profile.clone())
    }
}
