//! Domain plugin contract.

use crate::DomainError;
use async_trait::async_trait;
use descent_core::RunConfig;
use descent_engine::DomainComponents;
use descent_llm::ChatModel;
use std::sync::Arc;

/// Kind of named configuration a domain ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// What to produce (`subjects/<name>.toml`)
    Subjects,
    /// How to judge it (`rubrics/<name>.toml`)
    Rubrics,
}

impl ConfigKind {
    /// Directory name under a domain's config root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ConfigKind::Subjects => "subjects",
            ConfigKind::Rubrics => "rubrics",
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigKind::Subjects => write!(f, "Subject"),
            ConfigKind::Rubrics => write!(f, "Rubric"),
        }
    }
}

/// A content domain: builds the capabilities for a run and serves its
/// named subject/rubric configurations.
#[async_trait]
pub trait DomainPlugin: Send + Sync {
    /// Identifier used to select the domain.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Build the proposer, evaluator and optional renderer for `config`.
    fn create_components(
        &self,
        config: Arc<RunConfig>,
        proposer_llm: Arc<dyn ChatModel>,
        evaluator_llm: Arc<dyn ChatModel>,
    ) -> Result<DomainComponents, DomainError>;

    /// Names of the available configurations of `kind`, sorted.
    async fn list_configs(&self, kind: ConfigKind) -> Result<Vec<String>, DomainError>;

    /// Load the configuration `name` of `kind`.
    async fn load_config(&self, kind: ConfigKind, name: &str) -> Result<toml::Table, DomainError>;
}
