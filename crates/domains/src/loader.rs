//! Run configuration assembly.
//!
//! A run is described by a domain, a subject file and a rubric file. The
//! subject's `name` becomes [`RunConfig::subject`], every other subject key
//! lands in [`RunConfig::domain_config`], and explicit overrides are merged
//! last so they win.

use crate::{ConfigKind, DomainError, DomainRegistry};
use descent_core::{DomainConfig, RunConfig, DEFAULT_MODEL};
use std::path::PathBuf;

/// Everything needed to build a [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Domain identifier
    pub domain: String,
    /// Subject config name
    pub subject: String,
    /// Rubric config name
    pub rubric: String,
    /// Challenger iterations
    pub iterations: usize,
    /// Proposer model identifier
    pub proposer_model: String,
    /// Evaluator model identifier
    pub evaluator_model: String,
    /// Cross-check verdicts under both orderings
    pub order_bias_mitigation: bool,
    /// Show the rubric to the seed proposal
    pub informed_init: bool,
    /// Where run directories go
    pub output_dir: PathBuf,
    /// Domain config entries that override the subject file
    pub overrides: DomainConfig,
}

impl RunRequest {
    /// Request with default settings.
    pub fn new(domain: impl Into<String>, subject: impl Into<String>, rubric: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            subject: subject.into(),
            rubric: rubric.into(),
            iterations: 20,
            proposer_model: DEFAULT_MODEL.to_string(),
            evaluator_model: DEFAULT_MODEL.to_string(),
            order_bias_mitigation: true,
            informed_init: true,
            output_dir: PathBuf::from("./runs"),
            overrides: DomainConfig::new(),
        }
    }
}

/// Load the subject and rubric through the domain plugin and build a validated config.
pub async fn build_run_config(registry: &DomainRegistry, request: RunRequest) -> Result<RunConfig, DomainError> {
    let plugin = registry.get(&request.domain)?;
    let subject = plugin.load_config(ConfigKind::Subjects, &request.subject).await?;
    let rubric = plugin.load_config(ConfigKind::Rubrics, &request.rubric).await?;

    let missing = |kind: ConfigKind, name: &str, key: &str| DomainError::InvalidConfig {
        path: PathBuf::from(kind.dir_name()).join(format!("{}.toml", name)),
        message: format!("missing string key '{}'", key),
    };

    let subject_name = subject
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| missing(ConfigKind::Subjects, &request.subject, "name"))?
        .to_string();
    let rubric_text = rubric
        .get("rubric")
        .and_then(|v| v.as_str())
        .ok_or_else(|| missing(ConfigKind::Rubrics, &request.rubric, "rubric"))?
        .to_string();

    let mut domain_config = DomainConfig::new();
    for (key, value) in subject {
        if key == "name" {
            continue;
        }
        let value = serde_json::to_value(value).map_err(|e| DomainError::InvalidConfig {
            path: PathBuf::from(ConfigKind::Subjects.dir_name()).join(format!("{}.toml", request.subject)),
            message: e.to_string(),
        })?;
        domain_config.insert(key, value);
    }
    domain_config.extend(request.overrides);

    let config = RunConfig {
        subject: subject_name,
        rubric_text,
        domain: request.domain,
        domain_config,
        max_iterations: request.iterations,
        order_bias_mitigation: request.order_bias_mitigation,
        proposer_model: request.proposer_model,
        evaluator_model: request.evaluator_model,
        informed_init: request.informed_init,
        output_dir: request.output_dir,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn configs() -> TempDir {
        let dir = tempdir().expect("tempdir");
        let svg = dir.path().join("svg");
        std::fs::create_dir_all(svg.join("subjects")).unwrap();
        std::fs::create_dir_all(svg.join("rubrics")).unwrap();
        std::fs::write(
            svg.join("subjects/unicorn.toml"),
            "name = \"a unicorn\"\ndescription = \"A white unicorn rearing\"\nrender_width = 256\n",
        )
        .unwrap();
        std::fs::write(svg.join("subjects/nameless.toml"), "description = \"?\"\n").unwrap();
        std::fs::write(
            svg.join("rubrics/anatomy.toml"),
            "display_name = \"Anatomy\"\nrubric = \"\"\"\nFour legs, one horn.\n\"\"\"\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_build_run_config() {
        let dir = configs();
        let registry = DomainRegistry::with_builtins(dir.path());
        let mut request = RunRequest::new("svg", "unicorn", "anatomy");
        request.iterations = 5;
        request.overrides.insert("render_width".into(), 1024.into());
        request.overrides.insert("renderer".into(), "rsvg-convert".into());

        let config = build_run_config(&registry, request).await.unwrap();

        assert_eq!(config.subject, "a unicorn");
        assert_eq!(config.rubric_text, "Four legs, one horn.\n");
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.domain_str("description"), Some("A white unicorn rearing"));
        assert_eq!(config.domain_u32("render_width", 512), 1024);
        assert_eq!(config.domain_str("renderer"), Some("rsvg-convert"));
        assert!(!config.domain_config.contains_key("name"));
    }

    #[tokio::test]
    async fn test_subject_without_name() {
        let dir = configs();
        let registry = DomainRegistry::with_builtins(dir.path());

        let err = build_run_config(&registry, RunRequest::new("svg", "nameless", "anatomy"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidConfig { ref message, .. } if message.contains("'name'")));
    }

    #[tokio::test]
    async fn test_zero_iterations_rejected() {
        let dir = configs();
        let registry = DomainRegistry::with_builtins(dir.path());
        let mut request = RunRequest::new("svg", "unicorn", "anatomy");
        request.iterations = 0;

        assert!(matches!(build_run_config(&registry, request).await, Err(DomainError::Config(_))));
    }

    #[tokio::test]
    async fn test_unknown_rubric() {
        let dir = configs();
        let registry = DomainRegistry::with_builtins(dir.path());

        let err = build_run_config(&registry, RunRequest::new("svg", "unicorn", "style"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::ConfigNotFound { kind: ConfigKind::Rubrics, .. }));
    }
}
