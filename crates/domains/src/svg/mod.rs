//! SVG artwork domain.
//!
//! The proposer writes SVG markup, the judge compares PNG renders of two
//! candidates, and champions are archived as PNG next to their markup.
//!
//! Domain config keys:
//! - `description` (required): what the subject looks like
//! - `renderer`: `resvg` (default) or `rsvg-convert`
//! - `render_width`, `render_height`: raster size in pixels (default 512)

pub mod judge;
pub mod parser;
pub mod prompts;
pub mod proposer;
pub mod renderer;

pub use judge::{parse_judge_response, SvgJudge, Verdict, Winner};
pub use parser::{extract_svg, NoSvgFound};
pub use proposer::SvgProposer;
pub use renderer::{create_rasterizer, RasterError, Resvg, RsvgConvert, SvgRasterizer, RASTERIZERS};

use crate::{ConfigKind, ConfigStore, DomainError, DomainPlugin};
use async_trait::async_trait;
use descent_core::{Candidate, RunConfig};
use descent_engine::{ArtifactRenderer, BiasMitigatedEvaluator, DomainComponents};
use descent_llm::ChatModel;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RENDERER: &str = "resvg";
const DEFAULT_SIZE: u32 = 512;

/// The `svg` domain plugin.
pub struct SvgDomain {
    store: ConfigStore,
}

impl SvgDomain {
    /// Create the plugin with its subject/rubric files under `configs_root`.
    pub fn new(configs_root: impl Into<PathBuf>) -> Self {
        Self {
            store: ConfigStore::new(configs_root),
        }
    }
}

#[async_trait]
impl DomainPlugin for SvgDomain {
    fn name(&self) -> &str {
        "svg"
    }

    fn description(&self) -> &str {
        "SVG artwork optimization via LLM-generated markup and rendered image comparison"
    }

    fn create_components(
        &self,
        config: Arc<RunConfig>,
        proposer_llm: Arc<dyn ChatModel>,
        evaluator_llm: Arc<dyn ChatModel>,
    ) -> Result<DomainComponents, DomainError> {
        let renderer = config.domain_str("renderer").unwrap_or(DEFAULT_RENDERER);
        let rasterizer = create_rasterizer(renderer)?;
        let size = (
            config.domain_u32("render_width", DEFAULT_SIZE),
            config.domain_u32("render_height", DEFAULT_SIZE),
        );
        info!("SVG domain: renderer {}, {}x{}", rasterizer.name(), size.0, size.1);

        let judge = SvgJudge::new(
            evaluator_llm,
            rasterizer.clone(),
            config.subject.clone(),
            config.rubric_text.clone(),
            size,
        );
        let evaluator = BiasMitigatedEvaluator::new(judge, config.order_bias_mitigation);

        Ok(DomainComponents {
            proposer: Arc::new(SvgProposer::new(proposer_llm, config)),
            evaluator: Arc::new(evaluator),
            artifact_renderer: Some(Arc::new(SvgArtifactRenderer::new(rasterizer, size))),
        })
    }

    async fn list_configs(&self, kind: ConfigKind) -> Result<Vec<String>, DomainError> {
        self.store.list(kind).await
    }

    async fn load_config(&self, kind: ConfigKind, name: &str) -> Result<toml::Table, DomainError> {
        self.store.load(kind, name).await
    }
}

/// Archives champions as PNG.
pub struct SvgArtifactRenderer {
    rasterizer: Arc<dyn SvgRasterizer>,
    width: u32,
    height: u32,
}

impl SvgArtifactRenderer {
    /// Create a renderer drawing at `width`×`height`.
    pub fn new(rasterizer: Arc<dyn SvgRasterizer>, (width, height): (u32, u32)) -> Self {
        Self {
            rasterizer,
            width,
            height,
        }
    }
}

#[async_trait]
impl ArtifactRenderer for SvgArtifactRenderer {
    fn media_type(&self) -> &str {
        "image/png"
    }

    fn extension(&self) -> &str {
        "png"
    }

    async fn render(&self, candidate: &Candidate) -> anyhow::Result<Option<Vec<u8>>> {
        let png = self
            .rasterizer
            .rasterize(&candidate.content, self.width, self.height)
            .await?;
        Ok(Some(png))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles shared by the SVG tests.

    use super::{RasterError, SvgRasterizer};
    use async_trait::async_trait;
    use descent_llm::{ChatModel, GenerateOptions, ImageInput, LlmError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model answering from a script; `Err(status)` becomes an API error.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, u16>>>,
        prompts: Mutex<Vec<String>>,
        images: Mutex<Vec<Vec<ImageInput>>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<String, u16>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                images: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn images(&self) -> Vec<Vec<ImageInput>> {
            self.images.lock().unwrap().clone()
        }

        fn next(&self, user: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(status)) => Err(LlmError::Api {
                    status,
                    message: "scripted failure".into(),
                }),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _system: &str, user: &str, _options: GenerateOptions) -> Result<String, LlmError> {
            self.next(user)
        }

        async fn evaluate_with_images(
            &self,
            _system: &str,
            user: &str,
            images: &[ImageInput],
        ) -> Result<String, LlmError> {
            self.images.lock().unwrap().push(images.to_vec());
            self.next(user)
        }
    }

    /// Rasteriser returning `png:<svg>@WxH`, or failing every input.
    pub struct FakeRasterizer {
        reject: bool,
    }

    impl FakeRasterizer {
        pub fn working() -> Self {
            Self { reject: false }
        }

        pub fn rejecting() -> Self {
            Self { reject: true }
        }
    }

    #[async_trait]
    impl SvgRasterizer for FakeRasterizer {
        fn name(&self) -> &str {
            "fake"
        }

        async fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
            if self.reject {
                return Err(RasterError::Invalid("unexpected end of stream".into()));
            }
            Ok(format!("png:{}@{}x{}", svg, width, height).into_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeRasterizer, ScriptedModel};
    use super::*;
    use descent_core::Candidate;
    use tempfile::tempdir;

    fn config(renderer: Option<&str>) -> Arc<RunConfig> {
        let mut config = RunConfig::new("a fox", "four legs");
        config.domain_config.insert("description".into(), "A red fox".into());
        if let Some(renderer) = renderer {
            config.domain_config.insert("renderer".into(), renderer.into());
        }
        Arc::new(config)
    }

    #[test]
    fn test_create_components() {
        let domain = SvgDomain::new("configs/svg");
        let model: Arc<dyn ChatModel> = Arc::new(ScriptedModel::new(vec![]));

        let components = domain
            .create_components(config(Some("rsvg-convert")), model.clone(), model)
            .unwrap();

        let renderer = components.artifact_renderer.unwrap();
        assert_eq!(renderer.media_type(), "image/png");
        assert_eq!(renderer.extension(), "png");
    }

    #[test]
    fn test_unknown_renderer() {
        let domain = SvgDomain::new("configs/svg");
        let model: Arc<dyn ChatModel> = Arc::new(ScriptedModel::new(vec![]));

        let err = domain
            .create_components(config(Some("playwright")), model.clone(), model)
            .err()
            .unwrap();

        assert!(matches!(err, DomainError::UnknownRenderer { .. }));
    }

    #[tokio::test]
    async fn test_lists_configs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("subjects")).unwrap();
        std::fs::write(dir.path().join("subjects/fox.toml"), "name = \"a fox\"\n").unwrap();
        std::fs::write(dir.path().join("subjects/cat.toml"), "name = \"a cat\"\n").unwrap();

        let domain = SvgDomain::new(dir.path());

        assert_eq!(domain.list_configs(ConfigKind::Subjects).await.unwrap(), vec!["cat", "fox"]);
        assert!(domain.list_configs(ConfigKind::Rubrics).await.unwrap().is_empty());
        assert_eq!(
            domain.load_config(ConfigKind::Subjects, "fox").await.unwrap()["name"].as_str(),
            Some("a fox")
        );
    }

    #[tokio::test]
    async fn test_artifact_renderer() {
        let renderer = SvgArtifactRenderer::new(Arc::new(FakeRasterizer::working()), (8, 4));
        let png = renderer.render(&Candidate::new("<svg/>", 0)).await.unwrap();
        assert_eq!(png, Some(b"png:<svg/>@8x4".to_vec()));

        let failing = SvgArtifactRenderer::new(Arc::new(FakeRasterizer::rejecting()), (8, 4));
        assert!(failing.render(&Candidate::new("<svg", 1)).await.is_err());
    }
}
