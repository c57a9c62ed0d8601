//! SVG rasterisers.
//!
//! `resvg` renders in-process. `rsvg-convert` runs the external binary with
//! SVG on stdin and PNG on stdout. Both draw on a white background and
//! stretch the drawing to the requested size.

use crate::DomainError;
use async_trait::async_trait;
use resvg::{tiny_skia, usvg};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Names accepted by [`create_rasterizer`].
pub const RASTERIZERS: &[&str] = &["resvg", "rsvg-convert"];

/// Rasterisation failures.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// The binary could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The binary rejected the input
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        /// Program name
        program: String,
        /// Exit status
        status: std::process::ExitStatus,
        /// Captured stderr
        stderr: String,
    },

    /// The markup could not be parsed
    #[error("invalid SVG: {0}")]
    Invalid(String),

    /// I/O or encoding error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RasterError {
    /// Whether the input, rather than the environment, was at fault.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, RasterError::Failed { .. } | RasterError::Invalid(_))
    }
}

/// Converts SVG markup to PNG bytes.
#[async_trait]
pub trait SvgRasterizer: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Rasterise `svg` at `width`×`height`.
    async fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, RasterError>;
}

/// Build a rasteriser by name.
pub fn create_rasterizer(name: &str) -> Result<Arc<dyn SvgRasterizer>, DomainError> {
    match name {
        "resvg" => Ok(Arc::new(Resvg::default())),
        "rsvg-convert" => Ok(Arc::new(RsvgConvert::default())),
        other => Err(DomainError::UnknownRenderer {
            name: other.to_string(),
            available: RASTERIZERS.to_vec(),
        }),
    }
}

/// Pipe `input` through `program args...` and return its stdout.
async fn pipe(program: &str, args: &[String], input: &[u8]) -> Result<Vec<u8>, RasterError> {
    debug!("Running {} {}", program, args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RasterError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            // The child may exit before reading everything; its status tells us why.
            let _ = stdin.write_all(&input).await;
        })
    });

    let output = child.wait_with_output().await?;
    if let Some(writer) = writer {
        let _ = writer.await;
    }

    if !output.status.success() {
        return Err(RasterError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// In-process renderer built on the `resvg` crate.
pub struct Resvg {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Resvg {
    /// Render with the given font database.
    pub fn with_fonts(fontdb: usvg::fontdb::Database) -> Self {
        Self {
            fontdb: Arc::new(fontdb),
        }
    }
}

impl Default for Resvg {
    fn default() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        Self::with_fonts(fontdb)
    }
}

fn render_png(
    svg: &str,
    width: u32,
    height: u32,
    fontdb: Arc<usvg::fontdb::Database>,
) -> Result<Vec<u8>, RasterError> {
    let mut options = usvg::Options::default();
    options.fontdb = fontdb;
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| RasterError::Invalid(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| std::io::Error::other(format!("cannot allocate a {}x{} canvas", width, height)))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let transform =
        tiny_skia::Transform::from_scale(width as f32 / size.width(), height as f32 / size.height());
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap.encode_png().map_err(|e| RasterError::Io(std::io::Error::other(e)))
}

#[async_trait]
impl SvgRasterizer for Resvg {
    fn name(&self) -> &str {
        "resvg"
    }

    async fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
        let svg = svg.to_string();
        let fontdb = self.fontdb.clone();
        tokio::task::spawn_blocking(move || render_png(&svg, width, height, fontdb))
            .await
            .map_err(|e| RasterError::Io(std::io::Error::other(e)))?
    }
}

/// librsvg's `rsvg-convert`.
#[derive(Debug, Clone)]
pub struct RsvgConvert {
    program: String,
}

impl RsvgConvert {
    /// Use a specific binary path.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RsvgConvert {
    fn default() -> Self {
        Self::with_program("rsvg-convert")
    }
}

#[async_trait]
impl SvgRasterizer for RsvgConvert {
    fn name(&self) -> &str {
        "rsvg-convert"
    }

    async fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Vec<u8>, RasterError> {
        let args = vec![
            "--width".to_string(),
            width.to_string(),
            "--height".to_string(),
            height.to_string(),
            "--background-color".to_string(),
            "white".to_string(),
            "--format".to_string(),
            "png".to_string(),
        ];
        pipe(&self.program, &args, svg.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rasterizer() {
        assert_eq!(create_rasterizer("resvg").unwrap().name(), "resvg");
        assert_eq!(create_rasterizer("rsvg-convert").unwrap().name(), "rsvg-convert");

        let err = create_rasterizer("playwright").err().unwrap();
        assert!(matches!(err, DomainError::UnknownRenderer { ref name, .. } if name == "playwright"));
    }

    #[tokio::test]
    async fn test_resvg_renders_png() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="red"/></svg>"#;
        let png = Resvg::with_fonts(usvg::fontdb::Database::new())
            .rasterize(svg, 32, 16)
            .await
            .unwrap();

        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[tokio::test]
    async fn test_resvg_rejects_broken_markup() {
        let err = Resvg::with_fonts(usvg::fontdb::Database::new())
            .rasterize("<svg><rect", 32, 32)
            .await
            .unwrap_err();

        assert!(matches!(err, RasterError::Invalid(_)));
        assert!(err.is_bad_input());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let rasterizer = RsvgConvert::with_program("definitely-not-a-real-rasterizer");
        let err = rasterizer.rasterize("<svg/>", 64, 64).await.unwrap_err();

        assert!(matches!(err, RasterError::Spawn { .. }));
        assert!(!err.is_bad_input());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_bad_input() {
        let err = pipe("sh", &["-c".to_string(), "echo broken >&2; exit 3".to_string()], b"<svg/>")
            .await
            .unwrap_err();

        assert!(err.is_bad_input());
        assert!(err.to_string().contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pipe_round_trips_stdin() {
        let out = pipe("cat", &[], b"<svg>png</svg>").await.unwrap();
        assert_eq!(out, b"<svg>png</svg>");
    }
}
