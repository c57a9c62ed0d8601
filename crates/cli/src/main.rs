//! Feedback Descent CLI - iterative artifact optimization with pairwise LLM judging.

mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use descent_core::{RunConfig, DEFAULT_MODEL};
use descent_domains::{build_run_config, ConfigKind, DomainRegistry, RunRequest};
use descent_engine::{FeedbackDescent, LoopConfig};
use descent_llm::{ChatModel, LlmClient};
use descent_storage::{generate_trajectory_html, RunTracker};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "descent")]
#[command(about = "Feedback Descent: champion/challenger optimization with pairwise LLM judging", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the domain config directories
    #[arg(long, global = true, default_value = "./configs")]
    configs_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an optimization
    Run(RunArgs),
    /// List available domains
    ListDomains,
    /// List subjects of a domain
    ListSubjects {
        /// Domain name
        #[arg(long, default_value = "svg")]
        domain: String,
    },
    /// List rubrics of a domain
    ListRubrics {
        /// Domain name
        #[arg(long, default_value = "svg")]
        domain: String,
    },
    /// Regenerate the trajectory report of a finished run
    Trajectory {
        /// Run directory
        run_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Domain name
    #[arg(long, default_value = "svg")]
    domain: String,
    /// Subject config name
    #[arg(long)]
    subject: String,
    /// Rubric config name
    #[arg(long)]
    rubric: String,
    /// Challenger iterations after the seed
    #[arg(long, default_value = "20")]
    iterations: usize,
    /// Proposer model (provider/model)
    #[arg(long, default_value = DEFAULT_MODEL)]
    proposer_model: String,
    /// Evaluator model (provider/model)
    #[arg(long, default_value = DEFAULT_MODEL)]
    evaluator_model: String,
    /// SVG rasteriser
    #[arg(long)]
    renderer: Option<String>,
    /// Render width in pixels
    #[arg(long)]
    render_width: Option<u32>,
    /// Render height in pixels
    #[arg(long)]
    render_height: Option<u32>,
    /// Judge each pair in one ordering only
    #[arg(long)]
    no_order_bias: bool,
    /// Seed without showing the rubric
    #[arg(long)]
    scratch: bool,
    /// Where run directories go
    #[arg(long, default_value = "./runs")]
    output_dir: PathBuf,
    /// Write debug logs to <run dir>/debug.log
    #[arg(short, long)]
    verbose: bool,
}

impl RunArgs {
    fn into_request(self) -> RunRequest {
        let mut request = RunRequest::new(self.domain, self.subject, self.rubric);
        request.iterations = self.iterations;
        request.proposer_model = self.proposer_model;
        request.evaluator_model = self.evaluator_model;
        request.order_bias_mitigation = !self.no_order_bias;
        request.informed_init = !self.scratch;
        request.output_dir = self.output_dir;

        if let Some(renderer) = self.renderer {
            request.overrides.insert("renderer".into(), renderer.into());
        }
        if let Some(width) = self.render_width {
            request.overrides.insert("render_width".into(), width.into());
        }
        if let Some(height) = self.render_height {
            request.overrides.insert("render_height".into(), height.into());
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(&cli.command, Commands::Run(args) if args.verbose);
    let debug_log = logging::init_tracing(verbose);

    let registry = DomainRegistry::with_builtins(&cli.configs_dir);

    match cli.command {
        Commands::Run(args) => {
            let config = Arc::new(build_run_config(&registry, args.into_request()).await?);
            print_header(&config);

            let proposer_llm: Arc<dyn ChatModel> = Arc::new(
                LlmClient::from_model(&config.proposer_model).context("cannot create proposer model client")?,
            );
            let evaluator_llm: Arc<dyn ChatModel> = Arc::new(
                LlmClient::from_model(&config.evaluator_model).context("cannot create evaluator model client")?,
            );

            let components = registry
                .get(&config.domain)?
                .create_components(config.clone(), proposer_llm, evaluator_llm)?;

            let mut tracker = RunTracker::create(&config, components.artifact_renderer.clone()).await?;
            if let Some(log) = &debug_log {
                let path = tracker.run_dir().join("debug.log");
                log.open(&path)
                    .with_context(|| format!("cannot open {}", path.display()))?;
                info!("Debug log: {}", path.display());
            }

            let (cancel_tx, cancel_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping run");
                    let _ = cancel_tx.send(true);
                }
            });

            let engine = FeedbackDescent::from_components(&components)
                .with_config(LoopConfig::from(config.as_ref()))
                .with_cancellation(cancel_rx);
            let outcome = engine.run(&mut tracker).await;

            match generate_trajectory_html(tracker.run_dir()).await {
                Ok(path) => println!("Trajectory: {}", path.display()),
                Err(e) => error!("Trajectory generation failed: {}", e),
            }

            let report = match outcome {
                Ok(report) => report,
                Err(e) if e.is_cancelled() => {
                    println!("Run cancelled. Partial results in {}", tracker.run_dir().display());
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            };

            let summary = &report.summary;
            println!();
            println!("Run complete: {}", tracker.run_dir().display());
            println!("  Champion updates: {}", summary.champion_updates);
            println!("  Update iterations: {:?}", summary.champion_update_iterations);
            println!("  Final champion: iteration {}", summary.final_champion_iteration);
            println!("  Discarded: {:?}", summary.discarded_iterations);
        }
        Commands::ListDomains => {
            println!("Domains");
            for name in registry.list() {
                let plugin = registry.get(&name)?;
                println!("  {:<12} {}", name, plugin.description());
            }
        }
        Commands::ListSubjects { domain } => {
            list_configs(&registry, &domain, ConfigKind::Subjects, |_, table| {
                excerpt(table_str(table, "description").unwrap_or("-"), DESCRIPTION_CHARS)
            })
            .await?
        }
        Commands::ListRubrics { domain } => {
            list_configs(&registry, &domain, ConfigKind::Rubrics, |name, table| {
                table_str(table, "display_name").unwrap_or(name).to_string()
            })
            .await?
        }
        Commands::Trajectory { run_dir } => {
            let path = generate_trajectory_html(&run_dir).await?;
            println!("Trajectory: {}", path.display());
        }
    }

    Ok(())
}

fn print_header(config: &RunConfig) {
    println!("Feedback Descent");
    println!("  Domain: {}", config.domain);
    println!("  Subject: {}", config.subject);
    println!("  Iterations: {}", config.max_iterations);
    println!("  Proposer: {}", config.proposer_model);
    println!("  Evaluator: {}", config.evaluator_model);
    println!(
        "  Order bias mitigation: {}",
        if config.order_bias_mitigation { "on" } else { "off" }
    );
    println!("  Seeding: {}", if config.informed_init { "informed" } else { "scratch" });
    println!();
}

/// Characters of a subject description shown by `list-subjects`.
const DESCRIPTION_CHARS: usize = 80;

fn table_str<'a>(table: &'a toml::Table, key: &str) -> Option<&'a str> {
    table.get(key).and_then(|v| v.as_str())
}

/// First `max_chars` characters of `text` on a single line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    line.chars().take(max_chars).collect()
}

/// Print `name | label` rows for the configs of `kind`.
async fn list_configs<F>(registry: &DomainRegistry, domain: &str, kind: ConfigKind, label: F) -> Result<()>
where
    F: Fn(&str, &toml::Table) -> String,
{
    let plugin = registry.get(domain)?;
    let names = plugin.list_configs(kind).await?;

    println!("{} configs for '{}' ({})", kind, domain, names.len());
    for name in names {
        let table = plugin.load_config(kind, &name).await?;
        println!("  {:<20} | {}", name, label(&name, &table));
    }
    Ok(())
}
