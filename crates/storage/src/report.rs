//! Trajectory report - a single HTML page showing how the champion evolved.

use crate::tracker::{EvaluationRecord, SummaryRecord};
use crate::{Result, StorageError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use descent_core::FeedbackLogEntry;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; background: #1a1a2e; color: #eee; margin: 2rem; }
    h1 { text-align: center; color: #e94560; }
    h2 { text-align: center; color: #aaa; font-weight: normal; }
    h3.section { text-align: center; color: #e94560; margin-top: 2.5rem; }
    .grid { display: flex; flex-wrap: wrap; gap: 1.5rem; justify-content: center; }
    .card { background: #16213e; border-radius: 12px; padding: 1rem; width: 280px; }
    .card h3 { margin: 0 0 0.5rem; color: #e94560; font-size: 0.9rem; }
    .card img { width: 100%; border-radius: 8px; background: #fff; }
    .card pre { font-size: 0.7rem; background: #0d1117; padding: 0.5rem; max-height: 200px;
                overflow: auto; white-space: pre-wrap; word-break: break-word; }
    .rationale { font-size: 0.8rem; color: #aaa; max-height: 100px; overflow-y: auto; }
    .timeline { max-width: 900px; margin: 1rem auto; }
    .entry { background: #16213e; border-radius: 8px; padding: 0.75rem 1rem;
             margin-bottom: 0.5rem; border-left: 4px solid #7f8c8d; }
    .entry.win { border-left-color: #27ae60; }
    .entry.discarded { border-left-color: #c0392b; }
    .entry header { display: flex; justify-content: space-between; margin-bottom: 0.3rem; }
    .badge { font-size: 0.75rem; padding: 2px 8px; border-radius: 4px; color: #fff; background: #7f8c8d; }
    .badge.win { background: #27ae60; }
    .badge.discarded { background: #c0392b; }
"#;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
];

/// One champion as shown in the frontier grid.
struct ChampionCard {
    iteration: usize,
    text: String,
    image: Option<(String, Vec<u8>)>,
}

/// Write `trajectory.html` into `run_dir` and return its path.
pub async fn generate_trajectory_html(run_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let run_dir = run_dir.as_ref();
    let champions_dir = run_dir.join("champions");
    if !fs::try_exists(&champions_dir).await? {
        return Err(StorageError::NotFound(champions_dir.display().to_string()));
    }

    let config: serde_json::Value = match fs::read_to_string(run_dir.join("config.json")).await {
        Ok(text) => serde_json::from_str(&text)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => serde_json::Value::Null,
        Err(e) => return Err(e.into()),
    };
    let subject = config["subject"].as_str().unwrap_or("unknown");
    let rubric = config["rubric_text"].as_str().unwrap_or("");

    let evaluations = load_evaluations(&run_dir.join("evaluations")).await?;
    let feedback_log = match load_summary(run_dir).await? {
        Some(summary) if !summary.feedback_log.is_empty() => summary.feedback_log,
        _ => evaluations.iter().map(EvaluationRecord::log_entry).collect(),
    };
    let champions = load_champions(&champions_dir).await?;

    let rationale_for = |iteration: usize| {
        evaluations
            .iter()
            .find(|e| e.iteration == iteration)
            .map(|e| e.rationale.as_str())
            .filter(|r| !r.is_empty())
    };

    let mut cards = String::new();
    for card in &champions {
        let label = if card.iteration == 0 {
            "Seed".to_string()
        } else {
            format!("Iteration {}", card.iteration)
        };
        let rationale = match rationale_for(card.iteration) {
            Some(r) => escape(&prefix(r, 300)),
            None => "Initial generation".to_string(),
        };
        let body = match &card.image {
            Some((media_type, bytes)) => format!(
                r#"<img src="data:{};base64,{}" alt="{}">"#,
                media_type,
                STANDARD.encode(bytes),
                label
            ),
            None => format!("<pre>{}</pre>", escape(&prefix(&card.text, 500))),
        };
        let _ = write!(
            cards,
            r#"
<div class="card">
  <h3>{}</h3>
  {}
  <p class="rationale">{}</p>
</div>"#,
            label, body, rationale
        );
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Feedback Descent Trajectory - {subject}</title>
<style>{style}</style>
</head>
<body>
<h1>Feedback Descent Trajectory</h1>
<h2>{subject} - {rubric}</h2>

<h3 class="section">Champion Frontier</h3>
<div class="grid">{cards}
</div>

<h3 class="section">Feedback Log</h3>
{timeline}
</body>
</html>
"#,
        subject = escape(subject),
        rubric = escape(&prefix(rubric, 80)),
        style = STYLE,
        cards = cards,
        timeline = timeline(&feedback_log),
    );

    let out = run_dir.join("trajectory.html");
    fs::write(&out, html).await?;
    info!("Trajectory written to {}", out.display());
    Ok(out)
}

fn timeline(log: &[FeedbackLogEntry]) -> String {
    if log.is_empty() {
        return r#"<div class="timeline"><p>No evaluations recorded.</p></div>"#.to_string();
    }

    let mut entries = String::new();
    for entry in log {
        let (class, badge, text) = match entry {
            FeedbackLogEntry::ChallengerWins { rationale, .. } => ("win", "Challenger wins".to_string(), rationale),
            FeedbackLogEntry::ChampionRetained { rationale, .. } => ("lose", "Champion retained".to_string(), rationale),
            FeedbackLogEntry::Discarded { reason, phase, .. } => ("discarded", format!("Discarded ({})", phase), reason),
        };
        let _ = write!(
            entries,
            r#"
<div class="entry {class}">
  <header><strong>Iteration {iteration}</strong><span class="badge {class}">{badge}</span></header>
  <div class="rationale">{text}</div>
</div>"#,
            class = class,
            iteration = entry.iteration(),
            badge = badge,
            text = escape(text),
        );
    }
    format!(r#"<div class="timeline">{}</div>"#, entries)
}

async fn load_summary(run_dir: &Path) -> Result<Option<SummaryRecord>> {
    match fs::read_to_string(run_dir.join("summary.json")).await {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn load_evaluations(dir: &Path) -> Result<Vec<EvaluationRecord>> {
    let mut records = Vec::new();
    for path in list_dir(dir).await? {
        let is_eval = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("iter_") && n.ends_with(".json"));
        if is_eval {
            records.push(serde_json::from_str(&fs::read_to_string(&path).await?)?);
        }
    }
    records.sort_by_key(|r: &EvaluationRecord| r.iteration);
    Ok(records)
}

async fn load_champions(dir: &Path) -> Result<Vec<ChampionCard>> {
    let files = list_dir(dir).await?;
    let mut cards = Vec::new();

    for path in &files {
        let Some(iteration) = champion_iteration(path, "txt") else {
            continue;
        };
        let text = fs::read_to_string(path).await?;

        let mut image = None;
        for (ext, media_type) in IMAGE_TYPES {
            let candidate = path.with_extension(ext);
            if files.contains(&candidate) {
                image = Some((media_type.to_string(), fs::read(&candidate).await?));
                break;
            }
        }

        cards.push(ChampionCard { iteration, text, image });
    }

    cards.sort_by_key(|c| c.iteration);
    Ok(cards)
}

/// Iteration encoded in `champion_iter_NNN.<ext>`.
fn champion_iteration(path: &Path, ext: &str) -> Option<usize> {
    if path.extension()?.to_str()? != ext {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("champion_iter_")?
        .parse()
        .ok()
}

async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(paths),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
