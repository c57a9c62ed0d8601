//! Candidate model - a proposed artifact.

use crate::Time;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identity of a candidate. Survives cloning and serialization, so
/// evaluations can be checked against the pair they were asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(Ulid);

/// Open provenance mapping attached to a candidate (e.g. retry count).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An immutable proposed artifact.
///
/// Candidates are built once by whichever component proposes them and are
/// shared as `Arc<Candidate>` afterwards. The loop and the evaluators never
/// look inside `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique identifier
    pub id: CandidateId,

    /// Opaque artifact content
    pub content: String,

    /// Iteration at which the candidate was produced (0 = seed)
    pub iteration: usize,

    /// Provenance metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// When it was produced
    pub created_at: Time,
}

impl Candidate {
    /// Create a new candidate.
    pub fn new(content: impl Into<String>, iteration: usize) -> Self {
        Self {
            id: CandidateId(Ulid::new()),
            content: content.into(),
            iteration,
            metadata: Metadata::new(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Attach a provenance entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Whether this candidate is the seed of a run.
    pub fn is_seed(&self) -> bool {
        self.iteration == 0
    }
}
