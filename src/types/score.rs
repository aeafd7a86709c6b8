use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest score the scoring function accepts.
pub const MIN_SCORE: f64 = 1.0;
/// Highest score the scoring function accepts.
pub const MAX_SCORE: f64 = 10.0;

/// Returns true if `score` is a finite number in `MIN_SCORE..=MAX_SCORE`.
pub fn is_valid_score(score: f64) -> bool {
    score.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&score)
}

/// A successful quality grade for one bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub bookmark_id: i64,
    pub score: f64,
    pub reasoning: String,
}

/// Lifecycle of a single scoring request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScoreState {
    Idle,
    Requesting,
    Scored(ScoreResult),
    Failed { reason: String },
}

impl ScoreState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScoreState::Scored(_) | ScoreState::Failed { .. })
    }
}

/// One scoring attempt, tagged with a unique id so concurrent attempts can be told apart.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreAttempt {
    pub attempt_id: Uuid,
    pub bookmark_id: i64,
    pub state: ScoreState,
}

impl ScoreAttempt {
    pub fn new(bookmark_id: i64) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            bookmark_id,
            state: ScoreState::Idle,
        }
    }
}
