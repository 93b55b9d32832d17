//! Task model for the pairwise prioritizer.
//!
//! Tasks are small + serializable: the same shape is written to the state
//! store and to the JSON export payload (where the score travels as `priority`).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Ids must stay below 2^53 so they survive a trip through a JSON number.
pub const ID_CEILING: u64 = 1 << 53;

/// Stable task identifier. Never reused within one store's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Whether this id can be held by a task without being re-assigned.
    pub fn is_storable(self) -> bool {
        self.0 < ID_CEILING
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,

    /// Number of comparisons this task has won in the current run.
    #[serde(rename = "priority")]
    pub score: u32,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            score: 0,
        }
    }

    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }
}

/// Monotonic id source.
///
/// Ids are handed out strictly increasing, so tasks created in the same
/// instant (or in one bulk batch) can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted counter value. A value past the id ceiling is
    /// treated as corrupt; the caller re-raises the counter from held ids.
    pub fn starting_at(next: u64) -> Self {
        if next > ID_CEILING {
            warn!(next, "stored id counter out of range; recomputing");
            return Self::default();
        }
        Self { next: next.max(1) }
    }

    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        match self.next.checked_add(1) {
            Some(next) => self.next = next,
            None => warn!("id counter exhausted"),
        }
        id
    }

    /// The value the next call to [`IdGenerator::next_id`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Make sure future ids are strictly greater than `seen`. Unstorable ids
    /// are ignored; their holders get re-assigned instead.
    pub fn observe(&mut self, seen: TaskId) {
        if seen.is_storable() && seen.0 >= self.next {
            self.next = seen.0 + 1;
        }
    }
}

/// Stable sort by score, highest first. Ties keep their current relative order.
pub fn rank_by_score(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.score.cmp(&a.score));
}
