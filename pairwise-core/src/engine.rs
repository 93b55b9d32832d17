//! Comparison engine: walks the pair schedule one decision at a time.
//!
//! Stages: `Input` -> `Comparing` -> `Results`.
//!
//! - `start` generates the schedule from the current task list (needs >= 2 tasks).
//! - `choose` scores the picked task and advances; `skip` only advances.
//! - reaching the end of the schedule finalizes: a stable score-descending
//!   sort of the task list becomes the prioritized partition.
//!
//! Inconsistent input (a choice outside the current pair, events in the wrong
//! stage, a cursor past the end) never panics: it is logged and degrades to a
//! skip or a no-op.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::schedule::{ComparisonPair, Schedule};
use crate::task::{Task, TaskId, rank_by_score};
use crate::task_set::TaskSet;

pub const MIN_TASKS: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "compare")]
    Comparing,
    #[serde(rename = "results")]
    Results,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Input => "input",
            Stage::Comparing => "comparing",
            Stage::Results => "results",
        };
        f.write_str(s)
    }
}

/// Outcome of a single engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Cursor moved to the next pair.
    Advanced,
    /// The last pair was resolved; results are ready.
    Finished,
    /// Event did not apply in the current stage.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonEngine {
    stage: Stage,
    schedule: Schedule,
    cursor: usize,
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts. The cursor is clamped to the schedule.
    pub fn from_parts(stage: Stage, schedule: Schedule, cursor: usize) -> Self {
        let cursor = cursor.min(schedule.len());
        Self {
            stage,
            schedule,
            cursor,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.schedule.len()
    }

    /// `round(100 * cursor / len)`, 0 for an empty schedule.
    pub fn percent_done(&self) -> u8 {
        let len = self.schedule.len();
        if len == 0 {
            return 0;
        }
        // Integer round-half-up of 100 * cursor / len.
        ((200 * self.cursor + len) / (2 * len)).min(100) as u8
    }

    pub fn start(&mut self, set: &mut TaskSet) -> Result<()> {
        if self.stage != Stage::Input {
            bail!("prioritization can only start from the input stage (currently {})", self.stage);
        }
        if set.len() < MIN_TASKS {
            bail!(
                "add at least {MIN_TASKS} tasks to prioritize (have {})",
                set.len()
            );
        }

        for t in set.tasks_mut() {
            t.score = 0;
        }
        self.schedule = Schedule::generate(set.tasks());
        self.cursor = 0;
        self.stage = Stage::Comparing;
        debug!(pairs = self.schedule.len(), "prioritization started");
        Ok(())
    }

    pub fn current_pair_ids(&self) -> Option<ComparisonPair> {
        if self.stage != Stage::Comparing {
            return None;
        }
        self.schedule.get(self.cursor)
    }

    /// Resolve the current pair against the live task list.
    ///
    /// Returns `None` outside `Comparing`, past the end, or when either id no
    /// longer resolves to a task.
    pub fn current_pair<'a>(&self, set: &'a TaskSet) -> Option<(&'a Task, &'a Task)> {
        let pair = self.current_pair_ids()?;
        match (set.get(pair.0), set.get(pair.1)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                warn!(cursor = self.cursor, ?pair, "comparison pair references a missing task");
                None
            }
        }
    }

    pub fn choose(&mut self, set: &mut TaskSet, chosen: TaskId) -> Step {
        if self.stage != Stage::Comparing {
            warn!(stage = %self.stage, %chosen, "choose ignored outside comparing stage");
            return Step::Ignored;
        }
        let Some(pair) = self.schedule.get(self.cursor) else {
            warn!(cursor = self.cursor, "cursor past end of schedule; finalizing");
            return self.finalize(set);
        };

        if !pair.contains(chosen) {
            warn!(%chosen, ?pair, "chosen task is not in the current pair; skipping");
            return self.advance(set);
        }

        match set.tasks_mut().iter_mut().find(|t| t.id == chosen) {
            Some(task) => task.score = task.score.saturating_add(1),
            None => warn!(%chosen, "chosen task no longer exists; skipping"),
        }
        self.advance(set)
    }

    pub fn skip(&mut self, set: &mut TaskSet) -> Step {
        if self.stage != Stage::Comparing {
            warn!(stage = %self.stage, "skip ignored outside comparing stage");
            return Step::Ignored;
        }
        self.advance(set)
    }

    /// Abandon the run, keeping the task list. Returns false outside `Comparing`.
    pub fn cancel(&mut self) -> bool {
        if self.stage != Stage::Comparing {
            return false;
        }
        self.schedule = Schedule::default();
        self.cursor = 0;
        self.stage = Stage::Input;
        debug!("prioritization cancelled");
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Jump straight to results with an externally supplied ranking (import).
    pub fn enter_results(&mut self) {
        self.schedule = Schedule::default();
        self.cursor = 0;
        self.stage = Stage::Results;
    }

    /// Drop back to `Input` without touching tasks (used when restored state
    /// cannot be resumed).
    pub(crate) fn fall_back_to_input(&mut self) {
        self.schedule = Schedule::default();
        self.cursor = 0;
        self.stage = Stage::Input;
    }

    fn advance(&mut self, set: &mut TaskSet) -> Step {
        self.cursor += 1;
        if self.cursor >= self.schedule.len() {
            return self.finalize(set);
        }
        Step::Advanced
    }

    pub(crate) fn finalize(&mut self, set: &mut TaskSet) -> Step {
        self.cursor = self.schedule.len();
        let mut ranked = set.tasks().to_vec();
        rank_by_score(&mut ranked);
        set.set_ranking(ranked);
        self.stage = Stage::Results;
        debug!(tasks = set.prioritized().len(), "prioritization finished");
        Step::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(texts: &[&str]) -> TaskSet {
        let mut set = TaskSet::new();
        for t in texts {
            set.add_task(t);
        }
        set
    }

    fn id_of(set: &TaskSet, text: &str) -> TaskId {
        set.tasks().iter().find(|t| t.text == text).unwrap().id
    }

    fn score_of(set: &TaskSet, text: &str) -> u32 {
        set.tasks().iter().find(|t| t.text == text).unwrap().score
    }

    #[test]
    fn start_needs_two_tasks() {
        let mut set = set_of(&["only one"]);
        let mut engine = ComparisonEngine::new();
        let err = engine.start(&mut set).unwrap_err();
        assert!(err.to_string().contains("at least 2 tasks"));
        assert_eq!(engine.stage(), Stage::Input);
        assert!(engine.schedule().is_empty());
    }

    #[test]
    fn choose_scores_only_the_winner() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();

        let a = id_of(&set, "A");
        assert_eq!(engine.choose(&mut set, a), Step::Advanced);
        assert_eq!(score_of(&set, "A"), 1);
        assert_eq!(score_of(&set, "B"), 0);
        assert_eq!(engine.cursor(), 1);
    }

    #[test]
    fn skip_advances_without_scoring() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();

        assert_eq!(engine.skip(&mut set), Step::Advanced);
        assert_eq!(engine.cursor(), 1);
        assert!(set.tasks().iter().all(|t| t.score == 0));
    }

    #[test]
    fn choice_outside_pair_acts_as_skip() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();

        // First pair is (A, B); C is not in it.
        let c = id_of(&set, "C");
        assert_eq!(engine.choose(&mut set, c), Step::Advanced);
        assert_eq!(engine.cursor(), 1);
        assert!(set.tasks().iter().all(|t| t.score == 0));
    }

    #[test]
    fn write_report_scenario() {
        let mut set = set_of(&["Write report", "Call client", "Clean desk"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();

        let wr = id_of(&set, "Write report");
        let cc = id_of(&set, "Call client");

        assert_eq!(engine.choose(&mut set, wr), Step::Advanced);
        assert_eq!(engine.choose(&mut set, wr), Step::Advanced);
        assert_eq!(engine.choose(&mut set, cc), Step::Finished);

        assert_eq!(engine.stage(), Stage::Results);
        assert!(engine.is_exhausted());
        let ranked: Vec<(&str, u32)> = set
            .prioritized()
            .iter()
            .map(|t| (t.text.as_str(), t.score))
            .collect();
        assert_eq!(
            ranked,
            vec![("Write report", 2), ("Call client", 1), ("Clean desk", 0)]
        );
        assert!(set.completed().is_empty());
    }

    #[test]
    fn all_skips_keep_input_order() {
        let mut set = set_of(&["A", "B", "C", "D"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();

        let mut steps = 0;
        while engine.skip(&mut set) != Step::Finished {
            steps += 1;
        }
        assert_eq!(steps + 1, 6);
        let order: Vec<&str> = set.prioritized().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn events_after_results_are_ignored() {
        let mut set = set_of(&["A", "B"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();
        assert_eq!(engine.skip(&mut set), Step::Finished);

        let a = id_of(&set, "A");
        assert_eq!(engine.choose(&mut set, a), Step::Ignored);
        assert_eq!(engine.skip(&mut set), Step::Ignored);
        assert_eq!(score_of(&set, "A"), 0);
    }

    #[test]
    fn cancel_returns_to_input_keeping_tasks() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();
        engine.skip(&mut set);

        assert!(engine.cancel());
        assert_eq!(engine.stage(), Stage::Input);
        assert_eq!(engine.cursor(), 0);
        assert!(engine.schedule().is_empty());
        assert_eq!(set.len(), 3);
        assert!(!engine.cancel());
    }

    #[test]
    fn restart_zeroes_scores_from_a_cancelled_run() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();
        let a = id_of(&set, "A");
        engine.choose(&mut set, a);
        engine.cancel();
        assert_eq!(score_of(&set, "A"), 1);

        engine.start(&mut set).unwrap();
        assert!(set.tasks().iter().all(|t| t.score == 0));
    }

    #[test]
    fn missing_task_yields_no_current_pair() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        engine.start(&mut set).unwrap();
        assert!(engine.current_pair(&set).is_some());

        let b = id_of(&set, "B");
        set.remove_task(b);
        assert!(engine.current_pair(&set).is_none());
    }

    #[test]
    fn percent_done_rounds() {
        let mut set = set_of(&["A", "B", "C"]);
        let mut engine = ComparisonEngine::new();
        assert_eq!(engine.percent_done(), 0);
        engine.start(&mut set).unwrap();
        assert_eq!(engine.percent_done(), 0);
        engine.skip(&mut set);
        assert_eq!(engine.percent_done(), 33);
        engine.skip(&mut set);
        assert_eq!(engine.percent_done(), 67);
        engine.skip(&mut set);
        assert_eq!(engine.percent_done(), 100);
    }
}
