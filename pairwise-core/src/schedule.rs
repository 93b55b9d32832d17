//! Comparison schedule: every unordered pair of tasks, in a fixed order.
//!
//! Pairs are generated with the outer index ascending and the inner index
//! (always greater than the outer one) ascending, so `[A, B, C]` yields
//! `(A,B), (A,C), (B,C)`. Fully deterministic: no shuffling.

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskId};

/// One head-to-head match-up. Tuple order carries no priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonPair(pub TaskId, pub TaskId);

impl ComparisonPair {
    pub fn contains(&self, id: TaskId) -> bool {
        self.0 == id || self.1 == id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule {
    pairs: Vec<ComparisonPair>,
}

impl Schedule {
    pub fn generate(tasks: &[Task]) -> Self {
        let n = tasks.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for (i, a) in tasks.iter().enumerate() {
            for b in &tasks[i + 1..] {
                pairs.push(ComparisonPair(a.id, b.id));
            }
        }
        Self { pairs }
    }

    pub fn from_pairs(pairs: Vec<ComparisonPair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ComparisonPair> {
        self.pairs.get(index).copied()
    }

    pub fn pairs(&self) -> &[ComparisonPair] {
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tasks(n: u64) -> Vec<Task> {
        (1..=n).map(|i| Task::new(TaskId(i), format!("t{i}"))).collect()
    }

    #[test]
    fn three_tasks_pair_in_lexicographic_order() {
        let s = Schedule::generate(&tasks(3));
        assert_eq!(
            s.pairs(),
            &[
                ComparisonPair(TaskId(1), TaskId(2)),
                ComparisonPair(TaskId(1), TaskId(3)),
                ComparisonPair(TaskId(2), TaskId(3)),
            ]
        );
    }

    #[test]
    fn pair_count_is_n_choose_two_without_duplicates() {
        for n in 0..=9u64 {
            let s = Schedule::generate(&tasks(n));
            let n = n as usize;
            assert_eq!(s.len(), n * n.saturating_sub(1) / 2);

            let mut seen = HashSet::new();
            for p in s.pairs() {
                assert_ne!(p.0, p.1);
                let key = if p.0 < p.1 { (p.0, p.1) } else { (p.1, p.0) };
                assert!(seen.insert(key), "duplicate pair {key:?}");
            }
        }
    }

    #[test]
    fn order_follows_input_sequence_not_id_value() {
        let input = vec![
            Task::new(TaskId(9), "late"),
            Task::new(TaskId(2), "early"),
        ];
        let s = Schedule::generate(&input);
        assert_eq!(s.get(0), Some(ComparisonPair(TaskId(9), TaskId(2))));
        assert_eq!(s.get(1), None);
    }
}
