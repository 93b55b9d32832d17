//! TaskSet: the pending / prioritized / completed task collections.
//!
//! Every operation is total: unknown ids and blank text are silent no-ops.
//! Nothing in here scores tasks; that belongs to the comparison engine.

use std::collections::HashMap;

use crate::task::{IdGenerator, Task, TaskId, rank_by_score};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    tasks: Vec<Task>,
    prioritized: Vec<Task>,
    completed: Vec<Task>,
    ids: IdGenerator,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts. The id counter is raised past every id seen.
    pub fn from_parts(
        tasks: Vec<Task>,
        prioritized: Vec<Task>,
        completed: Vec<Task>,
        ids: IdGenerator,
    ) -> Self {
        let mut set = Self {
            tasks,
            prioritized,
            completed,
            ids,
        };
        set.sync_ids();
        set
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn prioritized(&self) -> &[Task] {
        &self.prioritized
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn ids(&self) -> IdGenerator {
        self.ids
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    /// Append a task. Returns `None` (and changes nothing) when `text` is blank.
    pub fn add_task(&mut self, text: &str) -> Option<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let id = self.ids.next_id();
        self.tasks.push(Task::new(id, text));
        Some(id)
    }

    /// Append one task per non-blank line, in input order.
    pub fn add_tasks_bulk(&mut self, input: &str) -> Vec<TaskId> {
        input
            .lines()
            .filter_map(|line| self.add_task(line))
            .collect()
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn clear_all(&mut self) {
        self.tasks.clear();
    }

    /// Move a prioritized task to the end of `completed`, score untouched.
    pub fn complete_task(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.prioritized.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = self.prioritized.remove(pos);
        self.completed.push(task);
        true
    }

    /// Move a completed task back and re-rank `prioritized`.
    pub fn restore_task(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.completed.iter().position(|t| t.id == id) else {
            return false;
        };
        let task = self.completed.remove(pos);
        self.prioritized.push(task);
        rank_by_score(&mut self.prioritized);
        true
    }

    /// Clear every collection. The id counter keeps counting.
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.prioritized.clear();
        self.completed.clear();
    }

    /// Store a finished ranking. `completed` starts empty for the run.
    pub(crate) fn set_ranking(&mut self, ranked: Vec<Task>) {
        self.prioritized = ranked;
        self.completed.clear();
    }

    /// Replace both partitions wholesale (JSON import).
    pub fn replace_partitions(&mut self, prioritized: Vec<Task>, completed: Vec<Task>) {
        self.prioritized = prioritized;
        self.completed = completed;
        self.sync_ids();
    }

    /// Hand out a fresh id without creating a task.
    pub fn allocate_id(&mut self) -> TaskId {
        self.ids.next_id()
    }

    /// Make sure future ids are greater than every id in `ids`.
    pub fn reserve_ids(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        for id in ids {
            self.ids.observe(id);
        }
    }

    /// Give every task holding an unstorable id a fresh one. The same old id
    /// maps to the same new id across all three lists. Returns the mapping.
    pub(crate) fn reassign_unstorable_ids(&mut self) -> HashMap<TaskId, TaskId> {
        let Self {
            tasks,
            prioritized,
            completed,
            ids,
        } = self;
        let mut remap = HashMap::new();
        for t in tasks
            .iter_mut()
            .chain(prioritized.iter_mut())
            .chain(completed.iter_mut())
        {
            if !t.id.is_storable() {
                t.id = *remap.entry(t.id).or_insert_with(|| ids.next_id());
            }
        }
        remap
    }

    fn sync_ids(&mut self) {
        let Self {
            tasks,
            prioritized,
            completed,
            ids,
        } = self;
        for t in tasks.iter().chain(prioritized.iter()).chain(completed.iter()) {
            ids.observe(t.id);
        }
    }
}
