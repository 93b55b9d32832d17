//! Session: single owner of the task set and the comparison engine.
//!
//! Callers drive everything through `&mut Session`, one event at a time, and
//! persist with [`Session::save`] / [`Session::load`] against any [`KvStore`].

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::{ComparisonEngine, Stage, Step};
use crate::schedule::{ComparisonPair, Schedule};
use crate::store::{keys, read_list, read_or, KvStore};
use crate::task::{IdGenerator, Task, TaskId};
use crate::task_set::TaskSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    tasks: TaskSet,
    engine: ComparisonEngine,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.engine.stage()
    }

    pub fn task_set(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn engine(&self) -> &ComparisonEngine {
        &self.engine
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn prioritized(&self) -> &[Task] {
        self.tasks.prioritized()
    }

    pub fn completed(&self) -> &[Task] {
        self.tasks.completed()
    }

    // --- input stage -------------------------------------------------------

    pub fn add_task(&mut self, text: &str) -> Option<TaskId> {
        if !self.in_stage(Stage::Input, "add_task") {
            return None;
        }
        self.tasks.add_task(text)
    }

    pub fn add_tasks_bulk(&mut self, input: &str) -> Vec<TaskId> {
        if !self.in_stage(Stage::Input, "add_tasks_bulk") {
            return Vec::new();
        }
        self.tasks.add_tasks_bulk(input)
    }

    pub fn remove_task(&mut self, id: TaskId) -> bool {
        self.in_stage(Stage::Input, "remove_task") && self.tasks.remove_task(id)
    }

    pub fn clear_all(&mut self) {
        if self.in_stage(Stage::Input, "clear_all") {
            self.tasks.clear_all();
        }
    }

    // --- comparing stage ---------------------------------------------------

    pub fn start(&mut self) -> Result<()> {
        self.engine.start(&mut self.tasks)
    }

    pub fn current_pair(&self) -> Option<(&Task, &Task)> {
        self.engine.current_pair(&self.tasks)
    }

    pub fn choose(&mut self, id: TaskId) -> Step {
        self.engine.choose(&mut self.tasks, id)
    }

    pub fn skip(&mut self) -> Step {
        self.engine.skip(&mut self.tasks)
    }

    pub fn cancel(&mut self) -> bool {
        self.engine.cancel()
    }

    pub fn percent_done(&self) -> u8 {
        self.engine.percent_done()
    }

    // --- results stage -----------------------------------------------------

    pub fn complete_task(&mut self, id: TaskId) -> bool {
        self.tasks.complete_task(id)
    }

    pub fn restore_task(&mut self, id: TaskId) -> bool {
        self.tasks.restore_task(id)
    }

    /// Replace both partitions (JSON import) and jump to results.
    pub fn import_partitions(&mut self, prioritized: Vec<Task>, completed: Vec<Task>) {
        self.tasks.replace_partitions(prioritized, completed);
        self.engine.enter_results();
        debug!(
            prioritized = self.tasks.prioritized().len(),
            completed = self.tasks.completed().len(),
            "partitions imported"
        );
    }

    /// Fresh id from the session's counter, for callers assembling tasks
    /// outside the task set (imports).
    pub fn allocate_id(&mut self) -> TaskId {
        self.tasks.allocate_id()
    }

    /// Observe ids that are about to be imported so fresh ids never collide.
    pub fn reserve_ids(&mut self, ids: impl IntoIterator<Item = TaskId>) {
        self.tasks.reserve_ids(ids);
    }

    pub fn reset(&mut self) {
        self.tasks.reset();
        self.engine.reset();
    }

    // --- persistence -------------------------------------------------------

    pub fn save<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        store.set(keys::STAGE, serde_json::to_value(self.stage())?)?;
        store.set(keys::TASKS, serde_json::to_value(self.tasks.tasks())?)?;
        store.set(keys::COMPLETED_TASKS, serde_json::to_value(self.tasks.completed())?)?;
        store.set(keys::COMPARISONS, serde_json::to_value(self.engine.schedule())?)?;
        store.set(keys::CURRENT_COMPARISON, Value::from(self.engine.cursor() as u64))?;
        store.set(keys::PRIORITIZED_TASKS, serde_json::to_value(self.tasks.prioritized())?)?;
        store.set(keys::NEXT_ID, Value::from(self.tasks.ids().peek()))?;
        store.flush()
    }

    /// Load from a store, coercing anything malformed to defaults, then
    /// repairing run state that cannot be resumed.
    pub fn load<S: KvStore + ?Sized>(store: &S) -> Self {
        let stage: Stage = read_or(store, keys::STAGE, Stage::Input);
        let tasks: Vec<Task> = read_list(store, keys::TASKS);
        let completed: Vec<Task> = read_list(store, keys::COMPLETED_TASKS);
        let prioritized: Vec<Task> = read_list(store, keys::PRIORITIZED_TASKS);
        let pairs: Vec<ComparisonPair> = read_list(store, keys::COMPARISONS);
        let cursor: usize = read_or(store, keys::CURRENT_COMPARISON, 0usize);
        let next_id: u64 = read_or(store, keys::NEXT_ID, 1u64);

        let mut set =
            TaskSet::from_parts(tasks, prioritized, completed, IdGenerator::starting_at(next_id));
        let remap = set.reassign_unstorable_ids();
        let pairs = if remap.is_empty() {
            pairs
        } else {
            warn!(count = remap.len(), "stored task ids out of range; re-assigned");
            let fix = |id: TaskId| remap.get(&id).copied().unwrap_or(id);
            pairs
                .into_iter()
                .map(|ComparisonPair(a, b)| ComparisonPair(fix(a), fix(b)))
                .collect()
        };

        let schedule = Schedule::from_pairs(pairs);
        if cursor > schedule.len() {
            warn!(cursor, len = schedule.len(), "stored cursor out of range; clamping");
        }

        let mut session = Self {
            tasks: set,
            engine: ComparisonEngine::from_parts(stage, schedule, cursor),
        };
        session.repair();
        session
    }

    /// Remove every slot this session writes.
    pub fn clear_store<S: KvStore + ?Sized>(store: &mut S) -> Result<()> {
        for key in keys::ALL {
            store.remove(key)?;
        }
        store.flush()
    }

    fn repair(&mut self) {
        if self.engine.stage() != Stage::Comparing {
            return;
        }
        if self.engine.schedule().is_empty() {
            warn!("comparing stage without a schedule; returning to input");
            self.engine.fall_back_to_input();
        } else if self.engine.is_exhausted() {
            warn!("stored run already exhausted; finalizing");
            self.engine.finalize(&mut self.tasks);
        }
    }

    fn in_stage(&self, want: Stage, op: &str) -> bool {
        let stage = self.stage();
        if stage != want {
            warn!(op, %stage, "operation only valid in {} stage; ignored", want);
            return false;
        }
        true
    }
}
