//! pairwise-core: task set, pairwise comparison engine, and session state
//! for the Pairwise prioritizer.

pub mod engine;
pub mod schedule;
pub mod session;
pub mod store;
pub mod task;
pub mod task_set;

pub use engine::{ComparisonEngine, Stage, Step, MIN_TASKS};
pub use schedule::{ComparisonPair, Schedule};
pub use session::Session;
pub use store::{keys, read_list, read_or, KvStore, MemoryStore};
pub use task::{rank_by_score, IdGenerator, Task, TaskId, ID_CEILING};
pub use task_set::TaskSet;
