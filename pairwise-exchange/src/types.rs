use pairwise_core::Task;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const FORMAT_VERSION: &str = "1.0";

/// JSON save-file layout. Field names are part of the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    pub prioritized_tasks: Vec<Task>,
    pub completed_tasks: Vec<Task>,
    pub version: String,
}

impl ExchangePayload {
    pub fn new(prioritized_tasks: Vec<Task>, completed_tasks: Vec<Task>) -> Self {
        Self {
            prioritized_tasks,
            completed_tasks,
            version: FORMAT_VERSION.to_string(),
        }
    }
}

/// A save file that passed structural validation but whose records have not
/// been coerced into tasks yet.
///
/// Every record is an object holding `id`, `text` and `priority`; the values
/// themselves may still be of any JSON type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPayload {
    pub prioritized: Vec<Map<String, Value>>,
    pub completed: Vec<Map<String, Value>>,
    pub version: Option<String>,
}

impl ImportPayload {
    pub fn len(&self) -> usize {
        self.prioritized.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
