//! Key-value persistence contract + defensive read-side decoding.
//!
//! The session treats a store as a set of durable variable slots holding JSON
//! values. Stored data is never trusted: a list slot that does not decode as
//! a well-formed array comes back as an empty list.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Slot keys.
pub mod keys {
    pub const STAGE: &str = "taskPrioritizer.stage";
    pub const TASKS: &str = "taskPrioritizer.tasks";
    pub const COMPLETED_TASKS: &str = "taskPrioritizer.completedTasks";
    pub const COMPARISONS: &str = "taskPrioritizer.comparisons";
    pub const CURRENT_COMPARISON: &str = "taskPrioritizer.currentComparison";
    pub const PRIORITIZED_TASKS: &str = "taskPrioritizer.prioritizedTasks";
    pub const NEXT_ID: &str = "taskPrioritizer.nextId";

    pub const ALL: [&str; 7] = [
        STAGE,
        TASKS,
        COMPLETED_TASKS,
        COMPARISONS,
        CURRENT_COMPARISON,
        PRIORITIZED_TASKS,
        NEXT_ID,
    ];
}

pub trait KvStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Make pending writes durable. In-memory stores have nothing to do.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    slots: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: BTreeMap<String, Value>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &BTreeMap<String, Value> {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

/// Decode a list slot. Missing, non-array, or malformed data yields an empty list.
pub fn read_list<S, T>(store: &S, key: &str) -> Vec<T>
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(v @ Value::Array(_)) => match serde_json::from_value(v) {
            Ok(items) => items,
            Err(e) => {
                warn!(key, error = %e, "malformed list slot; using empty list");
                Vec::new()
            }
        },
        Some(other) => {
            warn!(key, kind = json_kind(&other), "list slot is not an array; using empty list");
            Vec::new()
        }
    }
}

/// Decode a scalar slot, falling back to `default` for missing or malformed data.
pub fn read_or<S, T>(store: &S, key: &str, default: T) -> T
where
    S: KvStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key) {
        None | Some(Value::Null) => default,
        Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
            warn!(key, error = %e, "malformed slot; using default");
            default
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskId};
    use serde_json::json;

    #[test]
    fn missing_slots_use_defaults() {
        let store = MemoryStore::new();
        let tasks: Vec<Task> = read_list(&store, keys::TASKS);
        assert!(tasks.is_empty());
        assert_eq!(read_or(&store, keys::CURRENT_COMPARISON, 0usize), 0);
    }

    #[test]
    fn non_array_list_slot_decodes_empty() {
        let mut store = MemoryStore::new();
        store.set(keys::TASKS, json!({"not": "a list"})).unwrap();
        store.set(keys::COMPLETED_TASKS, json!("oops")).unwrap();
        store.set(keys::PRIORITIZED_TASKS, json!(12)).unwrap();

        assert!(read_list::<_, Task>(&store, keys::TASKS).is_empty());
        assert!(read_list::<_, Task>(&store, keys::COMPLETED_TASKS).is_empty());
        assert!(read_list::<_, Task>(&store, keys::PRIORITIZED_TASKS).is_empty());
    }

    #[test]
    fn array_with_wrong_element_shape_decodes_empty() {
        let mut store = MemoryStore::new();
        store
            .set(keys::TASKS, json!([{"id": 1, "text": "ok", "priority": 0}, {"id": "x"}]))
            .unwrap();
        assert!(read_list::<_, Task>(&store, keys::TASKS).is_empty());
    }

    #[test]
    fn well_formed_list_round_trips() {
        let mut store = MemoryStore::new();
        let tasks = vec![Task::new(TaskId(1), "a"), Task::new(TaskId(2), "b").with_score(3)];
        store.set(keys::TASKS, serde_json::to_value(&tasks).unwrap()).unwrap();
        assert_eq!(read_list::<_, Task>(&store, keys::TASKS), tasks);
    }

    #[test]
    fn malformed_scalar_uses_default() {
        let mut store = MemoryStore::new();
        store.set(keys::CURRENT_COMPARISON, json!("three")).unwrap();
        assert_eq!(read_or(&store, keys::CURRENT_COMPARISON, 0usize), 0);
    }

    #[test]
    fn remove_clears_slot() {
        let mut store = MemoryStore::new();
        store.set(keys::STAGE, json!("results")).unwrap();
        store.remove(keys::STAGE).unwrap();
        assert!(store.is_empty());
    }
}
