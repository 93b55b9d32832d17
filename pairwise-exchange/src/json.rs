//! JSON save files: export the two result partitions, import them back.
//!
//! Import is two-phase. [`parse_import`] checks the structure and touches no
//! state; [`apply_import`] coerces the records into tasks and swaps them into
//! the session. A rejected file therefore never leaves a partial import behind.

use anyhow::{anyhow, bail, Context, Result};
use pairwise_core::{Session, Task, TaskId};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::types::{ExchangePayload, ImportPayload};

const REQUIRED_FIELDS: [&str; 3] = ["id", "text", "priority"];

/// Pretty-printed (2-space) JSON of the session's prioritized + completed tasks.
pub fn export_json(session: &Session) -> Result<String> {
    let payload = ExchangePayload::new(session.prioritized().to_vec(), session.completed().to_vec());
    serde_json::to_string_pretty(&payload).context("serialize task export")
}

/// Validate a save file without touching any session.
pub fn parse_import(raw: &str) -> Result<ImportPayload> {
    let data: Value = serde_json::from_str(raw).context("save file is not valid JSON")?;

    let Value::Object(mut obj) = data else {
        bail!("invalid task data format: expected {{ prioritizedTasks: [], completedTasks: [] }}");
    };

    let prioritized = take_array(&mut obj, "prioritizedTasks")?;
    let completed = take_array(&mut obj, "completedTasks")?;

    let prioritized = records(prioritized, "prioritizedTasks")?;
    let completed = records(completed, "completedTasks")?;

    let version = obj.get("version").and_then(Value::as_str).map(str::to_string);

    Ok(ImportPayload {
        prioritized,
        completed,
        version,
    })
}

/// Coerce validated records into tasks and replace the session's partitions.
///
/// Integer ids below 2^53 are kept unless already used by an earlier record;
/// any other id (fractional, negative, non-numeric, huge, repeated) gets a
/// fresh one.
pub fn apply_import(session: &mut Session, payload: ImportPayload) {
    let mut kept: HashSet<u64> = HashSet::new();
    let keep: Vec<Vec<Option<TaskId>>> = [&payload.prioritized, &payload.completed]
        .into_iter()
        .map(|list| {
            list.iter()
                .map(|rec| {
                    rec.get("id")
                        .and_then(Value::as_u64)
                        .map(TaskId)
                        .filter(|id| id.is_storable() && kept.insert(id.0))
                })
                .collect()
        })
        .collect();

    session.reserve_ids(kept.iter().copied().map(TaskId));

    let mut build = |list: Vec<Map<String, Value>>, ids: &[Option<TaskId>]| -> Vec<Task> {
        list.into_iter()
            .zip(ids)
            .map(|(rec, id)| {
                let id = match id {
                    Some(id) => *id,
                    None => {
                        let fresh = session.allocate_id();
                        debug!(original = %rec["id"], %fresh, "re-assigned imported task id");
                        fresh
                    }
                };
                Task::new(id, coerce_text(&rec["text"])).with_score(coerce_score(&rec["priority"]))
            })
            .collect()
    };

    let prioritized = build(payload.prioritized, keep[0].as_slice());
    let completed = build(payload.completed, keep[1].as_slice());

    if let Some(v) = payload.version.as_deref() {
        if v != crate::FORMAT_VERSION {
            warn!(version = v, "importing save file with unexpected version");
        }
    }

    session.import_partitions(prioritized, completed);
}

/// Validate then apply. Returns the number of tasks imported.
pub fn import_json(session: &mut Session, raw: &str) -> Result<usize> {
    let payload = parse_import(raw)?;
    let n = payload.len();
    apply_import(session, payload);
    Ok(n)
}

fn take_array(obj: &mut Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match obj.remove(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => bail!("invalid task data format: `{key}` must be an array"),
        None => bail!("invalid task data format: missing `{key}`"),
    }
}

fn records(items: Vec<Value>, key: &str) -> Result<Vec<Map<String, Value>>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(rec) => match REQUIRED_FIELDS.iter().find(|f| !rec.contains_key(**f)) {
                None => Ok(rec),
                Some(field) => Err(anyhow!(
                    "invalid task data format within arrays: `{key}[{i}]` is missing `{field}`"
                )),
            },
            _ => Err(anyhow!(
                "invalid task data format within arrays: `{key}[{i}]` is not an object"
            )),
        })
        .collect()
}

fn coerce_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_score(v: &Value) -> u32 {
    if let Some(n) = v.as_u64() {
        return n.min(u32::MAX as u64) as u32;
    }
    match v.as_f64() {
        Some(f) if f > 0.0 => f.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}
