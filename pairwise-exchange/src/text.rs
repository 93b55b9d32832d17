//! Plain-text report of the result partitions.
//!
//! Layout:
//!   ACTIVE TASKS:
//!   1. <text>
//!   ...
//!
//!   COMPLETED TASKS:
//!   1. <text>

use pairwise_core::{Session, Task};

pub fn export_text(session: &Session) -> String {
    render(session.prioritized(), session.completed())
}

pub fn render(active: &[Task], completed: &[Task]) -> String {
    let mut out = String::new();

    if !active.is_empty() {
        out.push_str("ACTIVE TASKS:\n");
        out.push_str(&numbered(active));
    }

    if !completed.is_empty() {
        out.push_str("\n\nCOMPLETED TASKS:\n");
        out.push_str(&numbered(completed));
    }

    out
}

fn numbered(tasks: &[Task]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairwise_core::TaskId;

    fn tasks(texts: &[&str]) -> Vec<Task> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Task::new(TaskId(i as u64 + 1), *t))
            .collect()
    }

    #[test]
    fn active_only() {
        let out = render(&tasks(&["Write report", "Call client"]), &[]);
        assert_eq!(out, "ACTIVE TASKS:\n1. Write report\n2. Call client");
    }

    #[test]
    fn active_and_completed() {
        let out = render(&tasks(&["Write report"]), &tasks(&["Clean desk", "File taxes"]));
        assert_eq!(
            out,
            "ACTIVE TASKS:\n1. Write report\n\nCOMPLETED TASKS:\n1. Clean desk\n2. File taxes"
        );
    }

    #[test]
    fn empty_session_exports_nothing() {
        assert_eq!(export_text(&Session::new()), "");
    }
}
