//! Task helpers for the "My Tasks" view

use super::{KeyResult, Objective, Task, TaskStatus, User};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl Task {
    pub fn new(
        key_result_id: impl Into<String>,
        description: impl Into<String>,
        owner: User,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            key_result_id: key_result_id.into(),
            description: description.into(),
            owner,
            status: TaskStatus::Open,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Flip between open and completed. `completed_at` is set on completion
    /// and cleared on reopen.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        match self.status {
            TaskStatus::Open => {
                self.status = TaskStatus::Completed;
                self.completed_at = Some(now);
            }
            TaskStatus::Completed => {
                self.status = TaskStatus::Open;
                self.completed_at = None;
            }
        }
    }
}

/// A task together with the key result and objective it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskWithContext<'a> {
    pub task: &'a Task,
    pub key_result: &'a KeyResult,
    pub objective: &'a Objective,
}

/// Tasks owned by one user, split by status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MyTasks<'a> {
    pub open: Vec<TaskWithContext<'a>>,
    pub completed: Vec<TaskWithContext<'a>>,
}

impl MyTasks<'_> {
    pub fn total(&self) -> usize {
        self.open.len() + self.completed.len()
    }
}

/// Collect every task owned by `user_id`, walking objectives and key results
/// in snapshot order
pub fn my_tasks<'a>(objectives: &'a [Objective], user_id: &str) -> MyTasks<'a> {
    let mut mine = MyTasks::default();
    for objective in objectives {
        for key_result in &objective.key_results {
            for task in key_result.tasks.iter().filter(|t| t.owner.id == user_id) {
                let entry = TaskWithContext {
                    task,
                    key_result,
                    objective,
                };
                if task.is_completed() {
                    mine.completed.push(entry);
                } else {
                    mine.open.push(entry);
                }
            }
        }
    }
    mine
}
