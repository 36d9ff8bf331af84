use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{normalize_token, Entity, ParseValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Doing => "doing",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let status = match normalize_token(value).as_str() {
            "todo" | "open" | "pending" => TaskStatus::Todo,
            "doing" | "in_progress" => TaskStatus::Doing,
            "done" | "closed" | "completed" => TaskStatus::Done,
            _ => {
                return Err(ParseValueError::new(
                    "task status",
                    value,
                    "todo, doing, done",
                ));
            }
        };
        Ok(status)
    }
}

/// A unit of farm work, optionally tied to a plot and an assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub plot_id: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<i64>,
    pub updated_at: String,
}

impl Entity for Task {
    const TABLE: &'static str = "tasks";
    const ID_PREFIX: &'static str = "tsk";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::TaskStatus;

    #[test]
    fn parses_status_aliases() {
        assert_eq!(TaskStatus::from_str("open").unwrap(), TaskStatus::Todo);
        assert_eq!(
            TaskStatus::from_str("in-progress").unwrap(),
            TaskStatus::Doing
        );
        assert_eq!(TaskStatus::from_str("completed").unwrap(), TaskStatus::Done);
    }

    #[test]
    fn done_is_not_open() {
        assert!(TaskStatus::Todo.is_open());
        assert!(TaskStatus::Doing.is_open());
        assert!(!TaskStatus::Done.is_open());
    }
}
