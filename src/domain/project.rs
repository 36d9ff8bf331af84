use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{normalize_token, Entity, ParseValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "active" => Ok(ProjectStatus::Active),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(ParseValueError::new(
                "project status",
                value,
                "active, archived",
            )),
        }
    }
}

/// A growing-season campaign grouping plots, tasks, and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub season: i32,
    pub status: ProjectStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Entity for Project {
    const TABLE: &'static str = "projects";
    const ID_PREFIX: &'static str = "prj";

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::ProjectStatus;

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!(
            ProjectStatus::from_str("Active").unwrap(),
            ProjectStatus::Active
        );
        assert_eq!(
            ProjectStatus::from_str(" archived ").unwrap(),
            ProjectStatus::Archived
        );
    }

    #[test]
    fn rejects_unknown_status() {
        let err = ProjectStatus::from_str("paused").unwrap_err();
        assert!(err.to_string().contains("project status"));
    }
}
