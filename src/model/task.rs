use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Moderate,
    High,
}

impl Priority {
    /// Severity rank used for sorting (higher sorts first)
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Moderate => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Moderate => "moderate",
            Priority::High => "high",
        }
    }

    /// Parse a priority name
    pub fn parse(s: &str) -> Option<Priority> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "moderate" | "medium" => Some(Priority::Moderate),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller-supplied, mutable fields of a task. A `None` due date fails
/// validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

impl TaskFields {
    pub fn new(title: impl Into<String>, due_date: NaiveDate) -> Self {
        TaskFields {
            title: title.into(),
            description: String::new(),
            due_date: Some(due_date),
            priority: Priority::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A single to-do record as stored in the `todos` blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Opaque unique identifier, never reassigned
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_due_date")]
    pub due_date: NaiveDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Owning user, set once at creation
    pub user_id: String,
}

/// Parse `YYYY-MM-DD`, or the date part of an ISO date-time
/// (`2024-03-01T10:00:00.000Z`).
pub fn parse_date_part(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.split('T').next().unwrap_or(text);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn deserialize_due_date<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
    let text = String::deserialize(d)?;
    parse_date_part(&text)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid dueDate '{}'", text)))
}

impl Task {
    /// Whether the task is past due on `today` and still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date < today
    }
}
