use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::model::task::Task;

/// Display sort order. Every key sorts stably, so equal keys keep the
/// collection's manual order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    /// Earliest due date first
    #[default]
    #[serde(rename = "dueDate")]
    DueDate,
    /// High, then moderate, then low
    #[serde(rename = "priority")]
    Priority,
    /// Alphabetical by title
    #[serde(rename = "title")]
    Title,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::DueDate => "dueDate",
            SortKey::Priority => "priority",
            SortKey::Title => "title",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "duedate" | "due-date" | "due" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            _ => Err(format!(
                "unknown sort key '{}' (expected: dueDate, priority, title)",
                s
            )),
        }
    }
}

/// Completion-based filter applied after the search term
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Done,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Open => "open",
            StatusFilter::Done => "done",
            StatusFilter::Overdue => "overdue",
        }
    }

    fn accepts(self, task: &Task, today: NaiveDate) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Open => !task.completed,
            StatusFilter::Done => task.completed,
            StatusFilter::Overdue => task.is_overdue(today),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "open" | "todo" => Ok(StatusFilter::Open),
            "done" | "completed" => Ok(StatusFilter::Done),
            "overdue" => Ok(StatusFilter::Overdue),
            _ => Err(format!(
                "unknown status '{}' (expected: all, open, done, overdue)",
                s
            )),
        }
    }
}

/// Parameters of a view over the collection
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    pub search: String,
    pub sort: SortKey,
    pub status: StatusFilter,
}

/// Whether `task` matches a search term (case-insensitive, title or description)
pub fn matches_search(task: &Task, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    task.title.to_lowercase().contains(&needle)
        || task.description.to_lowercase().contains(&needle)
}

/// Compare two tasks under a sort key
pub fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::DueDate => a.due_date.cmp(&b.due_date),
        SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
        SortKey::Title => compare_titles(&a.title, &b.title),
    }
}

/// Primary collation key: decomposed, combining marks dropped, lowercased.
/// "Éclair" keys as "eclair".
fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Locale-style title order: base letters first, then accents, then case.
fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// Derive the filtered and sorted display sequence. The collection itself is
/// only borrowed, so its manual order is untouched.
pub fn project<'a>(tasks: &'a [Task], query: &ViewQuery, today: NaiveDate) -> Vec<&'a Task> {
    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|t| matches_search(t, &query.search))
        .filter(|t| query.status.accepts(t, today))
        .collect();
    // sort_by is stable
    view.sort_by(|a, b| compare(a, b, query.sort));
    view
}

/// Counts shown on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl TaskStats {
    pub fn open(&self) -> usize {
        self.total - self.completed
    }
}

/// Compute statistics over the live collection
pub fn stats(tasks: &[Task], today: NaiveDate) -> TaskStats {
    TaskStats {
        total: tasks.len(),
        completed: tasks.iter().filter(|t| t.completed).count(),
        overdue: tasks.iter().filter(|t| t.is_overdue(today)).count(),
    }
}
