use chrono::NaiveDate;
use serde::Serialize;

use crate::model::task::Task;
use crate::model::user::User;
use crate::ops::view::TaskStats;
use crate::util::unicode::{fit_to_width, truncate_to_width};

/// Characters of the id shown in listings
pub const SHORT_ID_LEN: usize = 8;
const TITLE_WIDTH: usize = 36;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub overdue: bool,
}

#[derive(Serialize)]
pub struct ListJson<'a> {
    pub tasks: Vec<TaskJson<'a>>,
    pub stats: TaskStats,
}

pub fn task_to_json(task: &Task, today: NaiveDate) -> TaskJson<'_> {
    TaskJson {
        task,
        overdue: task.is_overdue(today),
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Leading characters of a task id (ids are ASCII)
pub fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn checkbox(task: &Task) -> &'static str {
    if task.completed { "[x]" } else { "[ ]" }
}

/// One listing line: `[ ] 0190a1b2  Title…  high      2024-03-01 !`
pub fn format_task_line(task: &Task, today: NaiveDate) -> String {
    let overdue = if task.is_overdue(today) { " overdue" } else { "" };
    format!(
        "{} {}  {}  {:<8}  {}{}",
        checkbox(task),
        short_id(&task.id),
        fit_to_width(&task.title, TITLE_WIDTH),
        task.priority.as_str(),
        task.due_date.format("%Y-%m-%d"),
        overdue
    )
}

/// Full detail for `tb show`
pub fn format_task_detail(task: &Task, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![format!("{} {}", checkbox(task), task.title)];
    lines.push(format!("id: {}", task.id));
    lines.push(format!("priority: {}", task.priority));
    let mut due = format!("due: {}", task.due_date.format("%Y-%m-%d"));
    if task.is_overdue(today) {
        due.push_str(" (overdue)");
    }
    lines.push(due);
    lines.push(format!(
        "created: {}",
        task.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if !task.description.is_empty() {
        lines.push("description:".to_string());
        for line in task.description.lines() {
            lines.push(format!("  {}", line));
        }
    }
    lines
}

pub fn format_stats(stats: &TaskStats) -> String {
    format!(
        "{} total, {} completed, {} open, {} overdue",
        stats.total,
        stats.completed,
        stats.open(),
        stats.overdue
    )
}

/// Profile lines for `tb whoami` / `tb profile`
pub fn format_user(user: &User) -> Vec<String> {
    let mut lines = vec![format!("{} <{}>", user.display_name(), user.email)];
    let optional = [
        ("address", &user.address),
        ("contact", &user.contact_number),
        ("birthday", &user.birthday),
        ("photo", &user.profile_photo),
    ];
    for (label, value) in optional {
        if let Some(v) = value {
            lines.push(format!("{}: {}", label, v));
        }
    }
    lines
}

/// One-line confirmation naming a task
pub fn task_label(task: &Task) -> String {
    format!("{} {}", short_id(&task.id), truncate_to_width(&task.title, 60))
}
