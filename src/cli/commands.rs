use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::model::task::Priority;
use crate::ops::view::{SortKey, StatusFilter};

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - a to-do list kept in plain JSON"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account
    Signup(SignupArgs),
    /// Log in
    Login(LoginArgs),
    /// Log out
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show or edit your profile
    Profile(ProfileArgs),
    /// Add a task (appended to the end of your list)
    Add(AddArgs),
    /// Edit a task's title, description, due date or priority
    Edit(EditArgs),
    /// Delete a task
    Rm(IdArg),
    /// Mark a task done, or open again
    Toggle(IdArg),
    /// Move a task to sit just before another
    Mv(MvArgs),
    /// List tasks
    List(ListArgs),
    /// Show one task
    Show(IdArg),
    /// Show task counts
    Stats,
    /// Show or change default view settings
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Account args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SignupArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    /// Password (read from stdin if omitted)
    #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Password confirmation (defaults to the password)
    #[arg(long)]
    pub confirm_password: Option<String>,
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Password (read from stdin if omitted)
    #[arg(long, env = "TASKBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Each flag replaces one field; pass an empty string to clear an optional one.
#[derive(Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub contact_number: Option<String>,
    /// Birthday (YYYY-MM-DD)
    #[arg(long)]
    pub birthday: Option<String>,
    /// Avatar image path or URL
    #[arg(long)]
    pub photo: Option<String>,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct IdArg {
    /// Task ID (or a unique prefix of at least 4 characters)
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: String,
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// low, moderate or high
    #[arg(short, long, default_value = "moderate", value_parser = parse_priority)]
    pub priority: Priority,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(short, long)]
    pub description: Option<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    #[arg(short, long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub id: String,
    /// Task it should end up in front of
    pub before: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks whose title or description contains this text
    #[arg(short, long, default_value = "")]
    pub search: String,
    /// dueDate, priority or title (default from config)
    #[arg(long)]
    pub sort: Option<SortKey>,
    /// all, open, done or overdue (default from config)
    #[arg(long)]
    pub status: Option<StatusFilter>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Set the default sort key
    #[arg(long)]
    pub sort: Option<SortKey>,
    /// Set the default status filter
    #[arg(long)]
    pub status: Option<StatusFilter>,
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s).ok_or_else(|| {
        format!(
            "unknown priority '{}' (expected: low, moderate, high)",
            s
        )
    })
}
