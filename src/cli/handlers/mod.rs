use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::paths;
use crate::io::store::FileStore;
use crate::model::config::Config;
use crate::model::task::TaskFields;
use crate::model::user::ProfileUpdate;
use crate::ops::session::{self, Signup, StoredSession};
use crate::ops::todo_ops::{TodoError, TodoManager, parse_due_date};
use crate::ops::view::{self, ViewQuery};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Everything a command needs from the environment
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    pub json: bool,
}

impl Context {
    /// Resolve the data directory and read its config
    pub fn new(data_dir: Option<&Path>, json: bool) -> Result<Self, config_io::ConfigError> {
        let data_dir = paths::data_dir(data_dir);
        let config = config_io::load_config(&data_dir)?;
        Ok(Context {
            data_dir,
            config,
            json,
        })
    }

    fn store(&self) -> Result<FileStore, Box<dyn std::error::Error>> {
        Ok(FileStore::open(&self.data_dir)?)
    }

    fn manager(&self) -> Result<TodoManager<FileStore>, Box<dyn std::error::Error>> {
        let store = self.store()?;
        let session = StoredSession::read(&store);
        match TodoManager::open(store, &session) {
            Ok(m) => Ok(m),
            Err(e) => Err(format!("{} (run `tb login` first)", e).into()),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(command: Commands, ctx: &Context) -> CmdResult {
    match command {
        // Accounts
        Commands::Signup(args) => cmd_signup(args, ctx),
        Commands::Login(args) => cmd_login(args, ctx),
        Commands::Logout => cmd_logout(ctx),
        Commands::Whoami => cmd_whoami(ctx),
        Commands::Profile(args) => cmd_profile(args, ctx),

        // Read commands
        Commands::List(args) => cmd_list(args, ctx),
        Commands::Show(args) => cmd_show(args, ctx),
        Commands::Stats => cmd_stats(ctx),

        // Write commands
        Commands::Add(args) => cmd_add(args, ctx),
        Commands::Edit(args) => cmd_edit(args, ctx),
        Commands::Rm(args) => cmd_rm(args, ctx),
        Commands::Toggle(args) => cmd_toggle(args, ctx),
        Commands::Mv(args) => cmd_mv(args, ctx),

        Commands::Config(args) => cmd_config(args, ctx),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Take the password from the flag/env, else the first line of stdin.
fn password_or_stdin(password: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(p) = password {
        return Ok(p);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        return Err("password required (--password, TASKBOARD_PASSWORD, or stdin)".into());
    }
    Ok(line)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

fn cmd_signup(args: SignupArgs, ctx: &Context) -> CmdResult {
    let mut store = ctx.store()?;
    let password = password_or_stdin(args.password)?;
    let confirm_password = args.confirm_password.unwrap_or_else(|| password.clone());
    let user = session::signup(
        &mut store,
        Signup {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            password,
            confirm_password,
        },
    )?;
    if ctx.json {
        print_json(&user)
    } else {
        println!("Account created for {}. Log in with `tb login`.", user.email);
        Ok(())
    }
}

fn cmd_login(args: LoginArgs, ctx: &Context) -> CmdResult {
    let mut store = ctx.store()?;
    let password = password_or_stdin(args.password)?;
    let user = session::login(&mut store, &args.email, &password)?;
    if ctx.json {
        print_json(&user)
    } else {
        println!("Logged in as {}", user.display_name());
        Ok(())
    }
}

fn cmd_logout(ctx: &Context) -> CmdResult {
    let mut store = ctx.store()?;
    session::logout(&mut store)?;
    if !ctx.json {
        println!("Logged out");
    }
    Ok(())
}

fn cmd_whoami(ctx: &Context) -> CmdResult {
    let store = ctx.store()?;
    let user = session::current_user(&store).ok_or("not logged in")?;
    if ctx.json {
        return print_json(&user);
    }
    for line in format_user(&user) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_profile(args: ProfileArgs, ctx: &Context) -> CmdResult {
    let update = ProfileUpdate {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        address: args.address,
        contact_number: args.contact_number,
        birthday: args.birthday,
        profile_photo: args.photo,
    };
    if update.is_empty() {
        return cmd_whoami(ctx);
    }
    let mut store = ctx.store()?;
    let user = session::update_profile(&mut store, update)?;
    if ctx.json {
        return print_json(&user);
    }
    println!("Profile updated");
    for line in format_user(&user) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(args: ListArgs, ctx: &Context) -> CmdResult {
    let manager = ctx.manager()?;
    let today = today();
    let query = ViewQuery {
        search: args.search,
        sort: args.sort.unwrap_or(ctx.config.view.sort),
        status: args.status.unwrap_or(ctx.config.view.status),
    };
    let tasks = view::project(manager.tasks(), &query, today);
    let stats = view::stats(manager.tasks(), today);

    if ctx.json {
        return print_json(&ListJson {
            tasks: tasks.iter().map(|t| task_to_json(t, today)).collect(),
            stats,
        });
    }

    if tasks.is_empty() {
        if manager.tasks().is_empty() {
            println!("No tasks yet. Add one with `tb add <TITLE> --due <DATE>`.");
        } else {
            println!("No matching tasks");
        }
        return Ok(());
    }
    for task in tasks {
        println!("{}", format_task_line(task, today));
    }
    println!();
    println!("{}", format_stats(&stats));
    Ok(())
}

fn cmd_show(args: IdArg, ctx: &Context) -> CmdResult {
    let manager = ctx.manager()?;
    let id = manager.resolve_id(&args.id)?;
    let task = manager.get(&id).ok_or("task disappeared")?;
    if ctx.json {
        return print_json(&task_to_json(task, today()));
    }
    for line in format_task_detail(task, today()) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_stats(ctx: &Context) -> CmdResult {
    let manager = ctx.manager()?;
    let stats = view::stats(manager.tasks(), today());
    if ctx.json {
        print_json(&stats)
    } else {
        println!("{}", format_stats(&stats));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, ctx: &Context) -> CmdResult {
    let mut manager = ctx.manager()?;
    let fields = TaskFields {
        title: args.title,
        description: args.description,
        due_date: Some(parse_due_date(&args.due)?),
        priority: args.priority,
    };
    let task = manager.create(fields)?;
    if ctx.json {
        print_json(&task_to_json(&task, today()))
    } else {
        println!("Added {}", task_label(&task));
        Ok(())
    }
}

fn cmd_edit(args: EditArgs, ctx: &Context) -> CmdResult {
    let mut manager = ctx.manager()?;
    let id = manager.resolve_id(&args.id)?;
    let current = manager.get(&id).ok_or("task disappeared")?;
    let due_date = match args.due {
        Some(due) => parse_due_date(&due)?,
        None => current.due_date,
    };
    let fields = TaskFields {
        title: args.title.unwrap_or_else(|| current.title.clone()),
        description: args
            .description
            .unwrap_or_else(|| current.description.clone()),
        due_date: Some(due_date),
        priority: args.priority.unwrap_or(current.priority),
    };
    manager.update(&id, fields)?;
    let task = manager.get(&id).ok_or("task disappeared")?;
    if ctx.json {
        print_json(&task_to_json(task, today()))
    } else {
        println!("Updated {}", task_label(task));
        Ok(())
    }
}

fn cmd_rm(args: IdArg, ctx: &Context) -> CmdResult {
    let mut manager = ctx.manager()?;
    // Deleting an unknown id is not an error, an ambiguous prefix is
    let id = match manager.resolve_id(&args.id) {
        Ok(id) => id,
        Err(TodoError::NotFound(_)) => args.id.clone(),
        Err(e) => return Err(e.into()),
    };
    let removed = manager.delete(&id)?;
    if ctx.json {
        print_json(&serde_json::json!({ "id": id, "removed": removed }))
    } else {
        if removed {
            println!("Deleted {}", short_id(&id));
        } else {
            println!("No task {}", args.id);
        }
        Ok(())
    }
}

fn cmd_toggle(args: IdArg, ctx: &Context) -> CmdResult {
    let mut manager = ctx.manager()?;
    let id = manager.resolve_id(&args.id)?;
    let completed = manager.toggle_complete(&id)?;
    if ctx.json {
        print_json(&serde_json::json!({ "id": id, "completed": completed }))
    } else {
        let state = if completed { "done" } else { "open" };
        println!("{} is {}", short_id(&id), state);
        Ok(())
    }
}

fn cmd_mv(args: MvArgs, ctx: &Context) -> CmdResult {
    let mut manager = ctx.manager()?;
    let dragged = manager.resolve_id(&args.id)?;
    let target = manager.resolve_id(&args.before)?;
    let moved = manager.reorder(&dragged, &target)?;
    if ctx.json {
        let order: Vec<&str> = manager.tasks().iter().map(|t| t.id.as_str()).collect();
        return print_json(&serde_json::json!({ "moved": moved, "order": order }));
    }
    if moved {
        println!("Moved {} before {}", short_id(&dragged), short_id(&target));
    } else {
        println!("Nothing to move");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(args: ConfigArgs, ctx: &Context) -> CmdResult {
    if args.sort.is_none() && args.status.is_none() {
        if ctx.json {
            return print_json(&ctx.config);
        }
        println!("data dir: {}", ctx.data_dir.display());
        println!("sort: {}", ctx.config.view.sort.as_str());
        println!("status: {}", ctx.config.view.status.as_str());
        println!("log level: {}", ctx.config.log.level);
        return Ok(());
    }

    std::fs::create_dir_all(&ctx.data_dir)?;
    let (_config, mut doc) = config_io::read_config(&ctx.data_dir)?;
    if let Some(sort) = args.sort {
        config_io::set_default_sort(&mut doc, sort);
    }
    if let Some(status) = args.status {
        config_io::set_default_status(&mut doc, status);
    }
    config_io::write_config(&ctx.data_dir, &doc)?;
    if !ctx.json {
        println!("Config saved");
    }
    Ok(())
}
