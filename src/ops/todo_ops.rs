use chrono::{NaiveDate, Utc};

use crate::io::store::{BlobStore, StoreError, TODOS_BLOB, read_json, write_json};
use crate::model::task::{Task, TaskFields, parse_date_part};
use crate::ops::session::SessionContext;

/// Shortest id prefix accepted by [`TodoManager::resolve_id`]
pub const MIN_ID_PREFIX: usize = 4;

/// Error type for to-do collection operations
#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("{0}")]
    Validation(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task id prefix is ambiguous: {0}")]
    AmbiguousId(String),
    #[error("not logged in")]
    NoSession,
    #[error("changes not saved: {0}")]
    Storage(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Parse a due date. Accepts `YYYY-MM-DD`, or an ISO date-time whose date
/// part comes before the `T`.
pub fn parse_due_date(text: &str) -> Result<NaiveDate, TodoError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TodoError::Validation("due date is required".into()));
    }
    parse_date_part(text).ok_or_else(|| {
        TodoError::Validation(format!("invalid due date '{}' (expected YYYY-MM-DD)", text))
    })
}

fn validate(fields: &TaskFields) -> Result<NaiveDate, TodoError> {
    if fields.title.trim().is_empty() {
        return Err(TodoError::Validation("title is required".into()));
    }
    fields
        .due_date
        .ok_or_else(|| TodoError::Validation("due date is required".into()))
}

/// Generate a fresh task id. UUID v7 ids sort by creation time.
fn new_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// The active user's ordered to-do collection.
///
/// Every successful mutation flushes the whole `todos` blob: the persisted
/// set is re-read, this user's records are replaced by the in-memory
/// collection, and the result is written back. Other users' records pass
/// through untouched.
#[derive(Debug)]
pub struct TodoManager<S: BlobStore> {
    store: S,
    user_id: String,
    tasks: Vec<Task>,
    unsaved: bool,
}

impl<S: BlobStore> TodoManager<S> {
    /// Open the collection for whoever the session says is logged in.
    pub fn open(store: S, session: &dyn SessionContext) -> Result<Self, TodoError> {
        let user_id = session.active_user_id().ok_or(TodoError::NoSession)?;
        Ok(Self::load(store, &user_id))
    }

    /// Load the records owned by `user_id`, in persisted order. Missing or
    /// unreadable storage yields an empty collection.
    pub fn load(store: S, user_id: &str) -> Self {
        let tasks = match read_json::<Vec<Task>, _>(&store, TODOS_BLOB) {
            Ok(all) => all
                .unwrap_or_default()
                .into_iter()
                .filter(|t| t.user_id == user_id)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "could not load tasks, starting empty");
                Vec::new()
            }
        };
        tracing::debug!(user = user_id, count = tasks.len(), "tasks loaded");
        TodoManager {
            store,
            user_id: user_id.to_string(),
            tasks,
            unsaved: false,
        }
    }

    /// The scoped collection in manual order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// True when the last flush failed and memory is ahead of storage
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Resolve an exact id, or a unique prefix of at least
    /// [`MIN_ID_PREFIX`] characters, to a full id.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String, TodoError> {
        if self.get(id_or_prefix).is_some() {
            return Ok(id_or_prefix.to_string());
        }
        if id_or_prefix.chars().count() < MIN_ID_PREFIX {
            return Err(TodoError::NotFound(id_or_prefix.to_string()));
        }
        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (Some(_), Some(_)) => Err(TodoError::AmbiguousId(id_or_prefix.to_string())),
            (None, _) => Err(TodoError::NotFound(id_or_prefix.to_string())),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Append a new task owned by the active user.
    pub fn create(&mut self, fields: TaskFields) -> Result<Task, TodoError> {
        let due_date = validate(&fields)?;
        let task = Task {
            id: new_task_id(),
            title: fields.title,
            description: fields.description,
            due_date,
            priority: fields.priority,
            completed: false,
            created_at: Utc::now(),
            user_id: self.user_id.clone(),
        };
        tracing::debug!(id = %task.id, "task created");
        self.tasks.push(task.clone());
        self.flush()?;
        Ok(task)
    }

    /// Replace a task's title, description, due date and priority in place.
    pub fn update(&mut self, id: &str, fields: TaskFields) -> Result<(), TodoError> {
        let idx = self
            .position(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        let due_date = validate(&fields)?;
        let task = &mut self.tasks[idx];
        task.title = fields.title;
        task.description = fields.description;
        task.due_date = due_date;
        task.priority = fields.priority;
        tracing::debug!(id, "task updated");
        self.flush()
    }

    /// Remove a task. Returns false (and writes nothing) if it was absent.
    pub fn delete(&mut self, id: &str) -> Result<bool, TodoError> {
        let Some(idx) = self.position(id) else {
            tracing::debug!(id, "delete of absent task ignored");
            return Ok(false);
        };
        self.tasks.remove(idx);
        tracing::debug!(id, "task deleted");
        self.flush()?;
        Ok(true)
    }

    /// Flip the completion flag. Returns the new value.
    pub fn toggle_complete(&mut self, id: &str) -> Result<bool, TodoError> {
        let idx = self
            .position(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        let task = &mut self.tasks[idx];
        task.completed = !task.completed;
        let completed = task.completed;
        tracing::debug!(id, completed, "task toggled");
        self.flush()?;
        Ok(completed)
    }

    /// Move `dragged_id` to sit immediately before `target_id`.
    ///
    /// The dragged record is removed first and then inserted at the target's
    /// index in the shortened list, so it always lands before the target
    /// whichever direction it travels. Returns false without writing when
    /// the ids are equal or either is absent.
    pub fn reorder(&mut self, dragged_id: &str, target_id: &str) -> Result<bool, TodoError> {
        if dragged_id == target_id {
            return Ok(false);
        }
        let (Some(from), Some(_)) = (self.position(dragged_id), self.position(target_id)) else {
            tracing::debug!(dragged_id, target_id, "reorder with unknown id ignored");
            return Ok(false);
        };
        let task = self.tasks.remove(from);
        // Target is still present, only its index may have shifted
        let to = self.position(target_id).unwrap_or(self.tasks.len());
        self.tasks.insert(to, task);
        tracing::debug!(dragged_id, target_id, from, to, "task reordered");
        self.flush()?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the whole collection back, merged with other users' records.
    ///
    /// Called after every mutation; callers may also call it to retry after a
    /// `Storage` error. The in-memory state is kept either way.
    pub fn flush(&mut self) -> Result<(), TodoError> {
        match self.try_flush() {
            Ok(()) => {
                self.unsaved = false;
                Ok(())
            }
            Err(e) => {
                self.unsaved = true;
                tracing::warn!(error = %e, "flush failed, changes kept in memory");
                Err(TodoError::Storage(e))
            }
        }
    }

    fn try_flush(&mut self) -> Result<(), StoreError> {
        let persisted = read_json::<Vec<Task>, _>(&self.store, TODOS_BLOB)?.unwrap_or_default();
        let merged = merge_scope(persisted, &self.user_id, &self.tasks);
        write_json(&mut self.store, TODOS_BLOB, &merged)?;
        tracing::debug!(total = merged.len(), scoped = self.tasks.len(), "tasks flushed");
        Ok(())
    }
}

/// Replace `user_id`'s records in `persisted` with `scoped`.
///
/// The scoped block takes the slot of the user's first persisted record (or
/// goes at the end if there was none); all other records keep their order.
pub fn merge_scope(persisted: Vec<Task>, user_id: &str, scoped: &[Task]) -> Vec<Task> {
    let mut merged = Vec::with_capacity(persisted.len() + scoped.len());
    let mut placed = false;
    for task in persisted {
        if task.user_id == user_id {
            if !placed {
                merged.extend(scoped.iter().cloned());
                placed = true;
            }
        } else {
            merged.push(task);
        }
    }
    if !placed {
        merged.extend(scoped.iter().cloned());
    }
    merged
}
