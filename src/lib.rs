//! A local-first task board.
//!
//! Accounts, a profile, and a hand-ordered to-do list, persisted as whole
//! JSON blobs in a data directory. The [`ops::todo_ops::TodoManager`] owns
//! the active user's collection and flushes it after every change;
//! [`ops::view`] derives filtered and sorted views without touching the
//! stored order.

pub mod cli;
pub mod io;
pub mod log;
pub mod model;
pub mod ops;
pub mod util;
