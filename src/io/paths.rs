use std::path::{Path, PathBuf};

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "TASKBOARD_DIR";

/// Resolve the data directory: explicit override, then `$TASKBOARD_DIR`,
/// then `$XDG_DATA_HOME/taskboard`, then `~/.local/share/taskboard`.
pub fn data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    let data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_home().join(".local").join("share"));
    data_home.join("taskboard")
}

/// Get the user's home directory
fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}
