use serde::{Deserialize, Serialize};

use crate::ops::view::{SortKey, StatusFilter};

/// Configuration from config.toml in the data directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Default sort for `tb list`
    #[serde(default)]
    pub sort: SortKey,
    /// Default status filter for `tb list`
    #[serde(default)]
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// tracing filter directive used when neither -v nor TASKBOARD_LOG is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
