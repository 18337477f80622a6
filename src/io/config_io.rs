use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;
use crate::ops::view::{SortKey, StatusFilter};

pub const CONFIG_FILE: &str = "config.toml";

/// Error type for config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse config.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
}

/// Load config.toml from the data directory. A missing file yields defaults.
pub fn load_config(data_dir: &Path) -> Result<Config, ConfigError> {
    Ok(read_config(data_dir)?.0)
}

/// Read the config, returning both the parsed config and the raw toml_edit
/// document for round-trip-safe editing.
pub fn read_config(data_dir: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    let config_path = data_dir.join(CONFIG_FILE);
    let config_text = match fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: config_path,
                source: e,
            });
        }
    };
    let config: Config = toml::from_str(&config_text)?;
    let doc: toml_edit::DocumentMut = config_text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let config_path = data_dir.join(CONFIG_FILE);
    crate::io::store::atomic_write(&config_path, doc.to_string().as_bytes()).map_err(|e| {
        ConfigError::WriteError {
            path: config_path,
            source: e,
        }
    })
}

fn view_table(doc: &mut toml_edit::DocumentMut) -> &mut toml_edit::Item {
    if !doc.contains_key("view") {
        doc["view"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    &mut doc["view"]
}

/// Set the default sort key in the config document
pub fn set_default_sort(doc: &mut toml_edit::DocumentMut, sort: SortKey) {
    view_table(doc)["sort"] = toml_edit::value(sort.as_str());
}

/// Set the default status filter in the config document
pub fn set_default_status(doc: &mut toml_edit::DocumentMut, status: StatusFilter) {
    view_table(doc)["status"] = toml_edit::value(status.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"# taskboard settings
[view]
sort = "priority" # most urgent first

[log]
level = "info"
"#
    }

    #[test]
    fn test_missing_config_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.view.sort, SortKey::DueDate);
        assert_eq!(config.view.status, StatusFilter::All);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), sample_config()).unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.view.sort, SortKey::Priority);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_round_trip_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        fs::write(&path, sample_config()).unwrap();

        let (_config, doc) = read_config(tmp.path()).unwrap();
        write_config(tmp.path(), &doc).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), sample_config());
    }

    #[test]
    fn test_set_default_sort_keeps_comments() {
        let mut doc: toml_edit::DocumentMut = sample_config().parse().unwrap();
        set_default_sort(&mut doc, SortKey::Title);
        let result = doc.to_string();
        assert!(result.contains("# taskboard settings"));
        let config: Config = toml::from_str(&result).unwrap();
        assert_eq!(config.view.sort, SortKey::Title);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_set_default_status_on_empty_doc() {
        let mut doc = toml_edit::DocumentMut::new();
        set_default_status(&mut doc, StatusFilter::Open);
        let config: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.view.status, StatusFilter::Open);
    }

    #[test]
    fn test_bad_config_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[view]\nsort = \"color\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
