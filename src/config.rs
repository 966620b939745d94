use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::Location;

/// Database used when neither the record type nor the config names one
pub const DEFAULT_DATABASE: &str = "robomodel";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoboConfig {
    /// Directory holding the `<name>.db` files
    pub data_dir: Option<String>,
    /// Default database name
    pub database: Option<String>,
    /// Keep every database in memory (nothing touches the filesystem)
    #[serde(default)]
    pub in_memory: bool,
}

impl RoboConfig {
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn with_data_dir(dir: impl Into<String>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn database_name(&self) -> &str {
        self.database
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_DATABASE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir)
    }

    pub fn location(&self) -> Location {
        if self.in_memory {
            Location::Memory
        } else {
            Location::Directory(self.data_dir())
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("robomodel.toml")
}

pub fn default_data_dir() -> PathBuf {
    PathBuf::from(".robomodel")
}

pub fn database_path_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.db", name))
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RoboConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RoboConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RoboConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Add the data directory to `<project_root>/.gitignore` unless already listed.
pub fn ensure_gitignore(project_root: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = format!("{}/", data_dir.display().to_string().trim_end_matches('/'));

    let mut content = if gitignore_path.exists() {
        std::fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };
    if content.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RoboConfig::default();
        assert_eq!(config.database_name(), "robomodel");
        assert_eq!(config.data_dir(), PathBuf::from(".robomodel"));
        assert_eq!(config.location(), Location::Directory(PathBuf::from(".robomodel")));
        assert_eq!(RoboConfig::in_memory().location(), Location::Memory);
        assert_eq!(
            database_path_in(Path::new("data"), "notes"),
            PathBuf::from("data").join("notes.db")
        );
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("robomodel.toml");
        let config = RoboConfig {
            data_dir: Some("db".to_string()),
            database: Some("notes".to_string()),
            in_memory: false,
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.database_name(), "notes");
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_in_memory_defaults_to_false() {
        let config: RoboConfig = toml::from_str("database = \"x\"").unwrap();
        assert!(!config.in_memory);
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();

        ensure_gitignore(dir.path(), Path::new(".robomodel")).unwrap();
        ensure_gitignore(dir.path(), Path::new(".robomodel")).unwrap();

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(contents, "target\n.robomodel/\n");
    }
}
