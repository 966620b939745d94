//! The context attached to every record and manager

use std::path::Path;
use std::rc::Rc;

use crate::config::{load_config, RoboConfig};
use crate::field::{Model, Schema};
use crate::manager::Manager;
use crate::storage::{Location, Registry, SqliteStore};
use crate::Result;

struct Inner {
    config: RoboConfig,
    registry: Registry,
}

/// Configuration plus the store registry, shared by cheap clones.
///
/// A context is `!Send`: records and managers created from it stay on the
/// thread that owns it.
#[derive(Clone)]
pub struct Context {
    inner: Rc<Inner>,
}

impl Context {
    pub fn new(config: RoboConfig) -> Self {
        let registry = Registry::new(config.location());
        Self {
            inner: Rc::new(Inner { config, registry }),
        }
    }

    /// Every database lives in memory
    pub fn in_memory() -> Self {
        Self::new(RoboConfig::in_memory())
    }

    /// Load `robomodel.toml` (or `path`); defaults when the file is absent
    pub fn from_config_file(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = load_config(path)?.unwrap_or_default();
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &RoboConfig {
        &self.inner.config
    }

    pub fn location(&self) -> &Location {
        self.inner.registry.location()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn default_database(&self) -> &str {
        self.inner.config.database_name()
    }

    /// Database a record type lives in
    pub fn database_for<T>(&self, schema: &Schema<T>) -> String {
        match schema.meta().database {
            Some(name) => name.to_string(),
            None => self.default_database().to_string(),
        }
    }

    pub fn database(&self, name: &str) -> Result<Rc<SqliteStore>> {
        self.inner.registry.open(name)
    }

    pub fn close_database(&self, name: &str) -> Result<bool> {
        self.inner.registry.close(name)
    }

    pub fn delete_database(&self, name: &str) -> Result<bool> {
        self.inner.registry.delete(name)
    }

    pub fn manager<T: Model>(&self) -> Manager<T> {
        Manager::new(self)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_name() {
        assert_eq!(Context::in_memory().default_database(), "robomodel");

        let config = RoboConfig {
            database: Some("notes".to_string()),
            ..RoboConfig::in_memory()
        };
        assert_eq!(Context::new(config).default_database(), "notes");
    }

    #[test]
    fn test_clones_share_stores() {
        let context = Context::in_memory();
        let copy = context.clone();
        context
            .database("a")
            .unwrap()
            .execute("CREATE TABLE T (x TEXT)")
            .unwrap();
        assert_eq!(copy.database("a").unwrap().table_names().unwrap(), vec!["T".to_string()]);
    }

    #[test]
    fn test_close_database_keeps_a_held_store() {
        let context = Context::in_memory();
        let held = context.database("a").unwrap();
        held.execute("CREATE TABLE T (x TEXT)").unwrap();

        assert!(matches!(context.close_database("a"), Err(crate::Error::InUse(_))));
        assert_eq!(context.database("a").unwrap().table_names().unwrap(), vec!["T".to_string()]);

        drop(held);
        assert!(context.close_database("a").unwrap());
        assert!(context.database("a").unwrap().table_names().unwrap().is_empty());
    }

    #[test]
    fn test_from_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let context = Context::from_config_file(Some(&dir.path().join("robomodel.toml"))).unwrap();
        assert_eq!(context.config(), &RoboConfig::default());
    }
}
