//! Store registry
//!
//! Maps a database name to at most one live [`SqliteStore`]. Stores are
//! opened on first use and stay open until closed. The registry is not
//! synchronized: it is `!Sync` and meant to have a single owner.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::{database_path_in, ensure_db_dir};
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Where databases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// One private in-memory database per name, lost when closed
    Memory,
    /// `<dir>/<name>.db` files
    Directory(PathBuf),
}

pub struct Registry {
    location: Location,
    stores: RefCell<HashMap<String, Rc<SqliteStore>>>,
}

impl Registry {
    pub fn new(location: Location) -> Self {
        Self {
            location,
            stores: RefCell::new(HashMap::new()),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// File backing `name`; `None` in memory mode
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        match &self.location {
            Location::Memory => None,
            Location::Directory(dir) => Some(database_path_in(dir, name)),
        }
    }

    /// The open store for `name`, opening it if needed.
    pub fn open(&self, name: &str) -> Result<Rc<SqliteStore>> {
        if let Some(store) = self.stores.borrow().get(name) {
            return Ok(Rc::clone(store));
        }

        let store = match self.path_for(name) {
            None => SqliteStore::open_in_memory()?,
            Some(path) => {
                ensure_db_dir(&path)?;
                SqliteStore::open(&path)?
            }
        };
        tracing::trace!(database = name, "registered store");

        let store = Rc::new(store);
        self.stores
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&store));
        Ok(store)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.stores.borrow().contains_key(name)
    }

    pub fn open_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stores.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close the connection of `name`. Returns false if it was not open.
    ///
    /// A store still held by a caller stays registered and the call fails
    /// with [`Error::InUse`], so a name never has two live connections.
    pub fn close(&self, name: &str) -> Result<bool> {
        let mut stores = self.stores.borrow_mut();
        let Some(store) = stores.remove(name) else {
            return Ok(false);
        };

        match Rc::try_unwrap(store) {
            Ok(store) => {
                drop(stores);
                store.close()?;
                tracing::trace!(database = name, "closed store");
                Ok(true)
            }
            Err(store) => {
                stores.insert(name.to_string(), store);
                Err(Error::InUse(name.to_string()))
            }
        }
    }

    pub fn close_all(&self) -> Result<()> {
        for name in self.open_names() {
            self.close(&name)?;
        }
        Ok(())
    }

    /// Close `name` and remove its file. Returns true if a file was removed.
    pub fn delete(&self, name: &str) -> Result<bool> {
        self.close(name)?;
        match self.path_for(name) {
            Some(path) if path.exists() => {
                remove_database_file(&path)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn remove_database_file(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)?;
    // journal left behind by an unclean shutdown
    let journal = PathBuf::from(format!("{}-journal", path.display()));
    if journal.exists() {
        std::fs::remove_file(journal)?;
    }
    Ok(())
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("location", &self.location)
            .field("open", &self.open_names())
            .finish()
    }
}
