//! Client-local key-value storage.
//!
//! Values are JSON documents addressed by a string key. A missing or corrupt
//! entry reads as absent; only writes can fail.

use crate::error::{GigError, GigResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CURRENT_USER_KEY: &str = "current_user";
pub const USER_DIRECTORY_KEY: &str = "users";
pub const TOKEN_KEY: &str = "token";
pub const CURRENT_IDENTITY_KEY: &str = "current_identity";
const PROFILE_PREFIX: &str = "profile_";

/// Key holding the local profile extras of an external identity
pub fn profile_key(uid: &str) -> String {
    format!("{}{}", PROFILE_PREFIX, uid)
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> GigResult<()>;
    fn remove(&self, key: &str) -> GigResult<()>;
}

/// Read and decode a JSON entry; undecodable content is reported and treated as absent
pub fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("Warning: ignoring corrupt stored entry '{}': {}", key, e);
            None
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> GigResult<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// One `<key>.json` file per entry under a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: &Path) -> GigResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            GigError::Persistence(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> GigResult<()> {
        let path = self.path_for(key);
        // Entries are replaced whole, never partially
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| GigError::Persistence(format!("cannot write '{}': {}", key, e)))
    }

    fn remove(&self, key: &str) -> GigResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GigError::Persistence(format!(
                "cannot remove '{}': {}",
                key, e
            ))),
        }
    }
}

/// In-process store, used by tests and `--ephemeral`
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> GigResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> GigResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> GigResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> GigResult<()> {
        (**self).remove(key)
    }
}
