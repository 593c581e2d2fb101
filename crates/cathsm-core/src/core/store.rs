use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_DIR_NAME: &str = "cath-swissmodel-api";
const CONFIG_FILE_NAME: &str = "config.toml";

pub const API_TOKEN_KEY: &str = "api_token";

type Sections = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Config file I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Config file '{path}' is corrupt: {source}")]
    Corrupt {
        path: String,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config for '{path}': {source}")]
    Serialize {
        path: String,
        source: toml::ser::Error,
    },

    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Config store lock was poisoned")]
    Poisoned,
}

/// A file-backed `(section, key) -> value` store.
///
/// Every mutation rewrites the whole file before returning.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    sections: Sections,
}

impl ConfigStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let sections = if path.is_file() {
            let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
            let sections: Sections = toml::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: path.display().to_string(),
                source: e,
            })?;
            info!("Loaded config from {:?}", path);
            sections
        } else {
            Sections::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            sections,
        })
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        ProjectDirs::from("", "", CONFIG_DIR_NAME)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or(StoreError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_some()
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }

    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut sections = self.sections.clone();
        sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.commit(sections)?;
        debug!("Set config [{}] {}", section, key);
        Ok(())
    }

    pub fn remove(&mut self, section: &str, key: &str) -> Result<Option<String>, StoreError> {
        let mut sections = self.sections.clone();
        let removed = sections.get_mut(section).and_then(|keys| keys.remove(key));
        if removed.is_some() {
            self.commit(sections)?;
        }
        Ok(removed)
    }

    /// Removes every key of `section`, leaving all other sections untouched.
    pub fn delete_section(&mut self, section: &str) -> Result<bool, StoreError> {
        let mut sections = self.sections.clone();
        let existed = sections.remove(section).is_some();
        self.commit(sections)?;
        Ok(existed)
    }

    /// Replaces the in-memory sections only once `sections` is on disk.
    fn commit(&mut self, sections: Sections) -> Result<(), StoreError> {
        self.write(&sections)?;
        self.sections = sections;
        Ok(())
    }

    fn write(&self, sections: &Sections) -> Result<(), StoreError> {
        let path = self.path.display().to_string();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }
        let content = toml::to_string(sections).map_err(|e| StoreError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&self.path, content).map_err(|e| StoreError::Io { path, source: e })?;
        debug!("Saved config to {:?}", self.path);
        Ok(())
    }
}

pub type SharedStore = Arc<Mutex<ConfigStore>>;

pub fn shared(store: ConfigStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// A handle onto one named section of a shared [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct ConfigSection {
    store: SharedStore,
    name: String,
}

impl ConfigSection {
    pub fn new(store: SharedStore, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(&self.name, key).map(str::to_string))
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains(&self.name, key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.set(&self.name, key, value)
    }

    pub fn remove(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.lock()?.remove(&self.name, key)
    }

    pub fn clear(&self) -> Result<bool, StoreError> {
        info!("Clearing existing config for section: '{}'", self.name);
        self.lock()?.delete_section(&self.name)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ConfigStore>, StoreError> {
        self.store.lock().map_err(|_| StoreError::Poisoned)
    }
}
