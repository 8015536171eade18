use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Mutex,
        MutexGuard,
    },
};

use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    warn,
};

use crate::core::AffinityError;

const APP_NAME: &str = "affinity";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> Result<T, AffinityError> {
    read_json_file(&get_data_file_path(filename))
}

pub fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> T {
    match load_json::<T>(filename) {
        Ok(data) => data,
        Err(e) => {
            warn!(file = filename, error = %e, "Failed to load data file, using defaults");
            T::default()
        }
    }
}

fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), AffinityError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "Data saved");
    Ok(())
}

fn read_json_file<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, AffinityError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    debug!(path = %path.display(), "Data loaded");
    Ok(data)
}

/// String key-value storage that outlives the process, e.g. the session token.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AffinityError>;
    fn remove(&self, key: &str) -> Result<(), AffinityError>;
    fn clear(&self) -> Result<(), AffinityError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AffinityError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AffinityError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), AffinityError> {
        lock(&self.entries).clear();
        Ok(())
    }
}

/// Key-value store backed by one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    file_path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, AffinityError> {
        let file_path = file_path.into();
        let entries: BTreeMap<String, String> = read_json_file(&file_path)?;
        Ok(Self { file_path, entries: Mutex::new(entries) })
    }

    /// `<app data dir>/<filename>`
    pub fn open_in_app_dir(filename: &str) -> Result<Self, AffinityError> {
        Self::open(get_data_file_path(filename))
    }

    fn update<F: FnOnce(&mut BTreeMap<String, String>)>(&self, change: F) -> Result<(), AffinityError> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        change(&mut next);
        write_json_file(&self.file_path, &next)?;
        *entries = next;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AffinityError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), AffinityError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> Result<(), AffinityError> {
        self.update(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("user_id"), None);
        store.set("user_id", "alice").unwrap();
        assert_eq!(store.get("user_id"), Some("alice".to_string()));
        store.remove("user_id").unwrap();
        assert_eq!(store.get("user_id"), None);
    }

    #[test]
    fn test_json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(!path.exists());
        store.set("access_token", "t0k3n").unwrap();
        store.set("user_id", "alice").unwrap();
        assert!(path.exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("access_token"), Some("t0k3n".to_string()));
        assert_eq!(reopened.get("user_id"), Some("alice".to_string()));

        reopened.clear().unwrap();
        let cleared = JsonFileStore::open(&path).unwrap();
        assert_eq!(cleared.get("user_id"), None);
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(AffinityError::Json(_))));
    }
}
