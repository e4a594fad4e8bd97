//! Persistent key/value storage for tokens and UI preferences.
//!
//! Tokens are written to two redundant backends: the OS credential store
//! (DPAPI on Windows, Keychain on macOS, Secret Service on Linux, via the
//! `keyring` crate) as the primary, and a JSON file as the backup. The
//! "selected store" preference lives in the same file store, independent of
//! backend state.

use keyring::Entry;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Service name under which keyring entries are registered.
pub const SERVICE_NAME: &str = "posdesk-client";

/// Preference key for the currently selected store.
pub const SELECTED_STORE_KEY: &str = "selected_store_id";

/// A simple get/set/remove key/value store. Implementations must not panic;
/// read failures degrade to `None`.
pub trait TokenBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn remove(&self, key: &str) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// OS credential store backend
// ---------------------------------------------------------------------------

pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn get(&self, key: &str) -> Option<String> {
        let entry = match Entry::new(&self.service, key) {
            Ok(e) => e,
            Err(e) => {
                warn!(key, error = %e, "keyring: failed to create entry");
                return None;
            }
        };
        match entry.get_password() {
            Ok(pw) => Some(pw),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(key, error = %e, "keyring: failed to read entry");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let entry = Entry::new(&self.service, key).map_err(|e| e.to_string())?;
        entry.set_password(value).map_err(|e| e.to_string())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let entry = Entry::new(&self.service, key).map_err(|e| e.to_string())?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON file backend
// ---------------------------------------------------------------------------

/// Flat JSON object on disk. Used as the redundant token backup and for UI
/// preferences that do not warrant the credential store.
pub struct FileBackend {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    io: Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            io: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Map<String, Value> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %self.path.display(), "file store: unreadable content, starting fresh");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(map.clone()))
            .map_err(|e| e.to_string())?;
        std::fs::write(&self.path, text).map_err(|e| e.to_string())
    }
}

impl TokenBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.io.lock().ok()?;
        self.read_map()
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let _guard = self.io.lock().map_err(|e| e.to_string())?;
        let mut map = self.read_map();
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let _guard = self.io.lock().map_err(|e| e.to_string())?;
        let mut map = self.read_map();
        map.remove(key);
        self.write_map(&map)
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Volatile backend for tests and embedded use.
#[derive(Default)]
pub struct MemoryBackend {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.map
            .lock()
            .map_err(|e| e.to_string())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        self.map.lock().map_err(|e| e.to_string())?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UI preferences
// ---------------------------------------------------------------------------

/// Persisted UI preferences. Currently only the selected store id; survives
/// logout and is cleared explicitly.
pub struct Preferences {
    store: FileBackend,
}

impl Preferences {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            store: FileBackend::new(path),
        }
    }

    pub fn selected_store(&self) -> Option<uuid::Uuid> {
        self.store
            .get(SELECTED_STORE_KEY)
            .and_then(|s| s.parse().ok())
    }

    pub fn set_selected_store(&self, store_id: uuid::Uuid) -> Result<(), String> {
        self.store.set(SELECTED_STORE_KEY, &store_id.to_string())
    }

    pub fn clear_selected_store(&self) -> Result<(), String> {
        self.store.remove(SELECTED_STORE_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("posdesk-test-{}-{name}.json", Uuid::new_v4()))
    }

    #[test]
    fn file_backend_round_trips_and_removes() {
        let path = temp_path("file");
        let backend = FileBackend::new(&path);

        assert_eq!(backend.get("k"), None);
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").as_deref(), Some("v"));
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k"), None);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn file_backend_survives_corrupt_content() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "not json {{{").unwrap();
        let backend = FileBackend::new(&path);
        assert_eq!(backend.get("k"), None);
        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").as_deref(), Some("v"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn selected_store_preference_round_trips() {
        let path = temp_path("prefs");
        let prefs = Preferences::new(&path);
        let id = Uuid::new_v4();

        assert_eq!(prefs.selected_store(), None);
        prefs.set_selected_store(id).unwrap();
        assert_eq!(prefs.selected_store(), Some(id));
        prefs.clear_selected_store().unwrap();
        assert_eq!(prefs.selected_store(), None);

        let _ = std::fs::remove_file(path);
    }
}
