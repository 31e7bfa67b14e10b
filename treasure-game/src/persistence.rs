//! Key-value persistence for snapshots and roster data.
//!
//! Gateways store opaque JSON blobs. Decoding happens here so that an
//! unparsable blob is indistinguishable from an absent one to the caller.
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Trait for abstracting save/load operations.
/// Platform-specific implementations should provide this.
pub trait PersistenceGateway {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `blob` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be committed.
    fn save(&self, key: &str, blob: &str) -> Result<(), Self::Error>;

    /// Delete `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the key exists but cannot be deleted.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

impl<T: PersistenceGateway + ?Sized> PersistenceGateway for &T {
    type Error = T::Error;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).load(key)
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), Self::Error> {
        (**self).save(key, blob)
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        (**self).remove(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Storage error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the value under `key`; read failures and corrupt blobs count as absent.
pub fn read_json<T, G>(gateway: &G, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    G: PersistenceGateway + ?Sized,
{
    let blob = match gateway.load(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return None,
        Err(err) => {
            log::warn!("failed to read {key}: {err}");
            return None;
        }
    };
    match serde_json::from_str(&blob) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("discarding corrupt {key}: {err}");
            None
        }
    }
}

/// Encode and store `value`. Failures are logged and reported as `false`.
pub fn write_json<T, G>(gateway: &G, key: &str, value: &T) -> bool
where
    T: Serialize + ?Sized,
    G: PersistenceGateway + ?Sized,
{
    let result = serde_json::to_string(value)
        .map_err(PersistenceError::from)
        .and_then(|blob| {
            gateway
                .save(key, &blob)
                .map_err(|err| PersistenceError::Io(io::Error::other(err)))
        });
    match result {
        Ok(()) => true,
        Err(err) => {
            log::warn!("failed to write {key}: {err}");
            false
        }
    }
}

/// Delete `key`, logging failures.
pub fn erase<G: PersistenceGateway + ?Sized>(gateway: &G, key: &str) {
    if let Err(err) = gateway.remove(key) {
        log::warn!("failed to delete {key}: {err}");
    }
}

/// In-process gateway. Clones share the same entries, so a test can keep a
/// handle while the store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    entries: Rc<RefCell<HashMap<String, String>>>,
    writes: Rc<Cell<usize>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw blob under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Seed a raw blob without counting it as a write.
    pub fn insert(&self, key: &str, blob: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
    }

    /// Number of `save` calls made through the gateway.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl PersistenceGateway for MemoryGateway {
    type Error = Infallible;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), Self::Error> {
        self.writes.set(self.writes.get() + 1);
        self.insert(key, blob);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    /// Open (and create if needed) the save directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{file_name}.json"))
    }
}

impl PersistenceGateway for FileGateway {
    type Error = PersistenceError;

    fn load(&self, key: &str) -> Result<Option<String>, Self::Error> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, blob)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        match fs::remove_file(self.path_for(key)) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_root(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!(
            "treasure-{label}-{}-{nanos}",
            std::process::id()
        ))
    }

    #[test]
    fn memory_gateway_counts_writes_and_shares_entries() {
        let gateway = MemoryGateway::new();
        let handle = gateway.clone();
        assert!(write_json(&gateway, "users", &vec![1, 2, 3]));
        assert_eq!(handle.writes(), 1);
        assert_eq!(read_json::<Vec<u32>, _>(&handle, "users"), Some(vec![1, 2, 3]));
        erase(&gateway, "users");
        assert!(handle.get("users").is_none());
    }

    #[test]
    fn corrupt_blob_reads_as_absent() {
        let gateway = MemoryGateway::new();
        gateway.insert("save:current", "{not json");
        assert_eq!(read_json::<Vec<u32>, _>(&gateway, "save:current"), None);
        assert_eq!(read_json::<Vec<u32>, _>(&gateway, "missing"), None);
        assert_eq!(gateway.writes(), 0);
    }

    #[test]
    fn file_gateway_roundtrips_and_sanitizes_keys() {
        let root = temp_root("files");
        let gateway = FileGateway::open(&root).unwrap();
        gateway.save("save:7", r#"{"decoded":true}"#).unwrap();
        assert!(root.join("save_7.json").exists());
        assert_eq!(
            gateway.load("save:7").unwrap().as_deref(),
            Some(r#"{"decoded":true}"#)
        );
        gateway.remove("save:7").unwrap();
        gateway.remove("save:7").unwrap();
        assert_eq!(gateway.load("save:7").unwrap(), None);
        let _ = fs::remove_dir_all(root);
    }
}
