//! Keys held by this device, one per lock, stored in BOLT_HOME

use std::fs;
use std::path::{Path, PathBuf};

use bolt_proto::{Key, Uuid};
use serde::{Deserialize, Serialize};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Get BOLT_HOME directory, creating it if needed
pub fn bolt_home() -> Result<PathBuf> {
    let home = match std::env::var_os("BOLT_HOME") {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir()
            .ok_or("could not determine home directory")?
            .join(".bolt"),
    };
    fs::create_dir_all(&home)?;
    Ok(home)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockKey {
    pub lock: Uuid,
    pub key: Key,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyRing {
    locks: Vec<LockKey>,
}

impl KeyRing {
    pub const FILE_NAME: &'static str = "keys.json";

    /// Read the key ring, empty if the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(format!("failed to read {}: {e}", path.display()).into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn locks(&self) -> &[LockKey] {
        &self.locks
    }

    pub fn get(&self, lock: &Uuid) -> Option<&Key> {
        self.locks.iter().find(|k| k.lock == *lock).map(|k| &k.key)
    }

    /// The key for `lock`, or an error naming the lock
    pub fn require(&self, lock: &Uuid) -> Result<&Key> {
        self.get(lock)
            .ok_or_else(|| format!("no key for lock {lock}, run setup or receive first").into())
    }

    /// Store `key` for `lock`, replacing any previous key
    pub fn insert(&mut self, lock: Uuid, key: Key) {
        self.locks.retain(|k| k.lock != lock);
        self.locks.push(LockKey { lock, key });
    }

    pub fn remove(&mut self, lock: &Uuid) -> Option<Key> {
        let index = self.locks.iter().position(|k| k.lock == *lock)?;
        Some(self.locks.remove(index).key)
    }
}
