// taskdesk/src/session.rs

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, io, path::{Path, PathBuf}, str::FromStr, sync::Arc};
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role { Admin, #[default] User }

impl Role {
    pub fn as_str(&self) -> &'static str { match self { Self::Admin => "admin", Self::User => "user" } }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => anyhow::bail!("unknown role '{s}' (expected admin or user)"),
        }
    }
}

/// The authenticated user as the API describes it. Unknown fields (email, id)
/// are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub token: String,
}

/// A persisted key-value slot store.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// One file per key under a directory.
#[derive(Clone, Debug)]
pub struct FileStorage { dir: PathBuf }

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }
    fn path(&self, key: &str) -> PathBuf { self.dir.join(key) }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path(key).display())),
        }
    }
    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.path(key);
        fs::write(&path, value).with_context(|| format!("write {}", path.display()))?;
        restrict_permissions(&path)
    }
    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path(key).display())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_: &Path) -> Result<()> { Ok(()) }

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage { slots: Arc<RwLock<BTreeMap<String, String>>> }

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> { Ok(self.slots.read().get(key).cloned()) }
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.write().insert(key.into(), value.into());
        Ok(())
    }
    fn remove(&self, key: &str) -> Result<()> {
        self.slots.write().remove(key);
        Ok(())
    }
}

/// Handle on the current session. Clones share the same storage; every
/// component gets one at construction. Only the auth flows write through it.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self { Self { storage } }
    pub fn in_memory() -> Self { Self::new(Arc::new(MemoryStorage::new())) }
    pub fn on_disk(dir: impl Into<PathBuf>) -> Self { Self::new(Arc::new(FileStorage::new(dir))) }

    /// The stored credential, if any. Storage failures read as "no token".
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(t) => t.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => { warn!(error = %e, "could not read stored token"); None }
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => { warn!(error = %e, "could not read stored identity"); return None; }
        };
        match serde_json::from_str(&raw) {
            Ok(id) => Some(id),
            Err(e) => { debug!(error = %e, "ignoring malformed identity record"); None }
        }
    }

    /// Both halves must be present for there to be a session.
    pub fn current(&self) -> Option<Session> {
        Some(Session { identity: self.identity()?, token: self.token()? })
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USER_KEY, &serde_json::to_string(&session.identity)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }
}
