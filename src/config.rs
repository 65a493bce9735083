// taskdesk/src/config.rs

use anyhow::{Context, Result};
use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, sync::Arc};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const API_URL_ENV: &str = "TASKDESK_API_URL";

/// Config is merged: system -> user -> workspace -> runtime (ephemeral)
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: Option<String>,      // e.g. "https://tasks.example.com/api"
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: Option<PathBuf>,          // default: platform data dir
}

impl Config {
    pub fn base_url(&self) -> &str { self.api.base_url.as_deref().unwrap_or(DEFAULT_API_URL) }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope { System, User, Workspace, Runtime }

fn merge(a: &mut Config, b: &Config) {
    if b.api.base_url.is_some() { a.api.base_url = b.api.base_url.clone(); }
    if b.api.user_agent.is_some() { a.api.user_agent = b.api.user_agent.clone(); }
    if b.storage.dir.is_some() { a.storage.dir = b.storage.dir.clone(); }
}

fn project_dirs() -> Option<ProjectDirs> { ProjectDirs::from("dev", "taskdesk", "taskdesk") }

#[derive(Clone, Debug)]
pub struct ConfigPaths {
    pub system: PathBuf,
    pub user: Option<PathBuf>,
    pub workspace: PathBuf,
}

impl ConfigPaths {
    pub fn discover(workspace_root: &Path) -> Self {
        let system = if cfg!(target_os = "windows") {
            PathBuf::from(r"C:\ProgramData\taskdesk\config.toml")
        } else {
            PathBuf::from("/etc/taskdesk/config.toml")
        };
        let user = project_dirs().map(|p| p.config_dir().join("config.toml"));
        let workspace = workspace_root.join(".taskdesk").join("config.toml");
        Self { system, user, workspace }
    }
}

#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<RwLock<Config>>,
    runtime_overlay: Arc<RwLock<Config>>,
    paths: ConfigPaths,
}

impl ConfigManager {
    pub fn load(workspace_root: impl AsRef<Path>) -> Result<Self> {
        Self::with_paths(ConfigPaths::discover(workspace_root.as_ref()))
    }

    pub fn with_paths(paths: ConfigPaths) -> Result<Self> {
        let me = Self {
            inner: Arc::new(RwLock::new(Config::default())),
            runtime_overlay: Arc::new(RwLock::new(Config::default())),
            paths,
        };
        me.reload_all()?;
        Ok(me)
    }

    // Missing files are fine; a file that exists but does not parse is an error.
    fn read_file(path: &Path) -> Result<Option<Config>> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("read {}", path.display())),
        };
        let cfg = toml::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        debug!(path = %path.display(), "loaded config layer");
        Ok(Some(cfg))
    }

    pub fn reload_all(&self) -> Result<()> {
        let mut merged = Config::default();
        let layers = [Some(&self.paths.system), self.paths.user.as_ref(), Some(&self.paths.workspace)];
        for path in layers.into_iter().flatten() {
            if let Some(layer) = Self::read_file(path)? { merge(&mut merged, &layer); }
        }
        merge(&mut merged, &self.runtime_overlay.read());
        *self.inner.write() = merged;
        Ok(())
    }

    pub fn get(&self) -> Config { self.inner.read().clone() }

    /// In-memory overlay (not persisted).
    pub fn apply_runtime_overlay(&self, patch: Config) -> Result<()> {
        merge(&mut self.runtime_overlay.write(), &patch);
        self.reload_all()
    }

    /// Overlays `TASKDESK_API_URL` when set.
    pub fn apply_env(&self) -> Result<()> {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                let mut patch = Config::default();
                patch.api.base_url = Some(url);
                self.apply_runtime_overlay(patch)
            }
            _ => Ok(()),
        }
    }

    pub fn write_patch(&self, scope: Scope, patch: &Config) -> Result<PathBuf> {
        let path = match scope {
            Scope::System => self.paths.system.clone(),
            Scope::User => self.paths.user.clone().context("no user config directory on this platform")?,
            Scope::Workspace => self.paths.workspace.clone(),
            Scope::Runtime => anyhow::bail!("Runtime scope is ephemeral; cannot persist"),
        };
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        let mut merged = Self::read_file(&path)?.unwrap_or_default();
        merge(&mut merged, patch);
        let text = toml::to_string_pretty(&merged).context("serialize toml")?;
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        self.reload_all()?;
        Ok(path)
    }

    /// Persists `api.base_url` to `scope` after checking it parses as a URL.
    pub fn set_base_url(&self, scope: Scope, url: &str) -> Result<PathBuf> {
        let parsed = url::Url::parse(url.trim()).with_context(|| format!("invalid API base URL '{url}'"))?;
        let mut patch = Config::default();
        patch.api.base_url = Some(parsed.as_str().trim_end_matches('/').to_string());
        self.write_patch(scope, &patch)
    }

    /// Where the session slots live.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.get().storage.dir { return Ok(dir); }
        let proj = project_dirs().context("ProjectDirs not available")?;
        Ok(proj.data_dir().join("session"))
    }
}
