//! Flat JSON key-value storage.
//!
//! The collaborator contract around the core reserves flat keys like
//! `record/<id>`, `origin/<id>`, `player/<player-id>`,
//! `sessions/<session>`, and `history/<window>`; each value is one JSON
//! document. The filesystem backend maps a key to `<base>/<key>.json`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

pub trait Storage {
    fn save_json(&self, key: &str, value: &Value) -> Result<()>;
    fn load_json(&self, key: &str) -> Result<Value>;
    fn exists(&self, key: &str) -> bool;
    fn remove(&self, key: &str) -> Result<()>;
    /// Keys under `prefix`, sorted. An empty prefix lists everything.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    base_dir: PathBuf,
}

impl FileSystemStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileSystemStorage {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            bail!("storage key is empty");
        }
        let relative = Path::new(key);
        // Keys are flat relative paths; anything escaping the tree is
        // rejected outright.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("storage key '{}' is not a plain relative path", key);
        }
        let mut path = self.base_dir.join(relative);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        path.set_file_name(format!("{}.json", file_name));
        Ok(path)
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let as_str = relative.to_string_lossy().replace('\\', "/");
        as_str.strip_suffix(".json").map(|s| s.to_string())
    }
}

impl Storage for FileSystemStorage {
    fn save_json(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory for key '{}'", key))?;
        }
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&path, body).with_context(|| format!("writing key '{}'", key))
    }

    fn load_json(&self, key: &str) -> Result<Value> {
        let path = self.key_to_path(key)?;
        let body =
            fs::read_to_string(&path).with_context(|| format!("reading key '{}'", key))?;
        serde_json::from_str(&body).with_context(|| format!("parsing key '{}'", key))
    }

    fn exists(&self, key: &str) -> bool {
        self.key_to_path(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        fs::remove_file(&path).with_context(|| format!("removing key '{}'", key))
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        if !self.base_dir.is_dir() {
            return Ok(keys);
        }
        let mut stack = vec![self.base_dir.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)
                .with_context(|| format!("listing directory {}", dir.display()))?
            {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Some(key) = self.path_to_key(&path) {
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
