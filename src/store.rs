// src/store.rs

//! Persistence for provider configurations.

use crate::config::ProviderConfig;
use crate::error::RpError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Loads and persists [`ProviderConfig`] records by id.
///
/// `save` replaces any existing record with the same id; concurrent saves are
/// last-writer-wins.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<ProviderConfig>, RpError>;

    async fn save(&self, config: &ProviderConfig) -> Result<(), RpError>;

    async fn list(&self) -> Result<Vec<String>, RpError>;
}

/// Keeps providers in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    providers: Arc<RwLock<HashMap<String, ProviderConfig>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<ProviderConfig>, RpError> {
        Ok(self.providers.read().await.get(id).cloned())
    }

    async fn save(&self, config: &ProviderConfig) -> Result<(), RpError> {
        self.providers
            .write()
            .await
            .insert(config.id.clone(), config.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, RpError> {
        let mut ids: Vec<String> = self.providers.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Stores each provider as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> RpError {
    RpError::Store(format!("{}: {}", path.display(), err))
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, RpError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !id.starts_with('.');
        if !valid {
            return Err(RpError::Store(format!("invalid provider id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl ProviderStore for JsonFileStore {
    #[instrument(skip(self), err)]
    async fn load(&self, id: &str) -> Result<Option<ProviderConfig>, RpError> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => ProviderConfig::from_json(&json).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error(&path, e)),
        }
    }

    #[instrument(skip_all, fields(provider = %config.id), err)]
    async fn save(&self, config: &ProviderConfig) -> Result<(), RpError> {
        let path = self.path_for(&config.id)?;
        let json = serde_json::to_string_pretty(config).map_err(|e| store_error(&path, e))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| store_error(&self.dir, e))?;

        // Write then rename so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| store_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| store_error(&path, e))?;
        debug!("Saved provider to {}", path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, RpError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_error(&self.dir, e)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| store_error(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
