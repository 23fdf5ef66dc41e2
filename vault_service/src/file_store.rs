// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use vault_core::{manager::adapters::LocalStore, receipt::LocalRecords};

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("Local receipt store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Local receipt store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local records kept as one JSON object in a file.
///
/// Saves go through a temporary file renamed over the store, so a crash
/// leaves either the old or the new records.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Default::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LocalStore for JsonFileStore {
    type AdapterError = FileStoreError;

    async fn load(&self) -> Result<LocalRecords, Self::AdapterError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LocalRecords::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, records: &LocalRecords) -> Result<(), Self::AdapterError> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temporary = self.temporary_path();
        tokio::fs::write(&temporary, bytes).await?;
        tokio::fs::rename(&temporary, &self.path).await?;
        Ok(())
    }
}
