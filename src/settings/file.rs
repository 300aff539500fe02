use std::{collections::BTreeMap, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::warn;

use super::SettingsStore;

/// Settings stored as a single JSON document. The file is shared between the cli and the daemon,
/// so reads take a shared lock and writes an exclusive one.
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let file = match File::open(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        Self::read_with_file(file).await
    }

    async fn read_with_file(mut file: File) -> Result<BTreeMap<String, String>> {
        let mut content = String::new();
        let read = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        read?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(v) => Ok(v),
            Err(e) => {
                // Might happen after shutdowns cutting off a write. Last-write-wins storage, so
                // starting over from empty is acceptable.
                warn!("Settings file was corrupted, falling back to defaults: {e}");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let mut file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        file.lock_exclusive()?;
        let result = Self::write_with_file(&mut file, map).await;
        file.unlock_async().await?;
        result
    }

    async fn write_with_file(file: &mut File, map: &BTreeMap<String, String>) -> Result<()> {
        let buffer = serde_json::to_vec_pretty(map)?;
        file.set_len(0).await?;
        file.seek(std::io::SeekFrom::Start(0)).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await
    }
}
