//! Local settings persistence. Reminder configuration lives here as plain string key-values,
//! last write wins. [file::FileSettings] is the main realization of [SettingsStore].

pub mod file;

use anyhow::Result;
use async_trait::async_trait;

/// Name of the settings document inside the application directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Contract for the key-value settings collaborator. Values are opaque strings; typed
/// encoding/decoding is the caller's concern.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
