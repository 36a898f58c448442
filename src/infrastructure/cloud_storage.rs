//! 按用户隔离的键值云存储
//!
//! 与 Telegram CloudStorage 相同的接口与限制：键最长 128 字符，值最长 4096 字符。

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::error::{WalletError, WalletResult};

pub const MAX_KEY_LEN: usize = 128;
pub const MAX_VALUE_LEN: usize = 4096;

#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// 不存在时返回 None
    async fn get_item(&self, key: &str) -> WalletResult<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> WalletResult<()>;
    /// 删除不存在的键不是错误
    async fn remove_item(&self, key: &str) -> WalletResult<()>;
}

fn check_key(key: &str) -> WalletResult<()> {
    if key.is_empty() || key.chars().count() > MAX_KEY_LEN {
        return Err(WalletError::Storage(format!(
            "key must be 1-{} characters",
            MAX_KEY_LEN
        )));
    }
    Ok(())
}

fn check_value(value: &str) -> WalletResult<()> {
    if value.chars().count() > MAX_VALUE_LEN {
        return Err(WalletError::Storage(format!(
            "value exceeds {} characters",
            MAX_VALUE_LEN
        )));
    }
    Ok(())
}

/// 文件存储：`<dir>/<user_id>.json`，写入时先写临时文件再 rename
pub struct FileCloudStorage {
    path: PathBuf,
    // 串行化读-改-写
    write_lock: Mutex<()>,
}

impl FileCloudStorage {
    pub fn new(dir: impl AsRef<Path>, user_id: &str) -> WalletResult<Self> {
        if user_id.is_empty()
            || !user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(WalletError::Storage(format!("invalid user id: {:?}", user_id)));
        }

        Ok(Self {
            path: dir.as_ref().join(format!("{}.json", user_id)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> WalletResult<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                WalletError::Storage(format!("corrupted storage document: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(WalletError::storage(e)),
        }
    }

    async fn write_document(&self, document: &BTreeMap<String, String>) -> WalletResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(WalletError::storage)?;
        }

        let content = serde_json::to_vec_pretty(document).map_err(WalletError::storage)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(WalletError::storage)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(WalletError::storage)?;

        Ok(())
    }
}

#[async_trait]
impl CloudStorage for FileCloudStorage {
    async fn get_item(&self, key: &str) -> WalletResult<Option<String>> {
        check_key(key)?;
        let document = self.read_document().await?;
        Ok(document.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> WalletResult<()> {
        check_key(key)?;
        check_value(value)?;

        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document).await?;

        tracing::debug!(key = %key, path = %self.path.display(), "Cloud storage item saved");
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> WalletResult<()> {
        check_key(key)?;

        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        if document.remove(key).is_some() {
            self.write_document(&document).await?;
            tracing::debug!(key = %key, "Cloud storage item removed");
        }
        Ok(())
    }
}

/// 内存存储（测试与 dry-run）
#[derive(Default)]
pub struct MemoryCloudStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryCloudStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CloudStorage for MemoryCloudStorage {
    async fn get_item(&self, key: &str) -> WalletResult<Option<String>> {
        check_key(key)?;
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> WalletResult<()> {
        check_key(key)?;
        check_value(value)?;
        self.items
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> WalletResult<()> {
        check_key(key)?;
        self.items.write().await.remove(key);
        Ok(())
    }
}
