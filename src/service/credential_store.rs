// 助记词持久化
// 固定键 tura_mnemonic，值为规范化后的 12 个单词

use std::sync::Arc;

use crate::{
    domain::mnemonic::RecoveryPhrase,
    error::{WalletError, WalletResult},
    infrastructure::cloud_storage::CloudStorage,
};

pub const MNEMONIC_KEY: &str = "tura_mnemonic";

#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn CloudStorage>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn CloudStorage>) -> Self {
        Self { storage }
    }

    /// 覆盖写入
    pub async fn save(&self, phrase: &RecoveryPhrase) -> WalletResult<()> {
        self.storage
            .set_item(MNEMONIC_KEY, phrase.expose())
            .await
            .map_err(into_storage_error)?;
        tracing::info!("Recovery phrase saved to cloud storage");
        Ok(())
    }

    /// 首次使用时返回 None
    pub async fn load(&self) -> WalletResult<Option<RecoveryPhrase>> {
        let stored = self
            .storage
            .get_item(MNEMONIC_KEY)
            .await
            .map_err(into_storage_error)?;

        match stored {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => {
                // 存储的值不再是有效助记词时报错，而不是当作空钱包
                let phrase = RecoveryPhrase::parse(&value).map_err(|e| {
                    tracing::warn!(error = %e.code(), "Stored recovery phrase is invalid");
                    e
                })?;
                Ok(Some(phrase))
            }
        }
    }

    pub async fn clear(&self) -> WalletResult<()> {
        self.storage
            .remove_item(MNEMONIC_KEY)
            .await
            .map_err(into_storage_error)?;
        tracing::info!("Recovery phrase removed from cloud storage");
        Ok(())
    }
}

fn into_storage_error(err: WalletError) -> WalletError {
    match err {
        WalletError::Storage(_) => err,
        other => WalletError::Storage(other.to_string()),
    }
}
