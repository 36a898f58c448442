//! 钱包错误分类
//!
//! 所有异步失败在操作边界被捕获，转换为用户可见的非阻塞提示

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// 云存储不可用或读写失败
    #[error("storage error: {0}")]
    Storage(String),

    /// 助记词无法解码为有效种子
    #[error("invalid recovery phrase: {0}")]
    Derivation(String),

    /// RPC / REST 不可达或超时
    #[error("network error: {0}")]
    Network(String),

    /// 节点响应无法解码
    #[error("failed to decode ledger response: {0}")]
    ResponseDecode(String),

    /// 交易被网络接受但被链上逻辑拒绝
    #[error("transaction rejected by ledger (code {code}): {raw_log}")]
    LedgerRejection { code: u32, raw_log: String },

    /// 本地输入校验失败（不发起网络请求）
    #[error("{0}")]
    Validation(String),

    #[error("no wallet loaded")]
    NoWallet,

    #[error("another wallet operation is in progress")]
    Busy,

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// 稳定的错误码（日志与前端使用）
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) => "storage_error",
            Self::Derivation(_) => "invalid_mnemonic",
            Self::Network(_) => "network",
            Self::ResponseDecode(_) => "response_decode",
            Self::LedgerRejection { .. } => "transaction_failed",
            Self::Validation(_) => "validation_failed",
            Self::NoWallet => "wallet_not_found",
            Self::Busy => "duplicate_request",
            Self::Cancelled => "cancelled",
            Self::Config(_) => "config_error",
        }
    }

    /// 将技术错误消息转换为用户友好的消息
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) => "Wallet storage is unavailable. Please try again.".to_string(),
            Self::Derivation(_) => {
                "Invalid mnemonic. Please check your mnemonic and try again.".to_string()
            }
            Self::Network(msg) if msg.contains("timed out") || msg.contains("timeout") => {
                "The request timed out. Please check your connection and try again.".to_string()
            }
            Self::Network(_) => {
                "The network is unavailable right now. Please try again later.".to_string()
            }
            Self::ResponseDecode(_) => {
                "Received an unreadable response from the network.".to_string()
            }
            Self::LedgerRejection { raw_log, .. } => format!("Transaction failed: {}", raw_log),
            // 校验消息本身已是用户可读的
            Self::Validation(msg) => msg.clone(),
            Self::NoWallet => "No wallet found. Create or import a wallet first.".to_string(),
            Self::Busy => "Please wait for the current operation to finish.".to_string(),
            Self::Cancelled => "The operation was cancelled.".to_string(),
            Self::Config(msg) => format!("Configuration error: {}", msg),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::ResponseDecode(err.to_string())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// 是否可以通过用户手动重试恢复
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Storage(_) | Self::Busy)
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ResponseDecode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<prost::DecodeError> for WalletError {
    fn from(err: prost::DecodeError) -> Self {
        Self::ResponseDecode(err.to_string())
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(WalletError::NoWallet.code(), "wallet_not_found");
        assert_eq!(
            WalletError::LedgerRejection {
                code: 5,
                raw_log: "insufficient funds".into()
            }
            .code(),
            "transaction_failed"
        );
        assert_eq!(WalletError::validation("x").code(), "validation_failed");
    }

    #[test]
    fn test_user_message_surfaces_raw_log() {
        let err = WalletError::LedgerRejection {
            code: 5,
            raw_log: "spendable balance 1utura is smaller than 2utura".into(),
        };
        assert_eq!(
            err.user_message(),
            "Transaction failed: spendable balance 1utura is smaller than 2utura"
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = WalletError::network("operation timed out");
        assert!(err.user_message().contains("timed out"));
        assert!(err.is_retryable());
        assert!(!WalletError::Cancelled.is_retryable());
    }
}
