//! 转账请求与状态机
//!
//! Idle → Validating → Submitting → Completed | Failed | Unknown

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::fee::FeePolicy;

/// 用户提交的转账请求（只被消费一次，从不持久化）
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_address: String,
    /// 只校验非空
    pub recipient: String,
    /// 十进制字符串（展示单位）
    pub amount: String,
    /// 代币符号或面额
    pub symbol: String,
    pub memo: Option<String>,
    pub fee_policy: FeePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    Idle,
    Validating,
    Submitting,
    Completed,
    Failed,
    /// 已广播但结果无法确认，需要用户自行核对余额
    Unknown,
}

impl TransferState {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Unknown)
    }

    /// 验证状态转换合法性
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use TransferState::*;

        match (self, target) {
            (Idle, Validating) => true,
            // 本地校验失败回到 Idle
            (Validating, Idle) | (Validating, Submitting) => true,
            (Submitting, Completed) | (Submitting, Failed) | (Submitting, Unknown) => true,
            // 最终状态只能重新开始
            (Completed, Idle) | (Failed, Idle) | (Unknown, Idle) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 转账结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub status: TransferState,
    pub transaction_hash: Option<String>,
    pub error_detail: Option<String>,
}

impl TransferResult {
    pub fn completed(tx_hash: String) -> Self {
        Self {
            status: TransferState::Completed,
            transaction_hash: Some(tx_hash),
            error_detail: None,
        }
    }

    pub fn failed(tx_hash: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            status: TransferState::Failed,
            transaction_hash: tx_hash,
            error_detail: Some(detail.into()),
        }
    }

    pub fn unknown(tx_hash: String, detail: impl Into<String>) -> Self {
        Self {
            status: TransferState::Unknown,
            transaction_hash: Some(tx_hash),
            error_detail: Some(detail.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.status == TransferState::Completed
    }

    /// 面向用户的提示文案
    pub fn user_message(&self) -> String {
        let hash = self.transaction_hash.as_deref().unwrap_or("-");
        match self.status {
            TransferState::Completed => {
                format!("Transfer successful! Transaction hash: {}", hash)
            }
            TransferState::Unknown => format!(
                "Transfer was submitted but its result could not be confirmed. Please check your balance. Transaction hash: {}",
                hash
            ),
            _ => format!(
                "Transfer failed: {}",
                self.error_detail.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
