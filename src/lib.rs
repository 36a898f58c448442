//! turawallet - Tura 链 Telegram Mini-App 钱包核心
//!
//! 非托管：助记词只保存在用户自己的云存储中，签名在本地完成

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{WalletError, WalletResult};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        config::Config,
        domain::{
            ChainConfig, FeePolicy, GasTier, RecoveryPhrase, TokenBalance, TokenConfig,
            TransferRequest, TransferResult, TransferState,
        },
        error::{WalletError, WalletResult},
        service::{CreditScore, WalletSession},
    };
}
