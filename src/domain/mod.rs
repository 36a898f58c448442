//! Domain 模块
//!
//! 包含核心业务逻辑和领域模型

pub mod amount;
pub mod balance;
pub mod chain_config;
pub mod derivation;
pub mod fee;
pub mod mnemonic;
pub mod transfer;
pub mod user_score;

// 重新导出常用类型
pub use balance::{Coin, TokenBalance};
pub use chain_config::{ChainConfig, TokenConfig};
pub use derivation::{Account, AccountSigner};
pub use fee::{Fee, FeePolicy, GasTier};
pub use mnemonic::RecoveryPhrase;
pub use transfer::{TransferRequest, TransferResult, TransferState};
pub use user_score::{TelegramUser, UserScore};
