//! Tura 链配置
//!
//! 派生路径、地址前缀与代币面额。最小单位精度是每个代币的配置项，而不是硬编码常量。

use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;

/// 主 gas 代币面额
pub const GAS_DENOM: &str = "utura";
/// 积分代币面额
pub const TAGS_DENOM: &str = "utags";

pub const DEFAULT_PREFIX: &str = "tura";
pub const COSMOS_COIN_TYPE: u32 = 118;

const TURA_COIN_IMAGE: &str =
    "https://raw.githubusercontent.com/chainapsis/keplr-chain-registry/main/images/mainnet-tura/utura.png";

/// 链配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Bech32 地址前缀
    pub address_prefix: String,
    /// BIP44 coin type
    pub coin_type: u32,
    /// 为空时从节点读取
    pub chain_id: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            address_prefix: DEFAULT_PREFIX.to_string(),
            coin_type: COSMOS_COIN_TYPE,
            chain_id: None,
        }
    }
}

impl ChainConfig {
    pub fn from_ledger_config(config: &LedgerConfig) -> Self {
        Self {
            address_prefix: config.address_prefix.clone(),
            coin_type: config.coin_type,
            chain_id: config.chain_id.clone(),
        }
    }

    /// 构建 BIP44 派生路径
    /// 格式: m/44'/coin_type'/account'/change/index
    pub fn derivation_path(&self, account: u32, change: u32, index: u32) -> String {
        format!("m/44'/{}'/{}'/{}/{}", self.coin_type, account, change, index)
    }

    /// 固定的钱包派生路径 m/44'/118'/0'/0/0
    pub fn wallet_path(&self) -> String {
        self.derivation_path(0, 0, 0)
    }
}

/// 代币配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub symbol: String,
    pub display_name: String,
    pub denom: String,
    /// 最小单位的十进制位数（raw = amount × 10^decimals）
    pub decimals: u32,
    /// 展示时保留的小数位数
    pub display_precision: u32,
    #[serde(default)]
    pub icon_ref: Option<String>,
}

impl TokenConfig {
    pub fn tura() -> Self {
        Self {
            symbol: "TURA".to_string(),
            display_name: "Tura".to_string(),
            denom: GAS_DENOM.to_string(),
            decimals: 6,
            display_precision: 6,
            icon_ref: Some(TURA_COIN_IMAGE.to_string()),
        }
    }

    pub fn tags() -> Self {
        Self {
            symbol: "TAGS".to_string(),
            display_name: "Tags".to_string(),
            denom: TAGS_DENOM.to_string(),
            decimals: 6,
            display_precision: 0,
            icon_ref: None,
        }
    }

    pub fn is_gas_token(&self) -> bool {
        self.denom == GAS_DENOM
    }
}

/// 按符号或面额查找代币
pub fn find_token<'a>(tokens: &'a [TokenConfig], symbol_or_denom: &str) -> Option<&'a TokenConfig> {
    tokens.iter().find(|t| {
        t.symbol.eq_ignore_ascii_case(symbol_or_denom) || t.denom == symbol_or_denom
    })
}
