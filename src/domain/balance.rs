//! 代币余额
//!
//! 将节点返回的原始余额规范化为展示用记录

use serde::{Deserialize, Serialize};

use crate::domain::{amount::format_display_amount, chain_config::TokenConfig};

/// 链上原始余额（最小单位）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub display_name: String,
    pub denom: String,
    pub raw_amount: u128,
    pub decimals: u32,
    pub display_precision: u32,
    pub icon_ref: Option<String>,
}

impl TokenBalance {
    pub fn with_amount(token: &TokenConfig, raw_amount: u128) -> Self {
        Self {
            symbol: token.symbol.clone(),
            display_name: token.display_name.clone(),
            denom: token.denom.clone(),
            raw_amount,
            decimals: token.decimals,
            display_precision: token.display_precision,
            icon_ref: token.icon_ref.clone(),
        }
    }

    pub fn display_amount(&self) -> String {
        format_display_amount(self.raw_amount, self.decimals, self.display_precision)
    }
}

/// 按配置顺序映射已知面额；响应中缺失的面额记为 0，而不是省略
pub fn normalize_balances(coins: &[Coin], tokens: &[TokenConfig]) -> Vec<TokenBalance> {
    tokens
        .iter()
        .map(|token| {
            let raw = coins
                .iter()
                .filter(|c| c.denom == token.denom)
                .filter_map(|c| match c.amount.parse::<u128>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(denom = %c.denom, amount = %c.amount, "Unparseable balance amount");
                        None
                    }
                })
                .fold(0u128, |acc, v| acc.saturating_add(v));
            TokenBalance::with_amount(token, raw)
        })
        .collect()
}
