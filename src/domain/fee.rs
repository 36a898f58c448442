//! 手续费策略
//!
//! 单一的带标签联合，在调用时选择：自动（模拟 + 倍数缓冲）、手动、固定三档

use std::{fmt, str::FromStr};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{
    config::FeeConfig,
    domain::{amount::fee_amount, balance::Coin},
    error::WalletError,
};

/// 固定档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasTier {
    Low,
    Medium,
    High,
}

impl GasTier {
    pub fn unit_price(&self, config: &FeeConfig) -> Decimal {
        match self {
            Self::Low => config.gas_price_low,
            Self::Medium => config.gas_price_medium,
            Self::High => config.gas_price_high,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FeePolicy {
    /// 模拟 gas 后乘以安全倍数，使用默认单价
    #[default]
    Automatic,
    /// 用户指定 gas 上限与单价（最小单位 / gas）
    Manual { gas_limit: u64, gas_price: Decimal },
    /// 固定 gas 上限 + 档位单价，从不调用 simulate
    Tiered(GasTier),
}

impl FeePolicy {
    pub fn requires_simulation(&self) -> bool {
        matches!(self, Self::Automatic)
    }

    /// 本地校验（不发起网络请求）
    pub fn validate(&self) -> Result<(), WalletError> {
        if let Self::Manual {
            gas_limit,
            gas_price,
        } = self
        {
            if *gas_limit == 0 {
                return Err(WalletError::validation("Gas limit must be greater than zero"));
            }
            if *gas_price <= Decimal::ZERO {
                return Err(WalletError::validation("Gas price must be greater than zero"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for FeePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => write!(f, "auto"),
            Self::Manual {
                gas_limit,
                gas_price,
            } => write!(f, "manual:{}:{}", gas_limit, gas_price),
            Self::Tiered(GasTier::Low) => write!(f, "low"),
            Self::Tiered(GasTier::Medium) => write!(f, "medium"),
            Self::Tiered(GasTier::High) => write!(f, "high"),
        }
    }
}

impl FromStr for FeePolicy {
    type Err = WalletError;

    /// auto | low | medium | high | manual:<gas_limit>:<gas_price>
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "automatic" => Ok(Self::Automatic),
            "low" => Ok(Self::Tiered(GasTier::Low)),
            "medium" => Ok(Self::Tiered(GasTier::Medium)),
            "high" => Ok(Self::Tiered(GasTier::High)),
            other => {
                let parts: Vec<&str> = other.split(':').collect();
                match parts.as_slice() {
                    ["manual", limit, price] => {
                        let gas_limit = limit.parse::<u64>().map_err(|_| {
                            WalletError::validation(format!("Invalid gas limit: {}", limit))
                        })?;
                        let gas_price = Decimal::from_str(price).map_err(|_| {
                            WalletError::validation(format!("Invalid gas price: {}", price))
                        })?;
                        Ok(Self::Manual {
                            gas_limit,
                            gas_price,
                        })
                    }
                    _ => Err(WalletError::validation(format!("Unknown fee policy: {}", s))),
                }
            }
        }
    }
}

/// 计算出的手续费
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fee {
    pub amount: Coin,
    pub gas_limit: u64,
}

/// 模拟 gas × 倍数，四舍五入
pub fn buffered_gas(simulated_gas: u64, multiplier: Decimal) -> Result<u64, WalletError> {
    Decimal::from(simulated_gas)
        .checked_mul(multiplier)
        .map(|g| g.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|g| g.to_u64())
        .ok_or_else(|| WalletError::validation("Gas estimate is out of range"))
}

/// 按策略计算手续费
///
/// `simulated_gas` 仅在 Automatic 策略下使用，其余策略忽略它。
pub fn compute_fee(
    policy: &FeePolicy,
    config: &FeeConfig,
    fee_denom: &str,
    simulated_gas: Option<u64>,
) -> Result<Fee, WalletError> {
    let (gas_limit, unit_price) = match policy {
        FeePolicy::Automatic => {
            let simulated = simulated_gas.ok_or_else(|| {
                WalletError::validation("Automatic fee requires a gas simulation")
            })?;
            (
                buffered_gas(simulated, config.auto_gas_multiplier)?,
                config.default_gas_price,
            )
        }
        FeePolicy::Manual {
            gas_limit,
            gas_price,
        } => (*gas_limit, *gas_price),
        FeePolicy::Tiered(tier) => (config.tier_gas_limit, tier.unit_price(config)),
    };

    Ok(Fee {
        amount: Coin::new(fee_denom, fee_amount(gas_limit, unit_price)?),
        gas_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee_config() -> FeeConfig {
        FeeConfig {
            auto_gas_multiplier: Decimal::new(13, 1),
            default_gas_price: Decimal::new(25, 3),
            tier_gas_limit: 200_000,
            gas_price_low: Decimal::new(1, 2),
            gas_price_medium: Decimal::new(25, 3),
            gas_price_high: Decimal::new(4, 2),
        }
    }

    #[test]
    fn test_automatic_applies_multiplier() {
        let fee = compute_fee(&FeePolicy::Automatic, &fee_config(), "utura", Some(100_000)).unwrap();
        assert_eq!(fee.gas_limit, 130_000);
        assert_eq!(fee.amount, Coin::new("utura", 3_250));
    }

    #[test]
    fn test_automatic_requires_simulation() {
        assert!(compute_fee(&FeePolicy::Automatic, &fee_config(), "utura", None).is_err());
    }

    #[test]
    fn test_tiered_is_positive_without_simulation() {
        for tier in [GasTier::Low, GasTier::Medium, GasTier::High] {
            let fee = compute_fee(&FeePolicy::Tiered(tier), &fee_config(), "utura", None).unwrap();
            assert_eq!(fee.gas_limit, 200_000);
            assert!(fee.amount.amount.parse::<u128>().unwrap() > 0);
        }
        let low = compute_fee(&FeePolicy::Tiered(GasTier::Low), &fee_config(), "utura", None).unwrap();
        assert_eq!(low.amount.amount, "2000");
    }

    #[test]
    fn test_manual_is_verbatim() {
        let policy = FeePolicy::Manual {
            gas_limit: 90_000,
            gas_price: Decimal::new(5, 2),
        };
        let fee = compute_fee(&policy, &fee_config(), "utura", Some(1)).unwrap();
        assert_eq!(fee.gas_limit, 90_000);
        assert_eq!(fee.amount.amount, "4500");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("auto".parse::<FeePolicy>().unwrap(), FeePolicy::Automatic);
        assert_eq!(
            "HIGH".parse::<FeePolicy>().unwrap(),
            FeePolicy::Tiered(GasTier::High)
        );
        assert_eq!(
            "manual:150000:0.03".parse::<FeePolicy>().unwrap(),
            FeePolicy::Manual {
                gas_limit: 150_000,
                gas_price: Decimal::new(3, 2)
            }
        );
        assert!("manual:abc:0.1".parse::<FeePolicy>().is_err());
        assert!("turbo".parse::<FeePolicy>().is_err());
    }

    #[test]
    fn test_manual_validation() {
        let zero_limit = FeePolicy::Manual {
            gas_limit: 0,
            gas_price: Decimal::ONE,
        };
        assert!(zero_limit.validate().is_err());
        let zero_price = FeePolicy::Manual {
            gas_limit: 1,
            gas_price: Decimal::ZERO,
        };
        assert!(zero_price.validate().is_err());
        assert!(FeePolicy::Automatic.validate().is_ok());
    }
}
