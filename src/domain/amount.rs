//! 金额换算
//!
//! 展示单位 <-> 最小单位，使用 Decimal 保证精度

use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

use crate::error::WalletError;

/// 解析用户输入的金额（必须为正数）
pub fn parse_positive_amount(input: &str) -> Result<Decimal, WalletError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WalletError::validation("Amount is required"));
    }

    let amount = Decimal::from_str(trimmed)
        .map_err(|_| WalletError::validation(format!("Invalid amount: {}", trimmed)))?;

    if amount <= Decimal::ZERO {
        return Err(WalletError::validation("Amount must be greater than zero"));
    }

    Ok(amount)
}

/// floor(amount × 10^decimals)
pub fn to_smallest_units(amount: Decimal, decimals: u32) -> Result<u128, WalletError> {
    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    let raw = amount
        .checked_mul(scale)
        .ok_or_else(|| WalletError::validation("Amount is too large"))?
        .floor();

    raw.to_u128()
        .ok_or_else(|| WalletError::validation("Amount is out of range"))
}

/// raw / 10^decimals，按固定小数位格式化
pub fn format_display_amount(raw: u128, decimals: u32, precision: u32) -> String {
    let value = i128::try_from(raw)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok());

    match value {
        Some(value) => {
            let rounded =
                value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.*}", precision as usize, rounded)
        }
        // 超出 Decimal 表示范围时退化为最小单位展示
        None => format!("{}e-{}", raw, decimals),
    }
}

/// gas × 单价，向上取整到最小单位
pub fn fee_amount(gas_limit: u64, gas_price: Decimal) -> Result<u128, WalletError> {
    Decimal::from(gas_limit)
        .checked_mul(gas_price)
        .map(|fee| fee.ceil())
        .and_then(|fee| fee.to_u128())
        .ok_or_else(|| WalletError::validation("Fee is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_smallest_units() {
        let amount = parse_positive_amount("1.5").unwrap();
        assert_eq!(to_smallest_units(amount, 6).unwrap(), 1_500_000);
        assert_eq!(to_smallest_units(amount, 8).unwrap(), 150_000_000);
    }

    #[test]
    fn test_to_smallest_units_floors() {
        let amount = parse_positive_amount("0.0000019").unwrap();
        assert_eq!(to_smallest_units(amount, 6).unwrap(), 1);

        let amount = parse_positive_amount("0.0000001").unwrap();
        assert_eq!(to_smallest_units(amount, 6).unwrap(), 0);
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        assert!(parse_positive_amount("0").is_err());
        assert!(parse_positive_amount("-1").is_err());
        assert!(parse_positive_amount("abc").is_err());
        assert!(parse_positive_amount("   ").is_err());
        assert!(parse_positive_amount(" 2 ").is_ok());
    }

    #[test]
    fn test_format_display_amount() {
        assert_eq!(format_display_amount(1_500_000, 6, 6), "1.500000");
        assert_eq!(format_display_amount(0, 6, 6), "0.000000");
        assert_eq!(format_display_amount(42_000_000, 6, 0), "42");
        assert_eq!(format_display_amount(1_600_000, 6, 0), "2");
    }

    #[test]
    fn test_fee_amount_rounds_up() {
        assert_eq!(fee_amount(200_000, Decimal::new(25, 3)).unwrap(), 5_000);
        assert_eq!(fee_amount(3, Decimal::new(1, 2)).unwrap(), 1);
        assert_eq!(fee_amount(0, Decimal::new(1, 2)).unwrap(), 0);
    }
}
