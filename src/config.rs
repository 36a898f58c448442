//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::TokenConfig;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 链 RPC 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    /// 为空时在连接时从节点 status 读取
    #[serde(default)]
    pub chain_id: Option<String>,
    pub address_prefix: String,
    pub coin_type: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

/// 信用评分服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// 助记词云存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dir: String,
    /// Telegram 用户 ID（存储按用户隔离）
    pub user_id: String,
}

/// Gas 费配置（单价单位：最小单位 / gas）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub auto_gas_multiplier: Decimal,
    pub default_gas_price: Decimal,
    pub tier_gas_limit: u64,
    pub gas_price_low: Decimal,
    pub gas_price_medium: Decimal,
    pub gas_price_high: Decimal,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![TokenConfig::tura(), TokenConfig::tags()]
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: env_or("TURA_RPC_URL", "https://rpc-beta1.turablockchain.com"),
            chain_id: std::env::var("TURA_CHAIN_ID").ok().filter(|s| !s.is_empty()),
            address_prefix: env_or("TURA_ADDRESS_PREFIX", "tura"),
            coin_type: 118,
            request_timeout_secs: env_parse("LEDGER_TIMEOUT_SECS").unwrap_or(30),
            connect_timeout_secs: env_parse("LEDGER_CONNECT_TIMEOUT_SECS").unwrap_or(10),
            confirm_timeout_secs: env_parse("TX_CONFIRM_TIMEOUT_SECS").unwrap_or(60),
            poll_interval_ms: env_parse("TX_POLL_INTERVAL_MS").unwrap_or(3000),
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            endpoint: env_or("CREDIT_SCORE_URL", "https://credit.tagfusion.org"),
            timeout_secs: env_parse("CREDIT_SCORE_TIMEOUT_SECS").unwrap_or(10),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: env_or("WALLET_STORAGE_DIR", "./.turawallet"),
            user_id: env_or("TELEGRAM_USER_ID", "local"),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            auto_gas_multiplier: env_parse("GAS_AUTO_MULTIPLIER").unwrap_or(Decimal::new(13, 1)),
            default_gas_price: env_parse("GAS_PRICE_DEFAULT").unwrap_or(Decimal::new(25, 3)),
            tier_gas_limit: env_parse("GAS_TIER_LIMIT").unwrap_or(200_000),
            gas_price_low: env_parse("GAS_PRICE_LOW").unwrap_or(Decimal::new(1, 2)),
            gas_price_medium: env_parse("GAS_PRICE_MEDIUM").unwrap_or(Decimal::new(25, 3)),
            gas_price_high: env_parse("GAS_PRICE_HIGH").unwrap_or(Decimal::new(4, 2)),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env_or("LOG_LEVEL", "info"),
            format: env_or("LOG_FORMAT", "text"),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ledger: LedgerConfig::default(),
            score: ScoreConfig::default(),
            storage: StorageConfig::default(),
            fees: FeeConfig::default(),
            tokens: default_tokens(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 主 gas 代币（手续费始终以它支付）
    pub fn gas_token(&self) -> Option<&TokenConfig> {
        self.tokens.iter().find(|t| t.denom == crate::domain::chain_config::GAS_DENOM)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("ledger.rpc_url", &self.ledger.rpc_url),
            ("score.endpoint", &self.score.endpoint),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.ledger.address_prefix.is_empty() {
            anyhow::bail!("ledger.address_prefix must not be empty");
        }
        if self.ledger.request_timeout_secs == 0
            || self.ledger.connect_timeout_secs == 0
            || self.ledger.confirm_timeout_secs == 0
            || self.ledger.poll_interval_ms == 0
            || self.score.timeout_secs == 0
        {
            anyhow::bail!("timeouts and poll interval must be positive");
        }

        if self.fees.auto_gas_multiplier < Decimal::ONE {
            anyhow::bail!("fees.auto_gas_multiplier must be >= 1");
        }
        if self.fees.default_gas_price <= Decimal::ZERO || self.fees.tier_gas_limit == 0 {
            anyhow::bail!("fees.default_gas_price and fees.tier_gas_limit must be positive");
        }
        let (low, medium, high) = (
            self.fees.gas_price_low,
            self.fees.gas_price_medium,
            self.fees.gas_price_high,
        );
        if low <= Decimal::ZERO || low > medium || medium > high {
            anyhow::bail!("gas tier prices must be positive and ordered low <= medium <= high");
        }

        for (i, token) in self.tokens.iter().enumerate() {
            if self.tokens[..i].iter().any(|t| t.denom == token.denom) {
                anyhow::bail!("duplicate token denom: {}", token.denom);
            }
            if token.decimals > 18 {
                anyhow::bail!("token {} decimals must be <= 18", token.symbol);
            }
        }
        if self.gas_token().is_none() {
            anyhow::bail!(
                "gas token {} must be configured",
                crate::domain::chain_config::GAS_DENOM
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.ledger.coin_type, 118);
        assert_eq!(config.tokens.len(), 2);
        assert!(config.gas_token().is_some());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[ledger]
rpc_url = "http://localhost:26657"
chain_id = "tura-local"
address_prefix = "tura"
coin_type = 118
request_timeout_secs = 5
connect_timeout_secs = 2
confirm_timeout_secs = 20
poll_interval_ms = 500

[score]
endpoint = "http://localhost:8000"
timeout_secs = 3

[storage]
dir = "/tmp/turawallet"
user_id = "42"

[fees]
auto_gas_multiplier = "1.5"
default_gas_price = "0.025"
tier_gas_limit = 150000
gas_price_low = "0.01"
gas_price_medium = "0.02"
gas_price_high = "0.03"

[[tokens]]
symbol = "TURA"
display_name = "Tura"
denom = "utura"
decimals = 6
display_precision = 6

[logging]
level = "debug"
format = "json"
enable_file_logging = false
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://localhost:26657");
        assert_eq!(config.ledger.chain_id.as_deref(), Some("tura-local"));
        assert_eq!(config.fees.tier_gas_limit, 150000);
        assert_eq!(config.fees.auto_gas_multiplier, Decimal::new(15, 1));
        assert_eq!(config.tokens.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::from_env().unwrap();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.fees.gas_price_low = Decimal::new(5, 2);
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.tokens.retain(|t| t.symbol != "TURA");
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.ledger.rpc_url = "ftp://node".into();
        assert!(bad.validate().is_err());
    }
}
