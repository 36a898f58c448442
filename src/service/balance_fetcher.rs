// 余额查询
// 每次调用新建账本连接，按配置顺序返回所有已配置代币

use std::sync::Arc;

use crate::{
    domain::{
        balance::{normalize_balances, TokenBalance},
        chain_config::TokenConfig,
    },
    error::WalletResult,
    infrastructure::{ledger_rpc::LedgerConnector, log_redact::redact_address},
};

#[derive(Clone)]
pub struct BalanceFetcher {
    connector: Arc<dyn LedgerConnector>,
    tokens: Vec<TokenConfig>,
}

impl BalanceFetcher {
    pub fn new(connector: Arc<dyn LedgerConnector>, tokens: Vec<TokenConfig>) -> Self {
        Self { connector, tokens }
    }

    pub async fn fetch_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>> {
        let client = self.connector.connect().await?;
        let coins = client.all_balances(address).await.map_err(|e| {
            tracing::warn!(address = %redact_address(address), error = %e, "Balance query failed");
            e
        })?;

        for coin in coins
            .iter()
            .filter(|c| !self.tokens.iter().any(|t| t.denom == c.denom))
        {
            tracing::debug!(denom = %coin.denom, "Ignoring unconfigured denomination");
        }

        let balances = normalize_balances(&coins, &self.tokens);
        tracing::debug!(
            address = %redact_address(address),
            tokens = balances.len(),
            "Balances fetched"
        );
        Ok(balances)
    }
}
