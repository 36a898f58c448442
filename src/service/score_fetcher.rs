// 信用评分查询
// POST {endpoint}/predict {"wallet_address": ...} -> {"credit_score": number}
// 辅助信息，永不失败：任何错误都降级为 Unavailable

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use serde::Deserialize;

use crate::{
    config::ScoreConfig,
    error::{WalletError, WalletResult},
    infrastructure::log_redact::redact_address,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditScore {
    /// 两位小数
    Score(Decimal),
    /// 服务有响应但没有评分
    NoData,
    /// 服务不可用
    Unavailable,
}

impl CreditScore {
    pub fn from_raw(raw: f64) -> Self {
        match Decimal::from_f64(raw) {
            Some(value) => Self::Score(
                value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            ),
            None => Self::NoData,
        }
    }
}

impl fmt::Display for CreditScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(value) => write!(f, "{:.2}", value),
            Self::NoData => f.write_str("No data"),
            Self::Unavailable => f.write_str("0.0"),
        }
    }
}

/// 评分服务接口
#[async_trait]
pub trait ScoreApi: Send + Sync {
    /// Ok(None) 表示响应中没有 credit_score
    async fn predict(&self, address: &str) -> WalletResult<Option<f64>>;
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    credit_score: Option<f64>,
}

pub struct HttpScoreApi {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpScoreApi {
    pub fn new(config: &ScoreConfig) -> WalletResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(WalletError::network)?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ScoreApi for HttpScoreApi {
    async fn predict(&self, address: &str) -> WalletResult<Option<f64>> {
        let url = format!("{}/predict", self.endpoint);
        let response = self
            .http_client
            .post(&url)
            .json(&serde_json::json!({ "wallet_address": address }))
            .send()
            .await?
            .error_for_status()?;

        let body: PredictResponse = response.json().await?;
        Ok(body.credit_score)
    }
}

#[derive(Clone)]
pub struct ScoreFetcher {
    api: Arc<dyn ScoreApi>,
}

impl ScoreFetcher {
    pub fn new(api: Arc<dyn ScoreApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_score(&self, address: &str) -> CreditScore {
        match self.api.predict(address).await {
            Ok(Some(raw)) => CreditScore::from_raw(raw),
            Ok(None) => CreditScore::NoData,
            Err(e) => {
                tracing::warn!(
                    address = %redact_address(address),
                    error = %e,
                    "Credit score unavailable"
                );
                CreditScore::Unavailable
            }
        }
    }
}
