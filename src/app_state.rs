use std::sync::Arc;

use crate::{
    config::Config,
    domain::chain_config::ChainConfig,
    error::WalletResult,
    infrastructure::{
        cloud_storage::{CloudStorage, FileCloudStorage},
        ledger_rpc::{LedgerConnector, RpcLedgerConnector},
        notifier::{ConsoleNotifier, Notifier},
    },
    service::score_fetcher::{HttpScoreApi, ScoreApi},
};

/// 应用状态
/// 注入的外部能力（存储、账本、评分、提示）与配置
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chain: ChainConfig,
    pub storage: Arc<dyn CloudStorage>,
    pub ledger: Arc<dyn LedgerConnector>,
    pub score_api: Arc<dyn ScoreApi>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// 由调用方提供所有依赖（测试注入假实现）
    pub fn new(
        config: Arc<Config>,
        storage: Arc<dyn CloudStorage>,
        ledger: Arc<dyn LedgerConnector>,
        score_api: Arc<dyn ScoreApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let chain = ChainConfig::from_ledger_config(&config.ledger);
        Self {
            config,
            chain,
            storage,
            ledger,
            score_api,
            notifier,
        }
    }

    /// 生产实现：文件存储 + RPC 账本 + HTTP 评分服务 + 控制台提示
    pub fn from_config(config: Arc<Config>) -> WalletResult<Self> {
        let storage = Arc::new(FileCloudStorage::new(
            &config.storage.dir,
            &config.storage.user_id,
        )?);
        let ledger = Arc::new(RpcLedgerConnector::new(config.ledger.clone()));
        let score_api = Arc::new(HttpScoreApi::new(&config.score)?);

        Ok(Self::new(
            config,
            storage,
            ledger,
            score_api,
            Arc::new(ConsoleNotifier),
        ))
    }
}
