//! 测试辅助模块
//! 提供账本、评分服务、存储与提示的内存假实现

#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use turawallet::{
    app_state::AppState,
    config::{Config, FeeConfig},
    domain::Coin,
    error::{WalletError, WalletResult},
    infrastructure::{
        cloud_storage::{CloudStorage, MemoryCloudStorage},
        ledger_rpc::{AccountInfo, BroadcastResponse, LedgerClient, LedgerConnector, TxOutcome},
        notifier::Notifier,
    },
    service::score_fetcher::ScoreApi,
};

/// BIP39 标准测试向量
pub const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
/// TEST_PHRASE 在 m/44'/118'/0'/0/0 下的 tura 地址
pub const TEST_ADDRESS: &str = "tura19rl4cm2hmr8afy4kldpxz3fka4jguq0ahgcaha";
pub const TEST_PUBKEY_HEX: &str =
    "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62";

/// 快速轮询的测试配置（不依赖环境变量中的值）
pub fn test_config() -> Config {
    let mut config = Config::from_env().expect("config");
    config.ledger.rpc_url = "http://127.0.0.1:1".into();
    config.ledger.chain_id = None;
    config.ledger.address_prefix = "tura".into();
    config.ledger.coin_type = 118;
    config.ledger.confirm_timeout_secs = 1;
    config.ledger.poll_interval_ms = 10;
    config.fees = FeeConfig {
        auto_gas_multiplier: Decimal::new(13, 1),
        default_gas_price: Decimal::new(25, 3),
        tier_gas_limit: 200_000,
        gas_price_low: Decimal::new(1, 2),
        gas_price_medium: Decimal::new(25, 3),
        gas_price_high: Decimal::new(4, 2),
    };
    config
}

// ============ 账本 ============

/// 账本脚本：每个操作的返回值
#[derive(Clone)]
pub struct LedgerScript {
    pub chain_id: String,
    pub balances: Result<Vec<Coin>, WalletError>,
    pub balance_delay: Option<Duration>,
    pub account: AccountInfo,
    pub simulated_gas: Result<u64, WalletError>,
    pub broadcast: Result<BroadcastResponse, WalletError>,
    /// None 表示一直查不到交易
    pub tx_outcome: Option<TxOutcome>,
}

impl Default for LedgerScript {
    fn default() -> Self {
        Self {
            chain_id: "tura-beta-1".into(),
            balances: Ok(vec![Coin::new("utura", 2_500_000), Coin::new("utags", 42_000_000)]),
            balance_delay: None,
            account: AccountInfo {
                account_number: 7,
                sequence: 3,
            },
            simulated_gas: Ok(100_000),
            broadcast: Ok(BroadcastResponse {
                hash: String::new(),
                code: 0,
                codespace: String::new(),
                raw_log: "[]".into(),
            }),
            tx_outcome: Some(TxOutcome {
                height: 100,
                code: 0,
                raw_log: String::new(),
            }),
        }
    }
}

#[derive(Default)]
pub struct LedgerCalls {
    pub connects: AtomicUsize,
    pub chain_id: AtomicUsize,
    pub balances: AtomicUsize,
    pub account: AtomicUsize,
    pub simulate: AtomicUsize,
    pub broadcast: AtomicUsize,
    pub find_tx: AtomicUsize,
}

impl LedgerCalls {
    pub fn total_requests(&self) -> usize {
        [
            &self.chain_id,
            &self.balances,
            &self.account,
            &self.simulate,
            &self.broadcast,
            &self.find_tx,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

struct LedgerInner {
    script: Mutex<LedgerScript>,
    calls: LedgerCalls,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

/// 记录调用次数的账本连接器
#[derive(Clone)]
pub struct RecordingLedger {
    inner: Arc<LedgerInner>,
}

impl RecordingLedger {
    pub fn new(script: LedgerScript) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                script: Mutex::new(script),
                calls: LedgerCalls::default(),
                broadcasts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn calls(&self) -> &LedgerCalls {
        &self.inner.calls
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn update(&self, f: impl FnOnce(&mut LedgerScript)) {
        f(&mut self.inner.script.lock().unwrap());
    }

    pub fn broadcast_payloads(&self) -> Vec<Vec<u8>> {
        self.inner.broadcasts.lock().unwrap().clone()
    }

    fn script(&self) -> LedgerScript {
        self.inner.script.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerConnector for RecordingLedger {
    async fn connect(&self) -> WalletResult<Box<dyn LedgerClient>> {
        self.inner.calls.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn chain_id(&self) -> WalletResult<String> {
        self.inner.calls.chain_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.script().chain_id)
    }

    async fn all_balances(&self, _address: &str) -> WalletResult<Vec<Coin>> {
        self.inner.calls.balances.fetch_add(1, Ordering::SeqCst);
        let script = self.script();
        if let Some(delay) = script.balance_delay {
            tokio::time::sleep(delay).await;
        }
        script.balances
    }

    async fn account(&self, _address: &str) -> WalletResult<AccountInfo> {
        self.inner.calls.account.fetch_add(1, Ordering::SeqCst);
        Ok(self.script().account)
    }

    async fn simulate(&self, _tx_bytes: &[u8]) -> WalletResult<u64> {
        self.inner.calls.simulate.fetch_add(1, Ordering::SeqCst);
        self.script().simulated_gas
    }

    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> WalletResult<BroadcastResponse> {
        self.inner.calls.broadcast.fetch_add(1, Ordering::SeqCst);
        self.inner.broadcasts.lock().unwrap().push(tx_bytes.to_vec());
        self.script().broadcast
    }

    async fn find_tx(&self, _hash: &str) -> WalletResult<Option<TxOutcome>> {
        self.inner.calls.find_tx.fetch_add(1, Ordering::SeqCst);
        Ok(self.script().tx_outcome)
    }
}

// ============ 评分服务 ============

pub struct ScriptedScoreApi {
    response: Result<Option<f64>, WalletError>,
    pub calls: AtomicUsize,
}

impl ScriptedScoreApi {
    pub fn returning(response: Result<Option<f64>, WalletError>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScoreApi for ScriptedScoreApi {
    async fn predict(&self, _address: &str) -> WalletResult<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

// ============ 存储 ============

/// 所有操作都失败的存储
pub struct FailingStorage;

#[async_trait]
impl CloudStorage for FailingStorage {
    async fn get_item(&self, _key: &str) -> WalletResult<Option<String>> {
        Err(WalletError::Storage("cloud storage unavailable".into()))
    }

    async fn set_item(&self, _key: &str, _value: &str) -> WalletResult<()> {
        Err(WalletError::Storage("cloud storage unavailable".into()))
    }

    async fn remove_item(&self, _key: &str) -> WalletResult<()> {
        Err(WalletError::Storage("cloud storage unavailable".into()))
    }
}

// ============ 提示 ============

#[derive(Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.alerts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}

// ============ 组装 ============

pub struct TestHarness {
    pub state: AppState,
    pub ledger: RecordingLedger,
    pub score_api: Arc<ScriptedScoreApi>,
    pub storage: Arc<dyn CloudStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new(script: LedgerScript) -> Self {
        Self::with_storage(script, Arc::new(MemoryCloudStorage::new()))
    }

    pub fn with_storage(script: LedgerScript, storage: Arc<dyn CloudStorage>) -> Self {
        Self::build(script, storage, Ok(Some(712.456)))
    }

    pub fn build(
        script: LedgerScript,
        storage: Arc<dyn CloudStorage>,
        score: Result<Option<f64>, WalletError>,
    ) -> Self {
        let ledger = RecordingLedger::new(script);
        let score_api = Arc::new(ScriptedScoreApi::returning(score));
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::new(
            Arc::new(test_config()),
            storage.clone(),
            Arc::new(ledger.clone()),
            score_api.clone(),
            notifier.clone(),
        );

        Self {
            state,
            ledger,
            score_api,
            storage,
            notifier,
        }
    }
}
