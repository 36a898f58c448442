//! 钱包会话
//!
//! 串联凭据存储、账户派生、余额/评分查询与转账，维护当前视图的会话状态。
//! 错误一律通过 Notifier 提示用户，同时返回给调用方。

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::{
    app_state::AppState,
    domain::{
        balance::TokenBalance,
        derivation::Account,
        mnemonic::RecoveryPhrase,
        transfer::{TransferRequest, TransferResult, TransferState},
    },
    error::{WalletError, WalletResult},
    infrastructure::{log_redact::redact_address, notifier::Notifier},
    service::{
        account_resolver::AccountResolver,
        balance_fetcher::BalanceFetcher,
        credential_store::CredentialStore,
        score_fetcher::{CreditScore, ScoreFetcher},
        transfer_orchestrator::TransferOrchestrator,
    },
    utils::string_utils::mask_address,
};

const LOAD_FAILED: &str = "Failed to load existing wallet. Please try again.";
const GENERATE_FAILED: &str = "Failed to generate wallet. Please try again.";
const IMPORT_FAILED: &str = "Failed to import wallet. Please check your mnemonic and try again.";
const BALANCES_FAILED: &str = "Failed to fetch balances. Please try again later.";
const RESET_OK: &str = "Wallet has been reset successfully.";
const RESET_FAILED: &str = "Failed to reset wallet. Please try again.";

#[derive(Default)]
struct SessionState {
    phrase: Option<RecoveryPhrase>,
    account: Option<Account>,
    balances: Vec<TokenBalance>,
    credit_score: Option<CreditScore>,
}

impl SessionState {
    fn holds(&self, address: &str) -> bool {
        self.account.as_ref().map(|a| a.address.as_str()) == Some(address)
    }
}

/// 展示层读取的会话快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub address: Option<String>,
    pub masked_address: Option<String>,
    pub balances: Vec<TokenBalance>,
    pub credit_score: Option<CreditScore>,
}

pub struct WalletSession {
    credentials: CredentialStore,
    resolver: AccountResolver,
    balance_fetcher: BalanceFetcher,
    score_fetcher: ScoreFetcher,
    transfers: TransferOrchestrator,
    notifier: Arc<dyn Notifier>,
    state: RwLock<SessionState>,
    // generate / import / reset / load 互斥
    busy: Mutex<()>,
    view: StdMutex<CancellationToken>,
}

impl WalletSession {
    pub fn new(app: &AppState) -> Self {
        let config = &app.config;
        let resolver = AccountResolver::new(app.chain.clone());

        Self {
            credentials: CredentialStore::new(app.storage.clone()),
            balance_fetcher: BalanceFetcher::new(app.ledger.clone(), config.tokens.clone()),
            score_fetcher: ScoreFetcher::new(app.score_api.clone()),
            transfers: TransferOrchestrator::new(
                app.ledger.clone(),
                resolver.clone(),
                config.tokens.clone(),
                config.fees.clone(),
                &config.ledger,
            ),
            resolver,
            notifier: app.notifier.clone(),
            state: RwLock::new(SessionState::default()),
            busy: Mutex::new(()),
            view: StdMutex::new(CancellationToken::new()),
        }
    }

    fn view_token(&self) -> CancellationToken {
        self.view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 取消当前视图内进行中的查询，并开启新的视图作用域
    pub fn dismiss_view(&self) {
        let mut view = self.view.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        view.cancel();
        *view = CancellationToken::new();
        tracing::debug!("View scope dismissed");
    }

    async fn fail<T>(&self, alert: &str, err: WalletError) -> WalletResult<T> {
        tracing::warn!(code = err.code(), error = %err, "Wallet operation failed");
        self.notifier.show_alert(alert).await;
        Err(err)
    }

    /// 切换账户时同时关闭旧视图，旧账户的查询结果不能写回
    async fn install(&self, phrase: RecoveryPhrase, account: Account) {
        self.dismiss_view();
        tracing::debug!(public_key = %account.public_key_hex(), "Account installed");
        let mut state = self.state.write().await;
        *state = SessionState {
            phrase: Some(phrase),
            account: Some(account),
            balances: Vec::new(),
            credit_score: None,
        };
    }

    /// 启动时读取已保存的钱包；返回地址（没有钱包时为 None）
    pub async fn load_existing(&self) -> WalletResult<Option<String>> {
        let _guard = self.busy.try_lock().map_err(|_| WalletError::Busy)?;

        let phrase = match self.credentials.load().await {
            Ok(Some(phrase)) => phrase,
            Ok(None) => {
                tracing::debug!("No stored wallet");
                return Ok(None);
            }
            Err(e) => return self.fail(LOAD_FAILED, e).await,
        };

        let account = match self.resolver.derive_account(&phrase) {
            Ok(account) => account,
            Err(e) => return self.fail(LOAD_FAILED, e).await,
        };

        let address = account.address.clone();
        self.install(phrase, account).await;
        tracing::info!(address = %redact_address(&address), "Existing wallet loaded");
        Ok(Some(address))
    }

    /// 生成新钱包并保存；返回助记词供一次性备份展示
    pub async fn generate(&self) -> WalletResult<RecoveryPhrase> {
        let _guard = self.busy.try_lock().map_err(|_| WalletError::Busy)?;

        let created = async {
            let phrase = RecoveryPhrase::generate()?;
            let account = self.resolver.derive_account(&phrase)?;
            self.credentials.save(&phrase).await?;
            Ok::<_, WalletError>((phrase, account))
        }
        .await;

        match created {
            Ok((phrase, account)) => {
                tracing::info!(address = %redact_address(&account.address), "Wallet generated");
                self.install(phrase.clone(), account).await;
                Ok(phrase)
            }
            Err(e) => self.fail(GENERATE_FAILED, e).await,
        }
    }

    /// 导入助记词；只有有效的助记词才会被保存
    pub async fn import(&self, words: &str) -> WalletResult<String> {
        let _guard = self.busy.try_lock().map_err(|_| WalletError::Busy)?;

        let imported = async {
            let (phrase, account) = self.resolver.derive_from_words(words)?;
            self.credentials.save(&phrase).await?;
            Ok::<_, WalletError>((phrase, account))
        }
        .await;

        match imported {
            Ok((phrase, account)) => {
                let address = account.address.clone();
                tracing::info!(address = %redact_address(&address), "Wallet imported");
                self.install(phrase, account).await;
                Ok(address)
            }
            Err(e) => self.fail(IMPORT_FAILED, e).await,
        }
    }

    pub async fn export_phrase(&self) -> WalletResult<RecoveryPhrase> {
        self.state
            .read()
            .await
            .phrase
            .clone()
            .ok_or(WalletError::NoWallet)
    }

    /// 删除保存的助记词并清空会话
    pub async fn reset(&self) -> WalletResult<()> {
        let _guard = self.busy.try_lock().map_err(|_| WalletError::Busy)?;

        if let Err(e) = self.credentials.clear().await {
            return self.fail(RESET_FAILED, e).await;
        }

        // 旧账户的查询结果不能再写回
        self.dismiss_view();
        *self.state.write().await = SessionState::default();

        tracing::info!("Wallet reset");
        self.notifier.show_alert(RESET_OK).await;
        Ok(())
    }

    async fn current_address(&self) -> WalletResult<String> {
        self.state
            .read()
            .await
            .account
            .as_ref()
            .map(|a| a.address.clone())
            .ok_or(WalletError::NoWallet)
    }

    /// 并发刷新余额与信用评分
    pub async fn refresh(&self) -> WalletResult<SessionSnapshot> {
        let address = self.current_address().await?;
        let token = self.view_token();

        let fetches = async {
            tokio::join!(
                self.balance_fetcher.fetch_balances(&address),
                self.score_fetcher.fetch_score(&address),
            )
        };
        let (balances, score) = tokio::select! {
            _ = token.cancelled() => return Err(WalletError::Cancelled),
            results = fetches => results,
        };
        if token.is_cancelled() {
            return Err(WalletError::Cancelled);
        }

        {
            let mut state = self.state.write().await;
            if !state.holds(&address) {
                return Err(WalletError::Cancelled);
            }
            state.credit_score = Some(score);
            if let Ok(balances) = &balances {
                state.balances = balances.clone();
            }
        }

        match balances {
            Ok(_) => Ok(self.snapshot().await),
            // 保留上一次的余额
            Err(e) => self.fail(BALANCES_FAILED, e).await,
        }
    }

    /// 只刷新余额
    pub async fn refresh_balances(&self) -> WalletResult<Vec<TokenBalance>> {
        let address = self.current_address().await?;
        let token = self.view_token();

        let result = tokio::select! {
            _ = token.cancelled() => return Err(WalletError::Cancelled),
            result = self.balance_fetcher.fetch_balances(&address) => result,
        };
        if token.is_cancelled() {
            return Err(WalletError::Cancelled);
        }

        match result {
            Ok(balances) => {
                let mut state = self.state.write().await;
                if !state.holds(&address) {
                    return Err(WalletError::Cancelled);
                }
                state.balances = balances.clone();
                Ok(balances)
            }
            Err(e) => self.fail(BALANCES_FAILED, e).await,
        }
    }

    /// 转账；成功后刷新一次余额
    pub async fn transfer(&self, mut request: TransferRequest) -> WalletResult<TransferResult> {
        let (phrase, address) = {
            let state = self.state.read().await;
            match (&state.phrase, &state.account) {
                (Some(phrase), Some(account)) => (phrase.clone(), account.address.clone()),
                _ => return self.fail(&WalletError::NoWallet.user_message(), WalletError::NoWallet).await,
            }
        };
        if request.from_address.is_empty() {
            request.from_address = address;
        }

        let result = match self.transfers.execute(&phrase, request).await {
            Ok(result) => result,
            Err(e) => return self.fail(&e.user_message(), e).await,
        };

        self.notifier.show_alert(&result.user_message()).await;

        if result.success() {
            // 余额刷新失败已单独提示，不影响转账结果
            if let Err(e) = self.refresh_balances().await {
                tracing::debug!(error = %e, "Post-transfer balance refresh failed");
            }
        }

        Ok(result)
    }

    pub fn transfer_state(&self) -> TransferState {
        self.transfers.state()
    }

    pub fn subscribe_transfers(&self) -> watch::Receiver<TransferState> {
        self.transfers.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        let address = state.account.as_ref().map(|a| a.address.clone());

        SessionSnapshot {
            masked_address: address.as_deref().map(mask_address),
            address,
            balances: state.balances.clone(),
            credit_score: state.credit_score,
        }
    }
}
