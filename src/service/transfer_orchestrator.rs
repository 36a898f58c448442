//! 转账编排
//!
//! Idle → Validating → Submitting → Completed | Failed | Unknown
//!
//! - 校验阶段不发起任何网络请求，失败回到 Idle
//! - 每次进入 Submitting 只广播一次，不重试已提交的交易
//! - 广播响应无法解码或确认超时 → Unknown，绝不当作成功

use std::{sync::Arc, time::Duration};

use tokio::sync::{watch, Mutex};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::{FeeConfig, LedgerConfig},
    domain::{
        amount::{parse_positive_amount, to_smallest_units},
        balance::Coin,
        chain_config::{find_token, TokenConfig, GAS_DENOM},
        derivation::Account,
        fee::compute_fee,
        mnemonic::RecoveryPhrase,
        transfer::{TransferRequest, TransferResult, TransferState},
    },
    error::{WalletError, WalletResult},
    infrastructure::{
        ledger_rpc::{LedgerClient, LedgerConnector, TxOutcome},
        log_redact::{redact_address, redact_hex_string, redact_phrases},
    },
    service::{
        account_resolver::AccountResolver,
        transaction_builder::{build_signed_tx, build_simulation_tx, MsgSend, SignedTx, SignerData},
    },
    utils::string_utils::is_blank,
};

/// 本地校验通过后的转账参数
#[derive(Debug, Clone)]
struct ValidatedTransfer {
    token: TokenConfig,
    raw_amount: u128,
}

pub struct TransferOrchestrator {
    connector: Arc<dyn LedgerConnector>,
    resolver: AccountResolver,
    tokens: Vec<TokenConfig>,
    fees: FeeConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
    state: watch::Sender<TransferState>,
    in_flight: Mutex<()>,
}

impl TransferOrchestrator {
    pub fn new(
        connector: Arc<dyn LedgerConnector>,
        resolver: AccountResolver,
        tokens: Vec<TokenConfig>,
        fees: FeeConfig,
        ledger: &LedgerConfig,
    ) -> Self {
        let (state, _) = watch::channel(TransferState::Idle);
        Self {
            connector,
            resolver,
            tokens,
            fees,
            confirm_timeout: Duration::from_secs(ledger.confirm_timeout_secs),
            poll_interval: Duration::from_millis(ledger.poll_interval_ms),
            state,
            in_flight: Mutex::new(()),
        }
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TransferState {
        *self.state.borrow()
    }

    fn transition(&self, target: TransferState) {
        let current = self.state();
        if !current.can_transition_to(&target) {
            tracing::error!(from = %current, to = %target, "Invalid transfer state transition");
            return;
        }
        tracing::debug!(from = %current, to = %target, "Transfer state changed");
        self.state.send_replace(target);
    }

    /// 执行一次转账
    ///
    /// 返回 Err 仅在本地校验失败或已有转账进行中；提交后的所有结果都以 TransferResult 表示。
    pub async fn execute(
        &self,
        phrase: &RecoveryPhrase,
        request: TransferRequest,
    ) -> WalletResult<TransferResult> {
        let _guard = self.in_flight.try_lock().map_err(|_| WalletError::Busy)?;

        let span = tracing::info_span!(
            "transfer",
            transfer_id = %Uuid::new_v4(),
            symbol = %request.symbol,
            recipient = %redact_address(&request.recipient),
            fee_policy = %request.fee_policy,
        );

        async move {
            if self.state().is_final() {
                self.transition(TransferState::Idle);
            }
            self.transition(TransferState::Validating);

            let validated = match self.validate(&request) {
                Ok(validated) => validated,
                Err(e) => {
                    tracing::info!(error = %e, "Transfer validation failed");
                    self.transition(TransferState::Idle);
                    return Err(e);
                }
            };

            self.transition(TransferState::Submitting);
            let result = self.submit(phrase, &request, &validated).await;
            self.transition(result.status);

            match result.status {
                TransferState::Completed => tracing::info!(
                    tx_hash = ?result.transaction_hash,
                    "Transfer completed"
                ),
                TransferState::Unknown => tracing::warn!(
                    tx_hash = ?result.transaction_hash,
                    detail = ?result.error_detail,
                    "Transfer outcome unknown"
                ),
                _ => tracing::warn!(
                    tx_hash = ?result.transaction_hash,
                    detail = ?result.error_detail,
                    "Transfer failed"
                ),
            }

            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// 纯本地校验
    fn validate(&self, request: &TransferRequest) -> WalletResult<ValidatedTransfer> {
        if is_blank(&request.recipient) {
            return Err(WalletError::validation("Recipient address is required"));
        }

        let amount = parse_positive_amount(&request.amount)?;

        let token = find_token(&self.tokens, &request.symbol)
            .ok_or_else(|| {
                WalletError::validation(format!("Unsupported token: {}", request.symbol))
            })?
            .clone();

        let raw_amount = to_smallest_units(amount, token.decimals)?;
        if raw_amount == 0 {
            return Err(WalletError::validation(format!(
                "Amount is below the smallest unit of {}",
                token.symbol
            )));
        }

        request.fee_policy.validate()?;

        Ok(ValidatedTransfer { token, raw_amount })
    }

    async fn submit(
        &self,
        phrase: &RecoveryPhrase,
        request: &TransferRequest,
        validated: &ValidatedTransfer,
    ) -> TransferResult {
        let (client, signed) = match self.prepare(phrase, request, validated).await {
            Ok(prepared) => prepared,
            Err(e) => return TransferResult::failed(None, failure_detail(&e)),
        };

        self.broadcast_and_confirm(client.as_ref(), signed).await
    }

    /// 派生、查询账户、计算手续费并签名（尚未广播）
    async fn prepare(
        &self,
        phrase: &RecoveryPhrase,
        request: &TransferRequest,
        validated: &ValidatedTransfer,
    ) -> WalletResult<(Box<dyn LedgerClient>, SignedTx)> {
        let account: Account = self.resolver.derive_account(phrase)?;
        if !request.from_address.is_empty() && request.from_address != account.address {
            return Err(WalletError::validation(
                "Sender address does not match the loaded wallet",
            ));
        }

        let client = self.connector.connect().await?;
        let chain_id = client.chain_id().await?;
        let info = client.account(&account.address).await?;

        let msg = MsgSend::new(
            &account.address,
            request.recipient.trim(),
            Coin::new(&validated.token.denom, validated.raw_amount),
        );
        let memo = request.memo.as_deref().unwrap_or_default();

        let simulated_gas = if request.fee_policy.requires_simulation() {
            let sim_tx = build_simulation_tx(&msg, memo, &account.public_key, info.sequence);
            let gas_used = client.simulate(&sim_tx).await?;
            tracing::debug!(gas_used, "Transaction simulated");
            Some(gas_used)
        } else {
            None
        };

        let fee = compute_fee(&request.fee_policy, &self.fees, GAS_DENOM, simulated_gas)?;
        tracing::debug!(
            gas_limit = fee.gas_limit,
            fee = %fee.amount.amount,
            denom = %fee.amount.denom,
            "Fee computed"
        );

        let signer_data = SignerData {
            chain_id,
            account_number: info.account_number,
            sequence: info.sequence,
        };
        let signed = build_signed_tx(&msg, memo, &account, &signer_data, &fee);

        Ok((client, signed))
    }

    async fn broadcast_and_confirm(
        &self,
        client: &dyn LedgerClient,
        signed: SignedTx,
    ) -> TransferResult {
        let hash = signed.hash;

        let response = match client.broadcast_sync(&signed.tx_bytes).await {
            Ok(response) => response,
            Err(WalletError::ResponseDecode(e)) => {
                tracing::warn!(
                    tx_hash = %redact_hex_string(&hash, 8),
                    error = %e,
                    "Broadcast response could not be decoded"
                );
                return TransferResult::unknown(hash, unconfirmed_detail());
            }
            Err(e) => return TransferResult::failed(Some(hash), failure_detail(&e)),
        };

        if response.code != 0 {
            let rejection = WalletError::LedgerRejection {
                code: response.code,
                raw_log: response.raw_log,
            };
            tracing::info!(
                code = response.code,
                codespace = %response.codespace,
                "Transaction rejected by CheckTx"
            );
            return TransferResult::failed(Some(hash), failure_detail(&rejection));
        }

        if !response.hash.is_empty() && response.hash != hash {
            tracing::warn!(local = %hash, node = %response.hash, "Node reported a different tx hash");
        }

        match tokio::time::timeout(self.confirm_timeout, self.poll_until_included(client, &hash))
            .await
        {
            Ok(outcome) if outcome.code != 0 => {
                let rejection = WalletError::LedgerRejection {
                    code: outcome.code,
                    raw_log: outcome.raw_log,
                };
                TransferResult::failed(Some(hash), failure_detail(&rejection))
            }
            Ok(outcome) => {
                tracing::debug!(height = outcome.height, "Transaction included");
                TransferResult::completed(hash)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.confirm_timeout.as_secs(),
                    "Transaction not found before confirmation timeout"
                );
                TransferResult::unknown(hash, unconfirmed_detail())
            }
        }
    }

    async fn poll_until_included(
        &self,
        client: &dyn LedgerClient,
        hash: &str,
    ) -> TxOutcome {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match client.find_tx(hash).await {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, "Transaction lookup failed, polling again"),
            }
        }
    }
}

fn failure_detail(err: &WalletError) -> String {
    let detail = match err {
        WalletError::LedgerRejection { raw_log, .. } => raw_log.clone(),
        other => other.user_message(),
    };
    redact_phrases(&detail)
}

fn unconfirmed_detail() -> &'static str {
    "The transaction was submitted but could not be confirmed. Please verify your balance."
}
