// 账本 RPC 客户端
// CometBFT JSON-RPC over HTTP POST：status / abci_query / broadcast_tx_sync / tx
// 查询与模拟走 abci_query 的 gRPC 路径，请求与响应体为 protobuf

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use prost::Message;
use serde::{de::DeserializeOwned, Deserialize};
use tokio::sync::OnceCell;

use crate::{
    config::LedgerConfig,
    domain::balance::Coin,
    error::{WalletError, WalletResult},
    infrastructure::cosmos_proto::{
        BaseAccount, ModuleAccount, PageRequest, QueryAccountRequest, QueryAccountResponse,
        QueryAllBalancesRequest, QueryAllBalancesResponse, SimulateRequest, SimulateResponse,
        VestingAccount,
    },
};

const ALL_BALANCES_PATH: &str = "/cosmos.bank.v1beta1.Query/AllBalances";
const ACCOUNT_PATH: &str = "/cosmos.auth.v1beta1.Query/Account";
const SIMULATE_PATH: &str = "/cosmos.tx.v1beta1.Service/Simulate";

const BASE_ACCOUNT_TYPE: &str = "/cosmos.auth.v1beta1.BaseAccount";
const MODULE_ACCOUNT_TYPE: &str = "/cosmos.auth.v1beta1.ModuleAccount";
/// 外层为 BaseVestingAccount，其内才是 BaseAccount
const VESTING_ACCOUNT_TYPES: &[&str] = &[
    "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
    "/cosmos.vesting.v1beta1.DelayedVestingAccount",
    "/cosmos.vesting.v1beta1.PeriodicVestingAccount",
    "/cosmos.vesting.v1beta1.PermanentLockedAccount",
];

const BALANCES_PAGE_LIMIT: u64 = 100;
/// 防止节点返回重复 next_key 导致死循环
const MAX_BALANCE_PAGES: usize = 50;

/// 签名所需的链上账户信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// broadcast_tx_sync 的结果（CheckTx 阶段）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResponse {
    pub hash: String,
    pub code: u32,
    pub codespace: String,
    pub raw_log: String,
}

/// 已上链交易的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
}

/// 单次连接上的账本操作
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn chain_id(&self) -> WalletResult<String>;

    /// 全部余额（已跟随分页读完）
    async fn all_balances(&self, address: &str) -> WalletResult<Vec<Coin>>;

    async fn account(&self, address: &str) -> WalletResult<AccountInfo>;

    /// 模拟交易，返回 gas_used
    async fn simulate(&self, tx_bytes: &[u8]) -> WalletResult<u64>;

    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> WalletResult<BroadcastResponse>;

    /// 按哈希查询交易；尚未上链时返回 None
    async fn find_tx(&self, hash: &str) -> WalletResult<Option<TxOutcome>>;
}

/// 每次调用都建立新的客户端，调用之间不共享连接
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn connect(&self) -> WalletResult<Box<dyn LedgerClient>>;
}

pub struct RpcLedgerConnector {
    config: LedgerConfig,
}

impl RpcLedgerConnector {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LedgerConnector for RpcLedgerConnector {
    async fn connect(&self) -> WalletResult<Box<dyn LedgerClient>> {
        let client = RpcLedgerClient::new(&self.config)?;
        Ok(Box::new(client))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl RpcError {
    fn detail(&self) -> String {
        match &self.data {
            Some(data) if !data.is_empty() => format!("{} ({}): {}", self.message, self.code, data),
            _ => format!("{} ({})", self.message, self.code),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    node_info: NodeInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    network: String,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciResponse,
}

#[derive(Debug, Deserialize)]
struct AbciResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastResult {
    code: u32,
    #[serde(default)]
    codespace: String,
    #[serde(default)]
    log: String,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    height: String,
    tx_result: TxExecResult,
}

#[derive(Debug, Deserialize)]
struct TxExecResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
}

pub struct RpcLedgerClient {
    http_client: reqwest::Client,
    rpc_url: String,
    chain_id: OnceCell<String>,
}

impl RpcLedgerClient {
    pub fn new(config: &LedgerConfig) -> WalletResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(WalletError::network)?;

        let chain_id = OnceCell::new_with(config.chain_id.clone());

        Ok(Self {
            http_client,
            rpc_url: config.rpc_url.trim_end_matches('/').to_string(),
            chain_id,
        })
    }

    /// 发送 JSON-RPC 请求；内层 Err 为节点返回的 RPC 错误
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> WalletResult<Result<T, RpcError>> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        tracing::trace!(method = %method, rpc = %self.rpc_url, "Ledger RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(WalletError::network)?;

        let status = response.status();
        // 节点在 RPC 错误时可能返回 500，但响应体仍是 JSON-RPC 信封
        let body = response.bytes().await.map_err(WalletError::network)?;
        let envelope: RpcEnvelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(WalletError::decode(e)),
            Err(_) => {
                return Err(WalletError::Network(format!(
                    "ledger RPC returned HTTP {}",
                    status
                )))
            }
        };

        match (envelope.result, envelope.error) {
            (_, Some(error)) => Ok(Err(error)),
            (Some(result), None) => Ok(Ok(result)),
            (None, None) => Err(WalletError::decode(format!(
                "{} response has neither result nor error",
                method
            ))),
        }
    }

    async fn call_ok<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> WalletResult<T> {
        self.call(method, params)
            .await?
            .map_err(|e| WalletError::Network(format!("{} failed: {}", method, e.detail())))
    }

    /// abci_query，返回 protobuf 响应体
    async fn abci_query(&self, path: &str, data: &[u8]) -> WalletResult<Vec<u8>> {
        let result: AbciQueryResult = self
            .call_ok(
                "abci_query",
                serde_json::json!({
                    "path": path,
                    "data": hex::encode(data),
                    "prove": false,
                }),
            )
            .await?;

        let response = result.response;
        if response.code != 0 {
            tracing::debug!(path = %path, code = response.code, log = %response.log, "ABCI query rejected");
            return Err(WalletError::LedgerRejection {
                code: response.code,
                raw_log: response.log,
            });
        }

        match response.value {
            Some(value) if !value.is_empty() => base64::engine::general_purpose::STANDARD
                .decode(value)
                .map_err(WalletError::decode),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn chain_id(&self) -> WalletResult<String> {
        self.chain_id
            .get_or_try_init(|| async {
                let status: StatusResult =
                    self.call_ok("status", serde_json::json!({})).await?;
                tracing::debug!(chain_id = %status.node_info.network, "Fetched chain id from node status");
                Ok::<_, WalletError>(status.node_info.network)
            })
            .await
            .cloned()
    }

    async fn all_balances(&self, address: &str) -> WalletResult<Vec<Coin>> {
        let mut coins = Vec::new();
        let mut next_key: Option<Vec<u8>> = None;

        for _ in 0..MAX_BALANCE_PAGES {
            let request = encode_all_balances_request(address, next_key.as_deref());
            let response = self.abci_query(ALL_BALANCES_PATH, &request).await?;
            let page = decode_all_balances_response(&response)?;

            coins.extend(page.balances);
            match page.next_key {
                Some(key) if !key.is_empty() => next_key = Some(key),
                _ => return Ok(coins),
            }
        }

        tracing::warn!(pages = MAX_BALANCE_PAGES, "Balance pagination limit reached");
        Ok(coins)
    }

    async fn account(&self, address: &str) -> WalletResult<AccountInfo> {
        let request = QueryAccountRequest {
            address: address.to_string(),
        }
        .encode_to_vec();
        let response = self.abci_query(ACCOUNT_PATH, &request).await?;
        decode_account_response(&response)
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> WalletResult<u64> {
        let request = SimulateRequest {
            tx_bytes: tx_bytes.to_vec(),
        }
        .encode_to_vec();
        let response = self.abci_query(SIMULATE_PATH, &request).await?;
        decode_simulate_response(&response)
    }

    async fn broadcast_sync(&self, tx_bytes: &[u8]) -> WalletResult<BroadcastResponse> {
        let result: BroadcastResult = self
            .call_ok(
                "broadcast_tx_sync",
                serde_json::json!({
                    "tx": base64::engine::general_purpose::STANDARD.encode(tx_bytes),
                }),
            )
            .await?;

        Ok(BroadcastResponse {
            hash: result.hash.to_uppercase(),
            code: result.code,
            codespace: result.codespace,
            raw_log: result.log,
        })
    }

    async fn find_tx(&self, hash: &str) -> WalletResult<Option<TxOutcome>> {
        let hash_bytes = hex::decode(hash)
            .map_err(|e| WalletError::validation(format!("invalid transaction hash: {}", e)))?;
        let result: Result<TxResult, RpcError> = self
            .call(
                "tx",
                serde_json::json!({
                    "hash": base64::engine::general_purpose::STANDARD.encode(hash_bytes),
                    "prove": false,
                }),
            )
            .await?;

        match result {
            Ok(tx) => Ok(Some(TxOutcome {
                height: tx.height.parse().unwrap_or_default(),
                code: tx.tx_result.code,
                raw_log: tx.tx_result.log,
            })),
            // 节点对尚未索引的交易返回 RPC 错误
            Err(e) => {
                tracing::trace!(tx_hash = %hash, error = %e.detail(), "Transaction not found yet");
                Ok(None)
            }
        }
    }
}

struct BalancesPage {
    balances: Vec<Coin>,
    next_key: Option<Vec<u8>>,
}

fn encode_all_balances_request(address: &str, page_key: Option<&[u8]>) -> Vec<u8> {
    QueryAllBalancesRequest {
        address: address.to_string(),
        pagination: Some(PageRequest {
            key: page_key.map(<[u8]>::to_vec).unwrap_or_default(),
            limit: BALANCES_PAGE_LIMIT,
        }),
    }
    .encode_to_vec()
}

fn decode_all_balances_response(bytes: &[u8]) -> WalletResult<BalancesPage> {
    let response = QueryAllBalancesResponse::decode(bytes)?;

    Ok(BalancesPage {
        balances: response.balances.into_iter().map(Coin::from).collect(),
        next_key: response.pagination.map(|page| page.next_key),
    })
}

fn decode_account_response(bytes: &[u8]) -> WalletResult<AccountInfo> {
    let any = QueryAccountResponse::decode(bytes)?
        .account
        .ok_or_else(|| WalletError::decode("account response has no account"))?;
    let value = any.value.as_slice();

    let base = if any.type_url == BASE_ACCOUNT_TYPE {
        Some(BaseAccount::decode(value)?)
    } else if any.type_url == MODULE_ACCOUNT_TYPE {
        ModuleAccount::decode(value)?.base_account
    } else if VESTING_ACCOUNT_TYPES.contains(&any.type_url.as_str()) {
        VestingAccount::decode(value)?
            .base_vesting_account
            .and_then(|vesting| vesting.base_account)
    } else {
        return Err(WalletError::decode(format!(
            "unsupported account type: {}",
            any.type_url
        )));
    };

    // proto3 省略默认值，新账户的 account_number / sequence 解码为 0
    let base = base.ok_or_else(|| WalletError::decode("wrapped account has no base account"))?;
    Ok(AccountInfo {
        account_number: base.account_number,
        sequence: base.sequence,
    })
}

fn decode_simulate_response(bytes: &[u8]) -> WalletResult<u64> {
    SimulateResponse::decode(bytes)?
        .gas_info
        .map(|gas| gas.gas_used)
        .ok_or_else(|| WalletError::decode("simulate response has no gas_info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cosmos_proto::{self, Any, BaseVestingAccount, GasInfo, PageResponse};

    fn base_account(number: u64, sequence: u64) -> BaseAccount {
        BaseAccount {
            address: "tura1xyz".into(),
            pub_key: None,
            account_number: number,
            sequence,
        }
    }

    fn account_response<M: Message>(type_url: &str, account: &M) -> Vec<u8> {
        QueryAccountResponse {
            account: Some(Any::pack(type_url, account)),
        }
        .encode_to_vec()
    }

    #[test]
    fn test_decode_balances_page() {
        let bytes = QueryAllBalancesResponse {
            balances: vec![
                cosmos_proto::Coin::from(&Coin::new("utura", 1_500_000)),
                cosmos_proto::Coin::from(&Coin::new("utags", 7)),
            ],
            pagination: Some(PageResponse {
                next_key: b"next".to_vec(),
            }),
        }
        .encode_to_vec();

        let page = decode_all_balances_response(&bytes).unwrap();
        assert_eq!(page.balances.len(), 2);
        assert_eq!(page.balances[0], Coin::new("utura", 1_500_000));
        assert_eq!(page.next_key.as_deref(), Some(&b"next"[..]));
    }

    #[test]
    fn test_decode_empty_balances() {
        let page = decode_all_balances_response(&[]).unwrap();
        assert!(page.balances.is_empty());
        assert!(page.next_key.is_none());
    }

    #[test]
    fn test_decode_truncated_balances_is_decode_error() {
        let mut bytes = QueryAllBalancesResponse {
            balances: vec![cosmos_proto::Coin::from(&Coin::new("utura", 1))],
            pagination: None,
        }
        .encode_to_vec();
        bytes.truncate(bytes.len() - 2);

        assert!(matches!(
            decode_all_balances_response(&bytes),
            Err(WalletError::ResponseDecode(_))
        ));
    }

    #[test]
    fn test_encode_balances_request_with_key() {
        let bytes = encode_all_balances_request("tura1abc", Some(b"k"));
        let request = QueryAllBalancesRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(request.address, "tura1abc");

        let pagination = request.pagination.unwrap();
        assert_eq!(pagination.key, b"k");
        assert_eq!(pagination.limit, BALANCES_PAGE_LIMIT);
    }

    #[test]
    fn test_decode_base_account() {
        let bytes = account_response(BASE_ACCOUNT_TYPE, &base_account(12, 3));
        let info = decode_account_response(&bytes).unwrap();
        assert_eq!(
            info,
            AccountInfo {
                account_number: 12,
                sequence: 3
            }
        );
    }

    #[test]
    fn test_decode_fresh_account_defaults_to_zero() {
        let bytes = account_response(BASE_ACCOUNT_TYPE, &base_account(0, 0));
        let info = decode_account_response(&bytes).unwrap();
        assert_eq!(info.account_number, 0);
        assert_eq!(info.sequence, 0);
    }

    #[test]
    fn test_decode_module_account() {
        let module = ModuleAccount {
            base_account: Some(base_account(2, 0)),
        };
        let info = decode_account_response(&account_response(MODULE_ACCOUNT_TYPE, &module)).unwrap();
        assert_eq!(info.account_number, 2);
    }

    #[test]
    fn test_decode_vesting_account() {
        let continuous = VestingAccount {
            base_vesting_account: Some(BaseVestingAccount {
                base_account: Some(base_account(40, 9)),
            }),
        };
        let bytes = account_response("/cosmos.vesting.v1beta1.ContinuousVestingAccount", &continuous);

        let info = decode_account_response(&bytes).unwrap();
        assert_eq!(info.account_number, 40);
        assert_eq!(info.sequence, 9);
    }

    #[test]
    fn test_decode_unknown_account_type() {
        let bytes = account_response("/foo.Account", &base_account(1, 1));
        assert!(matches!(
            decode_account_response(&bytes),
            Err(WalletError::ResponseDecode(_))
        ));
    }

    #[test]
    fn test_decode_simulate_response() {
        let bytes = SimulateResponse {
            gas_info: Some(GasInfo {
                gas_wanted: 0,
                gas_used: 87_654,
            }),
        }
        .encode_to_vec();
        assert_eq!(decode_simulate_response(&bytes).unwrap(), 87_654);

        assert!(decode_simulate_response(&[]).is_err());
    }
}
