//! Cosmos SDK protobuf 消息
//!
//! 只声明钱包用到的字段，未声明的字段在解码时被忽略。

use prost::Message;

use crate::domain::balance;

pub const MSG_SEND_TYPE_URL: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// SignMode 枚举值
pub const SIGN_MODE_UNSPECIFIED: i32 = 0;
pub const SIGN_MODE_DIRECT: i32 = 1;

// ============ 通用 ============

/// google.protobuf.Any
#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes, tag = "2")]
    pub value: Vec<u8>,
}

impl Any {
    pub fn pack<M: Message>(type_url: &str, message: &M) -> Self {
        Self {
            type_url: type_url.to_string(),
            value: message.encode_to_vec(),
        }
    }
}

/// cosmos.base.v1beta1.Coin
#[derive(Clone, PartialEq, Message)]
pub struct Coin {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

impl From<&balance::Coin> for Coin {
    fn from(coin: &balance::Coin) -> Self {
        Self {
            denom: coin.denom.clone(),
            amount: coin.amount.clone(),
        }
    }
}

impl From<Coin> for balance::Coin {
    fn from(coin: Coin) -> Self {
        Self {
            denom: coin.denom,
            amount: coin.amount,
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct PubKey {
    #[prost(bytes, tag = "1")]
    pub key: Vec<u8>,
}

// ============ 交易 ============

/// 银行模块转账消息
#[derive(Clone, PartialEq, Message)]
pub struct MsgSend {
    #[prost(string, tag = "1")]
    pub from_address: String,
    #[prost(string, tag = "2")]
    pub to_address: String,
    #[prost(message, repeated, tag = "3")]
    pub amount: Vec<Coin>,
}

impl MsgSend {
    pub fn new(from_address: &str, to_address: &str, amount: balance::Coin) -> Self {
        Self {
            from_address: from_address.to_string(),
            to_address: to_address.to_string(),
            amount: vec![Coin::from(&amount)],
        }
    }

    pub fn to_any(&self) -> Any {
        Any::pack(MSG_SEND_TYPE_URL, self)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct TxBody {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<Any>,
    #[prost(string, tag = "2")]
    pub memo: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthInfo {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfo>,
    /// 模拟时为空 Fee，但字段仍需出现
    #[prost(message, optional, tag = "2")]
    pub fee: Option<Fee>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignerInfo {
    #[prost(message, optional, tag = "1")]
    pub public_key: Option<Any>,
    #[prost(message, optional, tag = "2")]
    pub mode_info: Option<ModeInfo>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

/// ModeInfo 的 oneof 只用到 single 分支
#[derive(Clone, PartialEq, Message)]
pub struct ModeInfo {
    #[prost(message, optional, tag = "1")]
    pub single: Option<ModeInfoSingle>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ModeInfoSingle {
    #[prost(int32, tag = "1")]
    pub mode: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Fee {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<Coin>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignDoc {
    #[prost(bytes, tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes, tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    #[prost(string, tag = "3")]
    pub chain_id: String,
    #[prost(uint64, tag = "4")]
    pub account_number: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxRaw {
    #[prost(bytes, tag = "1")]
    pub body_bytes: Vec<u8>,
    #[prost(bytes, tag = "2")]
    pub auth_info_bytes: Vec<u8>,
    /// 空签名也会写出（模拟交易）
    #[prost(bytes, repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}

// ============ 查询 ============

#[derive(Clone, PartialEq, Message)]
pub struct PageRequest {
    #[prost(bytes, tag = "1")]
    pub key: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub limit: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct PageResponse {
    #[prost(bytes, tag = "1")]
    pub next_key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAllBalancesRequest {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageRequest>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAllBalancesResponse {
    #[prost(message, repeated, tag = "1")]
    pub balances: Vec<Coin>,
    #[prost(message, optional, tag = "2")]
    pub pagination: Option<PageResponse>,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAccountRequest {
    #[prost(string, tag = "1")]
    pub address: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct QueryAccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Any>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BaseAccount {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(message, optional, tag = "2")]
    pub pub_key: Option<Any>,
    #[prost(uint64, tag = "3")]
    pub account_number: u64,
    #[prost(uint64, tag = "4")]
    pub sequence: u64,
}

/// 模块账户，只读取内嵌的 BaseAccount
#[derive(Clone, PartialEq, Message)]
pub struct ModuleAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BaseVestingAccount {
    #[prost(message, optional, tag = "1")]
    pub base_account: Option<BaseAccount>,
}

/// Continuous / Delayed / Periodic / PermanentLocked 共用的外层
#[derive(Clone, PartialEq, Message)]
pub struct VestingAccount {
    #[prost(message, optional, tag = "1")]
    pub base_vesting_account: Option<BaseVestingAccount>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SimulateRequest {
    #[prost(bytes, tag = "2")]
    pub tx_bytes: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GasInfo {
    #[prost(uint64, tag = "1")]
    pub gas_wanted: u64,
    #[prost(uint64, tag = "2")]
    pub gas_used: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SimulateResponse {
    #[prost(message, optional, tag = "1")]
    pub gas_info: Option<GasInfo>,
}
