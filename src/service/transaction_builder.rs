//! Cosmos SDK 交易构建
//!
//! MsgSend -> TxBody / AuthInfo -> SignDoc（SIGN_MODE_DIRECT）-> TxRaw。
//! 交易哈希在本地计算：SHA-256(TxRaw bytes) 的大写十六进制。

use prost::Message;
use sha2::{Digest, Sha256};

pub use crate::infrastructure::cosmos_proto::MsgSend;
use crate::{
    domain::{derivation::Account, fee::Fee},
    infrastructure::cosmos_proto::{
        self, Any, AuthInfo, ModeInfo, ModeInfoSingle, PubKey, SignDoc, SignerInfo, TxBody, TxRaw,
        SECP256K1_PUBKEY_TYPE_URL, SIGN_MODE_DIRECT, SIGN_MODE_UNSPECIFIED,
    },
};

/// 签名所需的链上数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// 已签名交易
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub tx_bytes: Vec<u8>,
    pub hash: String,
}

pub fn encode_body(msg: &MsgSend, memo: &str) -> Vec<u8> {
    TxBody {
        messages: vec![msg.to_any()],
        memo: memo.to_string(),
    }
    .encode_to_vec()
}

/// fee 为 None 时写入空 Fee（模拟用）
fn encode_auth_info(public_key: &[u8], sequence: u64, fee: Option<&Fee>, sign_mode: i32) -> Vec<u8> {
    let signer_info = SignerInfo {
        public_key: Some(Any::pack(
            SECP256K1_PUBKEY_TYPE_URL,
            &PubKey {
                key: public_key.to_vec(),
            },
        )),
        mode_info: Some(ModeInfo {
            single: Some(ModeInfoSingle { mode: sign_mode }),
        }),
        sequence,
    };

    let fee = fee
        .map(|fee| cosmos_proto::Fee {
            amount: vec![(&fee.amount).into()],
            gas_limit: fee.gas_limit,
        })
        .unwrap_or_default();

    AuthInfo {
        signer_infos: vec![signer_info],
        fee: Some(fee),
    }
    .encode_to_vec()
}

pub fn encode_sign_doc(
    body_bytes: &[u8],
    auth_info_bytes: &[u8],
    chain_id: &str,
    account_number: u64,
) -> Vec<u8> {
    SignDoc {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.to_vec(),
        chain_id: chain_id.to_string(),
        account_number,
    }
    .encode_to_vec()
}

pub fn encode_tx_raw(body_bytes: &[u8], auth_info_bytes: &[u8], signatures: &[&[u8]]) -> Vec<u8> {
    TxRaw {
        body_bytes: body_bytes.to_vec(),
        auth_info_bytes: auth_info_bytes.to_vec(),
        signatures: signatures.iter().map(|s| s.to_vec()).collect(),
    }
    .encode_to_vec()
}

/// 交易哈希：SHA-256 大写十六进制
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

/// 模拟用交易：空签名、UNSPECIFIED 签名模式、空手续费
pub fn build_simulation_tx(msg: &MsgSend, memo: &str, public_key: &[u8], sequence: u64) -> Vec<u8> {
    let body = encode_body(msg, memo);
    let auth_info = encode_auth_info(public_key, sequence, None, SIGN_MODE_UNSPECIFIED);
    encode_tx_raw(&body, &auth_info, &[&[]])
}

/// 构建并签名（SIGN_MODE_DIRECT）
pub fn build_signed_tx(
    msg: &MsgSend,
    memo: &str,
    account: &Account,
    signer_data: &SignerData,
    fee: &Fee,
) -> SignedTx {
    let body = encode_body(msg, memo);
    let auth_info = encode_auth_info(
        &account.public_key,
        signer_data.sequence,
        Some(fee),
        SIGN_MODE_DIRECT,
    );
    let sign_doc = encode_sign_doc(
        &body,
        &auth_info,
        &signer_data.chain_id,
        signer_data.account_number,
    );

    let signature = account.signer.sign(&sign_doc);
    let tx_bytes = encode_tx_raw(&body, &auth_info, &[&signature]);
    let hash = tx_hash(&tx_bytes);

    SignedTx { tx_bytes, hash }
}
