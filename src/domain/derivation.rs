//! 账户派生
//!
//! 从恢复短语按固定路径派生 secp256k1 账户（Cosmos 地址格式）

use std::fmt;

use bitcoin::hashes::{hash160, Hash};
use coins_bip32::prelude::*;
use k256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};

use crate::{
    domain::{chain_config::ChainConfig, mnemonic::RecoveryPhrase},
    error::WalletError,
};

/// 签名能力（私钥只存在于内存中）
#[derive(Clone)]
pub struct AccountSigner {
    key: SigningKey,
}

impl AccountSigner {
    /// 对字节签名（SHA-256 + ECDSA，low-S 规范化），返回 64 字节 r||s
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let signature: Signature = self.key.sign(message);
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        out
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }
}

impl fmt::Debug for AccountSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountSigner([REDACTED])")
    }
}

/// 派生结果
#[derive(Debug, Clone)]
pub struct Account {
    /// Bech32 地址
    pub address: String,
    /// 压缩公钥（33 字节）
    pub public_key: Vec<u8>,
    pub derivation_path: String,
    pub signer: AccountSigner,
}

impl Account {
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

/// 从助记词派生账户
pub fn derive_account(phrase: &RecoveryPhrase, chain: &ChainConfig) -> Result<Account, WalletError> {
    let seed = phrase.to_seed()?;
    let path = chain.wallet_path();

    let master_key = XPriv::root_from_seed(&seed[..], None)
        .map_err(|e| WalletError::Derivation(format!("failed to derive master key: {}", e)))?;

    let derived_key = master_key
        .derive_path(path.as_str())
        .map_err(|e| WalletError::Derivation(format!("failed to derive key: {}", e)))?;

    // XPriv 实现 AsRef<SigningKey>
    let signing_key: &SigningKey = derived_key.as_ref();
    let public_key = signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec();

    let address = address_from_public_key(&public_key, &chain.address_prefix)?;

    Ok(Account {
        address,
        public_key,
        derivation_path: path,
        signer: AccountSigner {
            key: signing_key.clone(),
        },
    })
}

/// Cosmos 地址: bech32(prefix, RIPEMD160(SHA256(compressed_pubkey)))
pub fn address_from_public_key(public_key: &[u8], prefix: &str) -> Result<String, WalletError> {
    let account_id = hash160::Hash::hash(public_key).to_byte_array();
    let hrp = bech32::Hrp::parse(prefix)
        .map_err(|e| WalletError::Derivation(format!("invalid address prefix: {}", e)))?;
    bech32::encode::<bech32::Bech32>(hrp, &account_id)
        .map_err(|e| WalletError::Derivation(format!("bech32 encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::signature::Verifier;

    use super::*;

    const TEST_PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn decode_address(address: &str) -> (String, Vec<u8>) {
        let (hrp, data) = bech32::decode(address).unwrap();
        (hrp.to_string(), data)
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let chain = ChainConfig::default();
        let phrase = RecoveryPhrase::parse(TEST_PHRASE).unwrap();

        let first = derive_account(&phrase, &chain).unwrap();
        let second = derive_account(&phrase, &chain).unwrap();

        assert_eq!(first.address, second.address);
        assert_eq!(first.public_key, second.public_key);
        assert_eq!(first.derivation_path, "m/44'/118'/0'/0/0");
    }

    #[test]
    fn test_address_format() {
        let chain = ChainConfig::default();
        let phrase = RecoveryPhrase::parse(TEST_PHRASE).unwrap();
        let account = derive_account(&phrase, &chain).unwrap();

        assert!(account.address.starts_with("tura1"));
        assert_eq!(account.public_key.len(), 33);

        let (prefix, data) = decode_address(&account.address);
        assert_eq!(prefix, "tura");
        assert_eq!(data.len(), 20);
    }

    #[test]
    fn test_prefix_changes_address_not_key() {
        let phrase = RecoveryPhrase::parse(TEST_PHRASE).unwrap();
        let tura = derive_account(&phrase, &ChainConfig::default()).unwrap();
        let cosmos = derive_account(
            &phrase,
            &ChainConfig {
                address_prefix: "cosmos".into(),
                ..ChainConfig::default()
            },
        )
        .unwrap();

        assert_eq!(tura.public_key, cosmos.public_key);
        assert_ne!(tura.address, cosmos.address);
        assert_eq!(
            decode_address(&tura.address).1,
            decode_address(&cosmos.address).1
        );
    }

    #[test]
    fn test_signature_verifies() {
        let phrase = RecoveryPhrase::parse(TEST_PHRASE).unwrap();
        let account = derive_account(&phrase, &ChainConfig::default()).unwrap();

        let message = b"sign doc bytes";
        let raw = account.signer.sign(message);
        let signature = Signature::from_slice(&raw).unwrap();

        assert!(account
            .signer
            .verifying_key()
            .verify(message, &signature)
            .is_ok());
        assert!(signature.normalize_s().is_none());
    }

    #[test]
    fn test_signer_debug_is_redacted() {
        let phrase = RecoveryPhrase::parse(TEST_PHRASE).unwrap();
        let account = derive_account(&phrase, &ChainConfig::default()).unwrap();
        let debug = format!("{:?}", account);
        assert!(debug.contains("[REDACTED]"));
    }
}
