// 账户解析：助记词 -> 地址 + 签名能力
// 纯计算，无 I/O

use crate::{
    domain::{
        chain_config::ChainConfig,
        derivation::{self, Account},
        mnemonic::RecoveryPhrase,
    },
    error::WalletResult,
};

#[derive(Debug, Clone)]
pub struct AccountResolver {
    chain: ChainConfig,
}

impl AccountResolver {
    pub fn new(chain: ChainConfig) -> Self {
        Self { chain }
    }

    pub fn derive_account(&self, phrase: &RecoveryPhrase) -> WalletResult<Account> {
        derivation::derive_account(phrase, &self.chain)
    }

    /// 先解析再派生；格式错误的输入返回 Derivation 错误
    pub fn derive_from_words(&self, words: &str) -> WalletResult<(RecoveryPhrase, Account)> {
        let phrase = RecoveryPhrase::parse(words)?;
        let account = self.derive_account(&phrase)?;
        Ok((phrase, account))
    }
}
