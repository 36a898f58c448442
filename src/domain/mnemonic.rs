//! 恢复短语（BIP39 助记词）
//!
//! 唯一的持久化秘密。内存中以 Zeroizing 保存，Debug/Display 永不输出明文。

use std::fmt;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::WalletError;

/// 助记词长度（固定 12 个单词）
pub const PHRASE_WORD_COUNT: usize = 12;
/// 12 个单词对应 128 位熵
const ENTROPY_BYTES: usize = 16;

#[derive(Clone)]
pub struct RecoveryPhrase {
    words: Zeroizing<String>,
}

impl RecoveryPhrase {
    /// 生成新的 12 词助记词
    pub fn generate() -> Result<Self, WalletError> {
        let mut entropy = [0u8; ENTROPY_BYTES];
        rand::thread_rng().fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|e| WalletError::Derivation(e.to_string()));
        entropy.zeroize();

        Ok(Self {
            words: Zeroizing::new(mnemonic?.to_string()),
        })
    }

    /// 解析并校验用户输入（去除首尾空白、合并多余空格、转小写）
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let normalized = Zeroizing::new(
            input
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join(" "),
        );

        let word_count = normalized.split(' ').filter(|w| !w.is_empty()).count();
        if word_count != PHRASE_WORD_COUNT {
            return Err(WalletError::Derivation(format!(
                "expected {} words, got {}",
                PHRASE_WORD_COUNT, word_count
            )));
        }

        // BIP39 校验（单词表 + 校验和）
        Mnemonic::parse_in(Language::English, normalized.as_str())
            .map_err(|e| WalletError::Derivation(e.to_string()))?;

        Ok(Self { words: normalized })
    }

    /// 明文助记词，仅用于派生、持久化与一次性备份展示
    pub fn expose(&self) -> &str {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.split(' ').count()
    }

    /// BIP39 种子（空密码）
    pub(crate) fn to_seed(&self) -> Result<Zeroizing<[u8; 64]>, WalletError> {
        let mnemonic = Mnemonic::parse_in(Language::English, self.words.as_str())
            .map_err(|e| WalletError::Derivation(e.to_string()))?;
        Ok(Zeroizing::new(mnemonic.to_seed("")))
    }
}

impl PartialEq for RecoveryPhrase {
    fn eq(&self, other: &Self) -> bool {
        self.words.as_str() == other.words.as_str()
    }
}

impl Eq for RecoveryPhrase {}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryPhrase([REDACTED; {} words])", self.word_count())
    }
}

impl fmt::Display for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
