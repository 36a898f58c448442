//! 日志脱敏
//!
//! 地址只显示首尾，自由文本中的助记词片段整体替换

use bip39::Language;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::mnemonic::PHRASE_WORD_COUNT;

const REDACTED: &str = "[REDACTED]";

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

/// 脱敏十六进制字符串（显示前缀和后缀）
pub fn redact_hex_string(hex: &str, show_chars: usize) -> String {
    if hex.len() <= show_chars * 2 || !hex.is_ascii() {
        return "*".repeat(hex.chars().count());
    }

    let prefix = &hex[..show_chars];
    let suffix = &hex[hex.len() - show_chars..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    if address.len() < 10 || !address.is_ascii() {
        return "*".repeat(address.chars().count());
    }

    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{}...{}", prefix, suffix)
}

fn is_bip39_word(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    Language::English
        .word_list()
        .binary_search(&lower.as_str())
        .is_ok()
}

type Run = Option<(usize, usize, usize)>;

fn close(run: Run, spans: &mut Vec<(usize, usize)>) {
    if let Some((start, end, count)) = run {
        if count >= PHRASE_WORD_COUNT {
            spans.push((start, end));
        }
    }
}

/// 把连续 12 个及以上、仅以空白分隔的 BIP-39 单词替换为 [REDACTED]
pub fn redact_phrases(text: &str) -> String {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    // 当前连续段：(起点, 终点, 单词数)
    let mut run: Run = None;

    for m in WORD_RE.find_iter(text) {
        if !is_bip39_word(m.as_str()) {
            close(run.take(), &mut spans);
            continue;
        }

        run = match run {
            Some((start, end, count))
                if text[end..m.start()].chars().all(char::is_whitespace) =>
            {
                Some((start, m.end(), count + 1))
            }
            previous => {
                close(previous, &mut spans);
                Some((m.start(), m.end(), 1))
            }
        };
    }
    close(run, &mut spans);

    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end) in spans {
        out.push_str(&text[last..start]);
        out.push_str(REDACTED);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}
