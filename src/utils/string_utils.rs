//! 字符串工具模块
//! 提供字符串处理相关的工具函数

/// 检查字符串是否为空或只包含空白字符
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// 地址缩略显示：前 6 位 + ... + 后 6 位（不超过 12 个字符时原样返回）
pub fn mask_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }

    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
