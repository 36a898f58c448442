//! Telegram 用户评分
//!
//! 按账户年龄与 Premium 状态计算的本地评分（与后端信用评分无关）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_YEAR: f64 = 60.0 * 60.0 * 24.0 * 365.0;

/// Mini-App initData 中的用户信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserScore {
    pub account_age_years: f64,
    pub score: u32,
}

impl TelegramUser {
    /// 账户年龄估算：把 id 当作 Unix 秒级时间戳
    pub fn account_age_years(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now.timestamp() - self.id;
        (elapsed as f64 / SECONDS_PER_YEAR).max(0.0)
    }

    pub fn score(&self, now: DateTime<Utc>) -> UserScore {
        let age = self.account_age_years(now);

        let mut score = match age {
            a if a >= 5.0 => 50,
            a if a >= 3.0 => 30,
            a if a >= 1.0 => 10,
            _ => 0,
        };
        if self.is_premium {
            score += 100;
        }

        UserScore {
            account_age_years: age,
            score,
        }
    }

    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}
