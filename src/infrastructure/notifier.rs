//! 用户提示（Mini-App 的 showAlert）

use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// 非阻塞提示，调用方不等待用户确认
    async fn show_alert(&self, message: &str);
}

/// 控制台实现：写到 stderr，同时记一条日志
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show_alert(&self, message: &str) {
        tracing::info!(alert = %message, "User alert");
        eprintln!("{}", message);
    }
}
