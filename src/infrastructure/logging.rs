//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和日志轮转

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "turawallet.log";

/// 初始化日志系统
///
/// 启用文件日志时返回写线程的 guard，调用方需持有到进程退出，否则尾部日志会丢失。
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    // RUST_LOG 优先
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        init_json_logging(filter, config)
    } else {
        init_text_logging(filter, config)
    }
}

fn log_dir(config: &LoggingConfig) -> &Path {
    config
        .log_file_path
        .as_ref()
        .and_then(|p| Path::new(p).parent())
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("./logs"))
}

/// 初始化JSON格式日志（结构化日志）
fn init_json_logging(
    filter: EnvFilter,
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    if config.enable_file_logging {
        let dir = log_dir(config);
        std::fs::create_dir_all(dir)?;

        let (writer, guard) = non_blocking(rolling::daily(dir, LOG_FILE_NAME));

        let file_layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_timer(ChronoUtc::rfc_3339());

        // 控制台输出到 stderr，stdout 留给命令结果
        let console_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::rfc_3339());

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init()?;

        Ok(Some(guard))
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init()?;

        Ok(None)
    }
}

/// 初始化文本格式日志
fn init_text_logging(
    filter: EnvFilter,
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    if config.enable_file_logging {
        let dir = log_dir(config);
        std::fs::create_dir_all(dir)?;

        let (writer, guard) = non_blocking(rolling::daily(dir, LOG_FILE_NAME));

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false);

        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true);

        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init()?;

        Ok(Some(guard))
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true),
            )
            .try_init()?;

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_from_file_path() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            enable_file_logging: true,
            log_file_path: Some("/var/log/turawallet/app.log".to_string()),
        };
        assert_eq!(log_dir(&config), Path::new("/var/log/turawallet"));

        let bare = LoggingConfig {
            log_file_path: Some("app.log".to_string()),
            ..config
        };
        assert_eq!(log_dir(&bare), Path::new("./logs"));
    }
}
