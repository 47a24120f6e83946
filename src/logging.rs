//! 日志初始化
//!
//! 终端日志写到 stderr，stdout 只留给命令结果（例如导出的令牌）。
//! `ENABLE_FILE_LOGS=true` 时另外按天滚动写入 `LOG_DIR/nexus.log.YYYY-MM-DD`。

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "nexus.log";

/// 持有后台写线程，drop 时刷新剩余日志
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// 安装全局 subscriber，只能在进程启动时调用一次
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match file_appender(config) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();

    guard
}

/// 文件日志未开启或目录无法创建时返回 None
fn file_appender(config: &Config) -> Option<RollingFileAppender> {
    if !config.file_logs {
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!(
            "failed to create log directory {}: {err}",
            config.log_dir.display()
        );
        return None;
    }
    Some(RollingFileAppender::new(
        Rotation::DAILY,
        &config.log_dir,
        LOG_FILE_PREFIX,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_appender_disabled_by_default() {
        assert!(file_appender(&Config::default()).is_none());
    }

    #[test]
    fn test_file_appender_creates_log_dir() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            file_logs: true,
            log_dir: dir.path().join("logs").join("nested"),
            ..Config::default()
        };

        assert!(file_appender(&config).is_some());
        assert!(config.log_dir.is_dir());
    }
}
