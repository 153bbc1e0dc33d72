//! 可观测性：tracing 订阅器
//!
//! 默认级别 info，RUST_LOG 可覆盖；控制台输出之外，配置了 `[logging].file` 时同时追加写入该文件。

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSection;

pub fn init(cfg: &LoggingSection) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match &cfg.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    // 重复初始化（如测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_log_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("worker_mind.log");
        init(&LoggingSection { file: Some(path.clone()) }).unwrap();
        assert!(path.exists());
    }
}
