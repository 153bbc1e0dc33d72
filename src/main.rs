//! worker-mind 进程入口
//!
//! 加载配置、初始化日志、组装 WorkerMind 并交给 runner 定时驱动。
//! 标准输入每行一条命令：`run` 立即执行一轮，`quit` / `exit` 退出，其余文本作为手动指令提交。

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc::UnboundedSender;
use worker_mind::config::{load_config, AppConfig};
use worker_mind::core::{spawn_runner, Command, ShutdownManager, ShutdownReason, WorkerMind};
use worker_mind::observability;

fn parse_line(line: &str) -> Option<Command> {
    match line.trim() {
        "" => None,
        "run" => Some(Command::RunNow),
        "quit" | "exit" => Some(Command::Quit),
        orders => Some(Command::SubmitOrders(orders.to_string())),
    }
}

/// 阻塞读取 stdin，放在独立线程，避免运行时退出时等待读操作
fn spawn_stdin_reader(commands: UnboundedSender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Some(cmd) = parse_line(&line) {
                if commands.send(cmd).is_err() {
                    return;
                }
            }
        }
        tracing::info!("Standard input closed; running until a shutdown signal");
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (config, config_error) = match load_config(config_path) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(&config.logging).context("Failed to initialize logging")?;
    if let Some(e) = config_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }
    std::fs::create_dir_all(&config.app.state_dir)
        .with_context(|| format!("Failed to create {}", config.app.state_dir.display()))?;

    let mind = WorkerMind::from_config(config);
    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let handle = spawn_runner(mind, shutdown.token());
    spawn_stdin_reader(handle.commands.clone());

    let mind = handle.join.await.context("Runner task failed")?;
    shutdown.shutdown(ShutdownReason::UserInitiated);
    let levels = mind.affect_levels();
    tracing::info!(
        joy = levels.joy_level,
        obedience = levels.obedience_level,
        plan = ?mind.current_plan(),
        "Worker mind stopped"
    );
    if let Some((prompt, completion, total)) = mind.token_usage() {
        tracing::info!(prompt, completion, total, "LLM token usage");
    }
    Ok(())
}
