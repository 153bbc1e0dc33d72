//! 循环调度：定时器 + 命令通道
//!
//! runner 独占 WorkerMind。定时器每 `cycle_interval_secs` 触发一轮循环；`SubmitOrders` 只更新
//! 待处理指令，在下一轮 Intake 生效；`RunNow` 立即跑一轮；`Quit`、通道关闭或关闭信号结束循环。

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::orchestrator::WorkerMind;

/// 发往 runner 的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 提交手动指令（覆盖未消费的旧指令）
    SubmitOrders(String),
    /// 立即执行一轮
    RunNow,
    /// 退出
    Quit,
}

/// 运行中的 runner：命令发送端、已完成轮数、结束后交还的 WorkerMind
pub struct RunnerHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub cycles: watch::Receiver<u64>,
    pub join: JoinHandle<WorkerMind>,
}

/// 在后台任务中驱动 WorkerMind；首个 tick 立即触发
pub fn spawn_runner(mind: WorkerMind, shutdown: CancellationToken) -> RunnerHandle {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (cycles_tx, cycles_rx) = watch::channel(0u64);
    let join = tokio::spawn(run(mind, cmd_rx, cycles_tx, shutdown));
    RunnerHandle {
        commands: cmd_tx,
        cycles: cycles_rx,
        join,
    }
}

async fn run(
    mut mind: WorkerMind,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    cycles_tx: watch::Sender<u64>,
    shutdown: CancellationToken,
) -> WorkerMind {
    let period = Duration::from_secs(mind.config().app.cycle_interval_secs.max(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = period.as_secs(), "Runner started");

    let mut completed = 0u64;
    loop {
        let run_now = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::SubmitOrders(orders)) => {
                    mind.receive_manual_orders(&orders);
                    false
                }
                Some(Command::RunNow) => true,
                Some(Command::Quit) | None => break,
            },
            _ = ticker.tick() => true,
        };

        if run_now {
            mind.run_cycle().await;
            completed += 1;
            let _ = cycles_tx.send(completed);
        }
    }

    tracing::info!(cycles = completed, "Runner stopped");
    mind
}
