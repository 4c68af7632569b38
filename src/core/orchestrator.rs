//! Session 编排器：主控循环
//!
//! 后台任务独占 Session，消费 UI 命令（Submit/Quit）与到期的复位通知；
//! 状态经 watch 通道投影给 UI。运行期间到达的 Submit 排队，取出时状态已非 IDLE，按规则忽略。

use std::path::PathBuf;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::{create_session_builder, ResetReceiver, Session, SessionSnapshot};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交用户输入，触发一次运行
    Submit(String),
    /// 退出应用
    Quit,
}

/// 在后台运行会话主循环；返回命令发送端、状态接收端与任务句柄
pub fn spawn_session(
    mut session: Session,
    mut resets: ResetReceiver,
) -> (
    mpsc::UnboundedSender<Command>,
    watch::Receiver<SessionSnapshot>,
    JoinHandle<()>,
) {
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let state_rx = session.subscribe();

    let handle = tokio::spawn(async move {
        loop {
            // 命令优先：排队的 Submit 先于同时就绪的复位被取出
            tokio::select! {
                biased;
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Submit(input)) => {
                            let outcome = session.run_task(&input).await;
                            tracing::debug!(?outcome, "run finished");
                        }
                        // cmd_tx 已关闭也退出循环
                        Some(Command::Quit) | None => break,
                    }
                }
                Some(run_id) = resets.recv() => {
                    session.apply_reset(run_id);
                }
            }
        }
    });

    (cmd_tx, state_rx, handle)
}

/// 创建 Agent 运行时：加载配置、构建会话并启动主循环
pub async fn create_agent(
    config_path: Option<PathBuf>,
) -> anyhow::Result<(mpsc::UnboundedSender<Command>, watch::Receiver<SessionSnapshot>)> {
    let (session, resets) = create_session_builder(config_path).build();
    let (cmd_tx, state_rx, _handle) = spawn_session(session, resets);
    Ok((cmd_tx, state_rx))
}
