//! 自动复位计时器
//!
//! 每次运行结束（SUCCESS / ERROR）后武装一个计时器：延迟到期时把 RunId 投递给会话所有者，
//! 由 Session::apply_reset 判断是否仍是当前运行。计时器持有 CancellationToken，
//! 被替换或丢弃时自动取消，过期的计时器不会覆盖新运行的状态。

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// 运行编号，会话内单调递增
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// 复位通知的接收端（由会话所有者在主循环中消费）
pub type ResetReceiver = mpsc::UnboundedReceiver<RunId>;

/// 与某次运行绑定、可取消的延迟复位
#[derive(Debug)]
pub struct ResetTimer {
    run_id: RunId,
    cancel_token: CancellationToken,
}

impl ResetTimer {
    /// 启动计时器；delay 到期后向 notify 发送 run_id，除非先被取消
    pub fn arm(run_id: RunId, delay: Duration, notify: mpsc::UnboundedSender<RunId>) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(%run_id, "reset timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = notify.send(run_id);
                }
            }
        });
        Self {
            run_id,
            cancel_token,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for ResetTimer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
