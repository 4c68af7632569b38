//! 会话上下文：独占 AgentState 与 LogBuffer
//!
//! 不使用全局状态：每个 Session 自带状态、日志、协作方与复位计时器。
//! 所有状态变更都通过这里的方法完成，并在变更后向 watch 通道发布一次快照。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::agent::{Dispatcher, Reflector, Retriever};
use crate::config::{AgentSection, TimingSection};
use crate::core::{
    AgentStatus, AgentState, LogBuffer, LogEntry, Reflection, ResetReceiver, ResetTimer, RunId,
    SessionSnapshot, VectorPoint,
};

/// 一次运行涉及的外部协作方
pub struct Collaborators {
    pub dispatcher: Dispatcher,
    pub reflector: Reflector,
    pub retriever: Arc<dyn Retriever>,
}

/// run_task 的结果，仅供诊断；调用方可以忽略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 空输入或已有任务在途，未做任何事
    Ignored,
    Succeeded(RunId),
    Failed(RunId),
}

/// 会话：一个用户界面对应一个 Session
pub struct Session {
    agent_config: AgentSection,
    timing: TimingSection,
    collaborators: Arc<Collaborators>,
    state: AgentState,
    logs: LogBuffer,
    next_run: u64,
    current_run: Option<RunId>,
    pending_reset: Option<ResetTimer>,
    reset_tx: mpsc::UnboundedSender<RunId>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// 创建会话，同时返回复位通知接收端
    pub fn new(
        agent_config: AgentSection,
        timing: TimingSection,
        log_capacity: usize,
        collaborators: Collaborators,
    ) -> (Self, ResetReceiver) {
        let (reset_tx, reset_rx) = mpsc::unbounded_channel();
        let state = AgentState::new(agent_config.max_iterations);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            agent: state.clone(),
            logs: Vec::new(),
        });
        let session = Self {
            agent_config,
            timing,
            collaborators: Arc::new(collaborators),
            state,
            logs: LogBuffer::new(log_capacity),
            next_run: 0,
            current_run: None,
            pending_reset: None,
            reset_tx,
            snapshot_tx,
        };
        (session, reset_rx)
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn agent_config(&self) -> &AgentSection {
        &self.agent_config
    }

    pub fn timing(&self) -> &TimingSection {
        &self.timing
    }

    pub(crate) fn collaborators(&self) -> Arc<Collaborators> {
        Arc::clone(&self.collaborators)
    }

    /// 最近一次（或正在进行的）运行
    pub fn current_run(&self) -> Option<RunId> {
        self.current_run
    }

    /// 当前等待复位的运行
    pub fn pending_reset(&self) -> Option<RunId> {
        self.pending_reset.as_ref().map(ResetTimer::run_id)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            agent: self.state.clone(),
            logs: self.logs.to_vec(),
        }
    }

    /// 提交任务；空白输入或非 IDLE 时为 no-op
    pub async fn run_task(&mut self, input: &str) -> RunOutcome {
        crate::agent::run_task(self, input).await
    }

    /// Submit 转移：取消残留计时器，重置状态并进入 THINKING
    pub(crate) fn begin_run(&mut self, task: &str, entry: LogEntry) -> RunId {
        if let Some(timer) = self.pending_reset.take() {
            timer.cancel();
        }
        self.next_run += 1;
        let run_id = RunId(self.next_run);
        self.current_run = Some(run_id);
        self.state.begin(task);
        self.logs.append(entry);
        self.publish();
        run_id
    }

    pub(crate) fn log(&mut self, entry: LogEntry) {
        self.logs.append(entry);
        self.publish();
    }

    pub(crate) fn set_status(&mut self, status: AgentStatus) {
        tracing::debug!(from = %self.state.status, to = %status, "status transition");
        self.state.status = status;
        self.publish();
    }

    /// 检索完成：写入命中并进入 REFLECTING
    pub(crate) fn complete_search(&mut self, hits: Vec<VectorPoint>) {
        self.state.qdrant_hits = hits;
        self.set_status(AgentStatus::Reflecting);
    }

    /// 追加一轮反思及其日志；超出 max_iterations 时丢弃
    pub(crate) fn record_reflection(&mut self, reflection: Reflection, entry: LogEntry) -> bool {
        if !self.state.push_reflection(reflection) {
            tracing::warn!(
                max = self.state.max_iterations,
                "iteration ceiling reached, reflection dropped"
            );
            return false;
        }
        self.logs.append(entry);
        self.publish();
        true
    }

    /// 结束本次运行（SUCCESS / ERROR），记录日志并武装复位计时器
    pub(crate) fn finish_run(&mut self, run_id: RunId, status: AgentStatus, entry: LogEntry) {
        self.state.status = status;
        self.logs.append(entry);
        self.pending_reset = Some(ResetTimer::arm(
            run_id,
            self.timing.reset_delay(),
            self.reset_tx.clone(),
        ));
        self.publish();
    }

    /// 处理到期的复位：只有仍在等待复位的那次运行才能把状态拉回 IDLE
    pub fn apply_reset(&mut self, run_id: RunId) -> bool {
        let is_current = self
            .pending_reset
            .as_ref()
            .is_some_and(|t| t.run_id() == run_id);
        if !is_current || !self.state.status.is_finished() {
            tracing::debug!(%run_id, "stale reset ignored");
            return false;
        }
        self.pending_reset = None;
        self.state.status = AgentStatus::Idle;
        tracing::debug!(%run_id, "session back to IDLE");
        self.publish();
        true
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
