//! 状态定义：AgentStatus、AgentState 及其组成记录
//!
//! AgentState 由 Session 独占持有；UI 只通过 SessionSnapshot 读取投影。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::LogEntry;

/// Agent 生命周期阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Searching,
    Reflecting,
    Success,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "IDLE",
            AgentStatus::Thinking => "THINKING",
            AgentStatus::Searching => "SEARCHING",
            AgentStatus::Reflecting => "REFLECTING",
            AgentStatus::Success => "SUCCESS",
            AgentStatus::Error => "ERROR",
        }
    }

    /// SUCCESS / ERROR：本轮结束，等待自动复位
    pub fn is_finished(&self) -> bool {
        matches!(self, AgentStatus::Success | AgentStatus::Error)
    }

    /// 仅 IDLE 时接受新任务
    pub fn accepts_input(&self) -> bool {
        matches!(self, AgentStatus::Idle)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 相似度检索命中的一条记录
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub collection: String,
    /// 0.0 - 1.0
    pub score: f32,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VectorPoint {
    pub fn new(
        id: impl Into<String>,
        collection: impl Into<String>,
        score: f32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            score: score.clamp(0.0, 1.0),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }
}

/// 一轮反思的结构化判断；追加后不再修改
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// 从 1 开始
    pub iteration: usize,
    pub was_productive: bool,
    pub key_insight: String,
    pub next_action: String,
    pub should_continue: bool,
    /// 0.0 - 1.0
    pub confidence: f32,
}

/// 单个会话内的 Agent 状态
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentState {
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub iterations: usize,
    pub max_iterations: usize,
    pub reflections: Vec<Reflection>,
    pub qdrant_hits: Vec<VectorPoint>,
}

impl AgentState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            status: AgentStatus::Idle,
            current_task: None,
            iterations: 0,
            max_iterations,
            reflections: Vec::new(),
            qdrant_hits: Vec::new(),
        }
    }

    /// 新任务开始：清空上一轮结果并进入 THINKING
    pub fn begin(&mut self, task: &str) {
        self.status = AgentStatus::Thinking;
        self.current_task = Some(task.to_string());
        self.iterations = 0;
        self.reflections.clear();
        self.qdrant_hits.clear();
    }

    /// 记录一轮反思；达到 max_iterations 后拒绝追加
    pub fn push_reflection(&mut self, reflection: Reflection) -> bool {
        if self.iterations >= self.max_iterations {
            return false;
        }
        self.iterations += 1;
        self.reflections.push(reflection);
        true
    }

    /// 进度（0.0 - 1.0），供状态卡片显示
    pub fn progress(&self) -> f64 {
        if self.max_iterations == 0 {
            return 0.0;
        }
        (self.iterations as f64 / self.max_iterations as f64).min(1.0)
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new(5)
    }
}

/// UI 看到的「投影」：状态 + 日志（最新在前）
#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionSnapshot {
    pub agent: AgentState,
    pub logs: Vec<LogEntry>,
}

impl SessionSnapshot {
    /// 输入框是否应禁用
    pub fn input_locked(&self) -> bool {
        !self.agent.status.accepts_input()
    }
}
