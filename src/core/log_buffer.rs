//! 日志缓冲：最新在前、容量有界、只追加
//!
//! 面向用户的运行记录，与 tracing 诊断日志分离；每条追加的记录同时镜像到 tracing。

use std::collections::VecDeque;

use serde::Serialize;

/// 日志级别（spark / maestro 为调度相关的展示级别）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Spark,
    Maestro,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Spark => "spark",
            LogLevel::Maestro => "maestro",
        }
    }
}

/// 单条记录，创建后不可变
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// 有界日志缓冲：append 前插，超出容量截掉最旧的
#[derive(Clone, Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        match entry.level {
            LogLevel::Error => tracing::error!(details = ?entry.details, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(details = ?entry.details, "{}", entry.message),
            _ => tracing::info!(kind = entry.level.as_str(), "{}", entry.message),
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 最新在前
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
