//! 检索：可插拔的相似度检索接口
//!
//! Retriever::search(task) 返回命中列表；MockRetriever 复现固定的两条命中（带人为延迟），
//! StaticRetriever 返回调用方给定的列表。后续可接 Qdrant 等真实向量库。

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{AgentError, VectorPoint};

/// 模拟检索时查询的集合
pub const MOCK_COLLECTIONS: &[&str] = &["memory", "learning", "kb"];

/// 检索 trait：按任务文本检索相关记录
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, task: &str) -> Result<Vec<VectorPoint>, AgentError>;

    /// 参与检索的集合名（仅用于日志）
    fn collections(&self) -> Vec<String> {
        Vec::new()
    }
}

/// 固定命中的模拟检索
#[derive(Debug, Clone)]
pub struct MockRetriever {
    delay: Duration,
}

impl MockRetriever {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn fixture() -> Vec<VectorPoint> {
        vec![
            VectorPoint::new(
                "1",
                "kb",
                0.92,
                "Kernel tuning for Fedora Xeon systems involves sysctl -w...",
            ),
            VectorPoint::new(
                "2",
                "memory",
                0.85,
                "Last optimization session: memory thresholds set to 90%",
            ),
        ]
    }
}

#[async_trait]
impl Retriever for MockRetriever {
    async fn search(&self, _task: &str) -> Result<Vec<VectorPoint>, AgentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Self::fixture())
    }

    fn collections(&self) -> Vec<String> {
        MOCK_COLLECTIONS.iter().map(|c| c.to_string()).collect()
    }
}

/// 返回预设列表的检索
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    hits: Vec<VectorPoint>,
}

impl StaticRetriever {
    pub fn new(hits: Vec<VectorPoint>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, _task: &str) -> Result<Vec<VectorPoint>, AgentError> {
        Ok(self.hits.clone())
    }

    fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hits.iter().map(|h| h.collection.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}
