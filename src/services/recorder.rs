//! 知识库后台写入器：有界、尽力而为
//!
//! 所有知识库写入以后台任务执行，Semaphore 限制在途数量；
//! 失败只记 warn 日志，绝不进入任务的关键路径错误通道。
//! 编排器在 finalize 时 drain()，保证结果落库后再返回。

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::mission::MissionResult;
use crate::services::traits::KnowledgeStore;

/// 默认最大在途写入数
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// 有界后台写入器；克隆 Arc 后可在各处理器间共享
pub struct MemoryRecorder {
    store: Arc<dyn KnowledgeStore>,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
}

impl MemoryRecorder {
    pub fn new(store: Arc<dyn KnowledgeStore>, max_in_flight: usize) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    async fn spawn<F, Fut>(&self, what: &'static str, write: F)
    where
        F: FnOnce(Arc<dyn KnowledgeStore>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), crate::core::MissionError>> + Send + 'static,
    {
        let store = self.store.clone();
        let permits = self.permits.clone();
        self.tasks.lock().await.spawn(async move {
            // Semaphore 永不关闭，acquire 只在关闭时失败
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if let Err(e) = write(store).await {
                tracing::warn!(target = what, error = %e, "knowledge-store write failed");
            }
        });
    }

    pub async fn episode(&self, content: String, kind: String, importance: f64) {
        self.spawn("episode", move |store| async move {
            store.store_episode(&content, &kind, importance).await
        })
        .await;
    }

    pub async fn document(&self, title: String, content: String, metadata: serde_json::Value) {
        self.spawn("document", move |store| async move {
            store.store_document(&title, &content, metadata).await
        })
        .await;
    }

    pub async fn pattern(
        &self,
        pattern: String,
        context: String,
        confidence: f64,
        tags: Vec<String>,
    ) {
        self.spawn("pattern", move |store| async move {
            store
                .store_pattern(&pattern, &context, confidence, &tags)
                .await
        })
        .await;
    }

    pub async fn mission_result(&self, mission_id: String, result: MissionResult) {
        self.spawn("mission-result", move |store| async move {
            store.store_mission_result(&mission_id, &result).await
        })
        .await;
    }

    /// 等待全部在途写入结束（写入失败已在任务内记日志）
    pub async fn drain(&self) {
        let mut tasks = self.tasks.lock().await;
        while tasks.join_next().await.is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::{FailingKnowledgeStore, InMemoryKnowledgeStore};

    #[tokio::test]
    async fn test_writes_are_recorded_after_drain() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let recorder = MemoryRecorder::new(store.clone(), 4);
        recorder
            .episode("saw two people".into(), "sighting".into(), 1.0)
            .await;
        recorder
            .pattern("scan succeeded".into(), "patrol".into(), 0.8, vec!["patrol".into()])
            .await;
        recorder.drain().await;

        assert_eq!(store.episodes().len(), 1);
        assert_eq!(store.episodes()[0].2, 1.0);
        assert_eq!(store.patterns().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let recorder = MemoryRecorder::new(Arc::new(FailingKnowledgeStore), 2);
        recorder
            .episode("will fail".into(), "test".into(), 0.5)
            .await;
        // drain 正常返回，失败只记日志
        recorder.drain().await;
    }
}
