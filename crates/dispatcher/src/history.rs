use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use dispatch_domain::{DispatchRequest, DispatchStatus};

/// 默认保留的已结束请求数量
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// 已出队请求的最新状态记录
///
/// 调度请求出队时即写入这里，之后处理器在每次状态变更时更新快照，
/// 重新入队等待的请求也保留其 `PENDING` 快照，因此请求在任何时刻都能被查到。
/// 已结束的请求超过上限时淘汰最早结束的。
#[derive(Debug)]
pub struct DispatchHistory {
    records: RwLock<HashMap<Uuid, DispatchRequest>>,
    limit: usize,
}

impl DispatchHistory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    pub async fn record(&self, request: &DispatchRequest) {
        let mut records = self.records.write().await;
        records.insert(request.id, request.clone());

        if request.is_finished() {
            Self::evict_finished(&mut records, self.limit);
        }
    }

    fn evict_finished(records: &mut HashMap<Uuid, DispatchRequest>, limit: usize) {
        let mut finished: Vec<(Uuid, _)> = records
            .values()
            .filter(|request| request.is_finished())
            .map(|request| (request.id, request.completed_at))
            .collect();
        if finished.len() <= limit {
            return;
        }

        finished.sort_by_key(|(_, completed_at)| *completed_at);
        let excess = finished.len() - limit;
        for (id, _) in finished.into_iter().take(excess) {
            records.remove(&id);
        }
        debug!("历史记录淘汰 {} 个已结束请求", excess);
    }

    pub async fn get(&self, id: Uuid) -> Option<DispatchRequest> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn by_status(&self, status: DispatchStatus) -> Vec<DispatchRequest> {
        let mut matched: Vec<DispatchRequest> = self
            .records
            .read()
            .await
            .values()
            .filter(|request| request.status == status)
            .cloned()
            .collect();
        matched.sort_by_key(|request| request.enqueued_at);
        matched
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn reset(&self) {
        self.records.write().await.clear();
    }
}

impl Default for DispatchHistory {
    fn default() -> Self {
        Self::new()
    }
}
