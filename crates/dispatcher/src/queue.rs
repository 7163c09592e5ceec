use std::cmp::Ordering;

use chrono::Utc;
use tokio::sync::{Notify, RwLock};
use tracing::debug;
use uuid::Uuid;

use dispatch_domain::DispatchRequest;

use crate::history::DispatchHistory;

/// 待调度请求的优先级队列
///
/// 出队顺序：优先级降序，同优先级按入队先后（FIFO）。入队先后由单调递增的序号决定，
/// 不依赖系统时钟。每次入队都会重新计算优先级并刷新入队时间与序号，因此重新入队的请求
/// 会排到同优先级请求的末尾。
#[derive(Debug, Default)]
pub struct DispatchQueue {
    state: RwLock<QueueState>,
    /// 入队时唤醒等待中的处理器
    work_available: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<QueuedRequest>,
    next_sequence: u64,
}

#[derive(Debug)]
struct QueuedRequest {
    sequence: u64,
    request: DispatchRequest,
}

/// `Ordering::Less` 表示 `a` 应先出队
fn dispatch_order(a: &QueuedRequest, b: &QueuedRequest) -> Ordering {
    b.request
        .priority
        .total_cmp(&a.request.priority)
        .then_with(|| a.sequence.cmp(&b.sequence))
}

impl QueueState {
    fn head_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| dispatch_order(a, b))
            .map(|(index, _)| index)
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求入队，返回入队后的快照
    ///
    /// 不检查ID唯一性，调用方不应重复入队同一ID的请求。
    pub async fn enqueue(&self, mut request: DispatchRequest) -> DispatchRequest {
        request.priority = DispatchRequest::compute_priority(request.fullness_percentage);
        request.enqueued_at = Utc::now();
        let snapshot = request.clone();

        {
            let mut state = self.state.write().await;
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.entries.push(QueuedRequest { sequence, request });
            debug!(
                "调度请求 {} 入队 (优先级: {:.2}, 队列长度: {})",
                snapshot.id,
                snapshot.priority,
                state.entries.len()
            );
        }

        self.work_available.notify_one();
        snapshot
    }

    /// 取出当前优先级最高的请求
    ///
    /// 选择与移除在同一写锁内完成，同一请求不会被返回两次。
    pub async fn try_dequeue(&self) -> Option<DispatchRequest> {
        let mut state = self.state.write().await;
        let index = state.head_index()?;
        Some(state.entries.remove(index).request)
    }

    /// 取出优先级最高的请求，并在释放队列锁之前写入历史记录
    ///
    /// 先查队列再查历史的读者在任何时刻都能找到该请求。
    pub async fn try_dequeue_into(&self, history: &DispatchHistory) -> Option<DispatchRequest> {
        let mut state = self.state.write().await;
        let index = state.head_index()?;
        let request = state.entries.remove(index).request;
        history.record(&request).await;
        Some(request)
    }

    /// 按出队顺序返回全部待调度请求的快照
    pub async fn peek_all(&self) -> Vec<DispatchRequest> {
        let state = self.state.read().await;
        let mut ordered: Vec<&QueuedRequest> = state.entries.iter().collect();
        ordered.sort_by(|a, b| dispatch_order(a, b));
        ordered.into_iter().map(|entry| entry.request.clone()).collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<DispatchRequest> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .find(|entry| entry.request.id == id)
            .map(|entry| entry.request.clone())
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let cleared = state.entries.len();
        state.entries.clear();
        debug!("调度队列已清空，移除 {} 个请求", cleared);
    }

    /// 等待下一次入队通知
    ///
    /// 若等待开始前已有入队发生，会立即返回。
    pub async fn wait_for_work(&self) {
        self.work_available.notified().await;
    }
}
