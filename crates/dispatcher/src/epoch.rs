use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 重置代数
///
/// 重置时持有写锁并递增代数；处理器在写入队列、车队或历史记录时持有读锁，
/// 并确认代数与出队时一致，从而丢弃重置之前出队的请求产生的写入。
#[derive(Debug, Default)]
pub struct ResetEpoch {
    current: RwLock<u64>,
}

impl ResetEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> u64 {
        *self.current.read().await
    }

    /// 代数仍为 `epoch` 时返回读锁，持有期间不会发生重置
    pub async fn guard(&self, epoch: u64) -> Option<RwLockReadGuard<'_, u64>> {
        let guard = self.current.read().await;
        (*guard == epoch).then_some(guard)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, u64> {
        self.current.read().await
    }

    /// 递增代数并返回写锁，清空各存储期间应一直持有
    pub async fn begin_reset(&self) -> RwLockWriteGuard<'_, u64> {
        let mut guard = self.current.write().await;
        *guard += 1;
        guard
    }
}
