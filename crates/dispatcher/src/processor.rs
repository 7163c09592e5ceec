use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use dispatch_config::DispatcherConfig;
use dispatch_domain::{DispatchRequest, DispatchStatus, Truck, TruckStatus};
use dispatch_errors::DispatchResult;

use crate::epoch::ResetEpoch;
use crate::events::DispatchEventSink;
use crate::fleet::FleetService;
use crate::history::DispatchHistory;
use crate::queue::DispatchQueue;

/// 处理器运行参数
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// 队列为空时的最长等待时间，入队通知会提前唤醒
    pub idle_interval: Duration,
    /// 首次分配失败后的退避间隔
    pub requeue_backoff: Duration,
    /// 退避间隔上限
    pub max_requeue_backoff: Duration,
    /// 指数退避倍数，1.0 表示固定间隔
    pub backoff_multiplier: f64,
    /// 退避间隔的随机抖动范围（0.0-1.0）
    pub jitter_factor: f64,
    pub in_progress_delay: Duration,
    pub completion_delay: Duration,
    /// 未设置时请求会一直等待可用车辆
    pub max_assignment_attempts: Option<u32>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(100),
            requeue_backoff: Duration::from_millis(50),
            max_requeue_backoff: Duration::from_millis(1000),
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            in_progress_delay: Duration::from_millis(500),
            completion_delay: Duration::from_millis(500),
            max_assignment_attempts: None,
        }
    }
}

impl From<&DispatcherConfig> for ProcessorConfig {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            idle_interval: config.idle_interval(),
            requeue_backoff: config.requeue_backoff(),
            max_requeue_backoff: config.max_requeue_backoff(),
            backoff_multiplier: config.backoff_multiplier,
            jitter_factor: config.backoff_jitter_factor,
            in_progress_delay: config.in_progress_delay(),
            completion_delay: config.completion_delay(),
            max_assignment_attempts: config.max_assignment_attempts,
        }
    }
}

impl ProcessorConfig {
    /// 计算第 `attempts` 次分配失败后的退避间隔
    ///
    /// 非法的倍数或抖动系数（NaN、负数等）按固定间隔、无抖动处理。
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        let base = self.requeue_backoff.as_secs_f64();
        let max = self.max_requeue_backoff.as_secs_f64().max(base);
        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let exponent = attempts.saturating_sub(1).min(64) as i32;

        let capped = (base * multiplier.powi(exponent)).min(max);
        if !(self.jitter_factor.is_finite() && self.jitter_factor > 0.0) {
            return Duration::from_secs_f64(capped);
        }

        // 添加随机抖动以避免多个请求同时重试
        let jitter_factor = self.jitter_factor.min(1.0);
        let jitter = capped * jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((capped + jitter).clamp(0.0, max))
    }
}

/// 单次处理的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// 队列为空
    Idle,
    Completed { request_id: Uuid, truck_id: Uuid },
    /// 没有合适车辆，已重新入队
    Requeued { request_id: Uuid, attempts: u32 },
    /// 超过最大分配尝试次数
    Failed { request_id: Uuid },
    /// 处理期间发生了重置，请求被丢弃
    Discarded { request_id: Uuid },
}

#[derive(Debug, Default)]
pub struct ProcessorStats {
    processed: AtomicU64,
    completed: AtomicU64,
    requeued: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessorStatsSnapshot {
    pub processed: u64,
    pub completed: u64,
    pub requeued: u64,
    pub failed: u64,
    pub discarded: u64,
    pub errors: u64,
}

impl ProcessorStats {
    pub fn snapshot(&self) -> ProcessorStatsSnapshot {
        ProcessorStatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

enum Pause {
    None,
    UntilWork(Duration),
    Backoff(Duration),
}

/// 调度处理器
///
/// 单个后台循环：从队列取出优先级最高的请求，分配车辆，
/// 推进 `Assigned -> InProgress -> Completed` 并释放车辆；
/// 无可用车辆时把请求重新入队并退避。
///
/// 对队列、车队与历史记录的每次写入都在 [`ResetEpoch`] 的读锁内进行，
/// 请求出队之后发生的重置会使该请求的后续写入全部被丢弃。
pub struct DispatchProcessor {
    queue: Arc<DispatchQueue>,
    fleet: Arc<FleetService>,
    history: Arc<DispatchHistory>,
    epoch: Arc<ResetEpoch>,
    event_sink: Arc<dyn DispatchEventSink>,
    config: ProcessorConfig,
    stats: ProcessorStats,
}

impl DispatchProcessor {
    pub fn new(
        queue: Arc<DispatchQueue>,
        fleet: Arc<FleetService>,
        history: Arc<DispatchHistory>,
        epoch: Arc<ResetEpoch>,
        event_sink: Arc<dyn DispatchEventSink>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            queue,
            fleet,
            history,
            epoch,
            event_sink,
            config,
            stats: ProcessorStats::default(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn stats(&self) -> ProcessorStatsSnapshot {
        self.stats.snapshot()
    }

    /// 在独立的 tokio 任务中运行处理循环
    pub fn spawn(self: Arc<Self>, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown_rx).await })
    }

    /// 运行处理循环直到收到关闭信号
    ///
    /// 单个请求的处理错误只记录日志，循环不会因此退出。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "调度处理器启动 (空闲间隔: {:?}, 退避间隔: {:?}, 最大尝试次数: {:?})",
            self.config.idle_interval,
            self.config.requeue_backoff,
            self.config.max_assignment_attempts
        );

        loop {
            if Self::shutdown_requested(&mut shutdown_rx) {
                info!("调度处理器收到关闭信号");
                break;
            }

            let pause = match self.process_next().await {
                Ok(ProcessOutcome::Idle) => Pause::UntilWork(self.config.idle_interval),
                Ok(ProcessOutcome::Requeued { attempts, .. }) => {
                    Pause::Backoff(self.config.backoff_for(attempts))
                }
                Ok(_) => Pause::None,
                Err(e) => {
                    error!("处理调度请求时发生错误: {}", e);
                    self.stats.errors.fetch_add(1, Ordering::Relaxed);
                    counter!("dispatch_processor_errors_total").increment(1);
                    Pause::Backoff(self.config.requeue_backoff)
                }
            };

            let interrupted = match pause {
                Pause::None => false,
                Pause::UntilWork(duration) => tokio::select! {
                    _ = sleep(duration) => false,
                    _ = self.queue.wait_for_work() => false,
                    _ = shutdown_rx.recv() => true,
                },
                Pause::Backoff(duration) => tokio::select! {
                    _ = sleep(duration) => false,
                    _ = shutdown_rx.recv() => true,
                },
            };

            if interrupted {
                info!("调度处理器在等待期间收到关闭信号");
                break;
            }
        }

        info!("调度处理器已停止");
    }

    fn shutdown_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
        !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// 处理队列中的下一个请求
    pub async fn process_next(&self) -> DispatchResult<ProcessOutcome> {
        let (request, epoch) = {
            let current = self.epoch.read().await;
            let Some(request) = self.queue.try_dequeue_into(&self.history).await else {
                return Ok(ProcessOutcome::Idle);
            };
            (request, *current)
        };
        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        gauge!("dispatch_queue_pending").set(self.queue.len().await as f64);

        let span = info_span!(
            "dispatch_request",
            request.id = %request.id,
            recycler.id = %request.recycler_id,
            priority = request.priority
        );
        self.process_request(request, epoch).instrument(span).await
    }

    async fn process_request(
        &self,
        mut request: DispatchRequest,
        epoch: u64,
    ) -> DispatchResult<ProcessOutcome> {
        let truck = {
            let Some(_current) = self.epoch.guard(epoch).await else {
                return Ok(self.discard(&request));
            };
            let truck = self.fleet.try_assign_truck(&mut request).await;
            if truck.is_some() {
                self.history.record(&request).await;
            }
            truck
        };

        match truck {
            Some(truck) => self.complete_dispatch(request, truck, epoch).await,
            None => self.handle_unassigned(request, epoch).await,
        }
    }

    async fn complete_dispatch(
        &self,
        mut request: DispatchRequest,
        truck: Truck,
        epoch: u64,
    ) -> DispatchResult<ProcessOutcome> {
        {
            let Some(_current) = self.epoch.guard(epoch).await else {
                return Ok(self.discard(&request));
            };
            request.update_status(DispatchStatus::InProgress);
            self.fleet.set_status(truck.id, TruckStatus::InProgress).await;
            // 容量或数量为负时装载量记为0
            let load = request.expected_bottles.min(truck.capacity).max(0);
            self.fleet.load_truck(truck.id, load).await;
            self.history.record(&request).await;
        }
        debug!("调度请求 {} 运输中", request.id);
        sleep(self.config.in_progress_delay).await;

        {
            let Some(_current) = self.epoch.guard(epoch).await else {
                return Ok(self.discard(&request));
            };
            request.update_status(DispatchStatus::Completed);
            self.history.record(&request).await;
        }
        sleep(self.config.completion_delay).await;

        let released = {
            let Some(_current) = self.epoch.guard(epoch).await else {
                return Ok(self.discard(&request));
            };
            match self.fleet.release_truck(truck.id).await {
                Some(released) => released,
                None => {
                    warn!("车辆 {} 已不在车队中，跳过释放", truck.id);
                    truck
                }
            }
        };

        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        counter!("dispatch_requests_completed_total").increment(1);
        info!(
            "调度请求 {} 已完成，车辆 {} 恢复空闲",
            request.id, released.id
        );

        self.event_sink.on_completed(&request, &released).await?;

        Ok(ProcessOutcome::Completed {
            request_id: request.id,
            truck_id: released.id,
        })
    }

    async fn handle_unassigned(
        &self,
        mut request: DispatchRequest,
        epoch: u64,
    ) -> DispatchResult<ProcessOutcome> {
        request.attempts += 1;
        let exhausted = self
            .config
            .max_assignment_attempts
            .is_some_and(|max_attempts| request.attempts >= max_attempts);

        {
            let Some(_current) = self.epoch.guard(epoch).await else {
                return Ok(self.discard(&request));
            };
            if exhausted {
                request.update_status(DispatchStatus::Failed);
                self.history.record(&request).await;
            } else {
                // 先更新历史再入队，查询在任何时刻都能找到该请求
                request.update_status(DispatchStatus::Pending);
                self.history.record(&request).await;
                self.queue.enqueue(request.clone()).await;
            }
        }

        if exhausted {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            counter!("dispatch_requests_failed_total").increment(1);
            warn!(
                "调度请求 {} 已达到最大分配尝试次数 {}，标记为失败",
                request.id, request.attempts
            );

            self.event_sink.on_failed(&request).await?;
            return Ok(ProcessOutcome::Failed {
                request_id: request.id,
            });
        }

        debug!(
            "没有合适的车辆，调度请求 {} 重新入队 (第 {} 次尝试)",
            request.id, request.attempts
        );
        self.stats.requeued.fetch_add(1, Ordering::Relaxed);
        counter!("dispatch_requests_requeued_total").increment(1);

        Ok(ProcessOutcome::Requeued {
            request_id: request.id,
            attempts: request.attempts,
        })
    }

    fn discard(&self, request: &DispatchRequest) -> ProcessOutcome {
        self.stats.discarded.fetch_add(1, Ordering::Relaxed);
        info!("调度服务已重置，丢弃处理中的请求 {}", request.id);
        ProcessOutcome::Discarded {
            request_id: request.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_defaults_to_fixed_interval() {
        let config = ProcessorConfig::default();
        assert_eq!(config.backoff_for(1), Duration::from_millis(50));
        assert_eq!(config.backoff_for(10), Duration::from_millis(50));
        assert_eq!(config.backoff_for(u32::MAX), Duration::from_millis(50));
    }

    #[test]
    fn test_backoff_exponential_with_cap() {
        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            max_requeue_backoff: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            ..ProcessorConfig::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        assert_eq!(config.backoff_for(4), Duration::from_millis(500));
        assert_eq!(config.backoff_for(1000), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_jitter_stays_in_range() {
        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            max_requeue_backoff: Duration::from_millis(1000),
            jitter_factor: 0.5,
            ..ProcessorConfig::default()
        };
        for _ in 0..100 {
            let backoff = config.backoff_for(1);
            assert!(backoff >= Duration::from_millis(49));
            assert!(backoff <= Duration::from_millis(151));
        }
    }

    #[test]
    fn test_backoff_ignores_invalid_factors() {
        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            backoff_multiplier: f64::NAN,
            jitter_factor: f64::NAN,
            ..ProcessorConfig::default()
        };
        assert_eq!(config.backoff_for(3), Duration::from_millis(100));

        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            backoff_multiplier: -2.0,
            jitter_factor: -1.0,
            ..ProcessorConfig::default()
        };
        assert_eq!(config.backoff_for(2), Duration::from_millis(100));

        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            max_requeue_backoff: Duration::from_millis(1000),
            jitter_factor: f64::INFINITY,
            ..ProcessorConfig::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));

        let config = ProcessorConfig {
            requeue_backoff: Duration::from_millis(100),
            max_requeue_backoff: Duration::from_millis(1000),
            jitter_factor: 5.0,
            ..ProcessorConfig::default()
        };
        for _ in 0..50 {
            assert!(config.backoff_for(1) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_processor_config_from_dispatcher_config() {
        let dispatcher_config = DispatcherConfig {
            idle_interval_ms: 10,
            requeue_backoff_ms: 20,
            max_assignment_attempts: Some(5),
            ..DispatcherConfig::default()
        };
        let config = ProcessorConfig::from(&dispatcher_config);
        assert_eq!(config.idle_interval, Duration::from_millis(10));
        assert_eq!(config.requeue_backoff, Duration::from_millis(20));
        assert_eq!(config.max_assignment_attempts, Some(5));
    }
}
