use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use dispatch_config::DispatcherConfig;
use dispatch_domain::{
    DispatchRequest, DispatchSummary, SeedTruck, SubmitDispatch, Truck, TruckStatus,
};
use dispatch_errors::{DispatchError, DispatchResult};

use crate::epoch::ResetEpoch;
use crate::events::DispatchEventSink;
use crate::fleet::FleetService;
use crate::history::DispatchHistory;
use crate::processor::{DispatchProcessor, ProcessorConfig};
use crate::queue::DispatchQueue;
use crate::strategies::CapacityFitStrategy;

/// 调度服务入口
///
/// 持有队列、车队与历史记录，对外提供提交请求、登记车辆、查询与重置操作，
/// 并负责构造共享同一组存储的 [`DispatchProcessor`]。
#[derive(Clone)]
pub struct DispatchService {
    queue: Arc<DispatchQueue>,
    fleet: Arc<FleetService>,
    history: Arc<DispatchHistory>,
    epoch: Arc<ResetEpoch>,
}

impl DispatchService {
    pub fn new() -> Self {
        Self::with_components(
            Arc::new(DispatchQueue::new()),
            Arc::new(FleetService::new()),
            Arc::new(DispatchHistory::new()),
        )
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        let strategy = CapacityFitStrategy::with_tolerance(config.underfill_tolerance);
        Self::with_components(
            Arc::new(DispatchQueue::new()),
            Arc::new(FleetService::with_strategy(Arc::new(strategy))),
            Arc::new(DispatchHistory::with_limit(config.history_limit)),
        )
    }

    pub fn with_components(
        queue: Arc<DispatchQueue>,
        fleet: Arc<FleetService>,
        history: Arc<DispatchHistory>,
    ) -> Self {
        Self {
            queue,
            fleet,
            history,
            epoch: Arc::new(ResetEpoch::new()),
        }
    }

    pub fn queue(&self) -> &Arc<DispatchQueue> {
        &self.queue
    }

    pub fn fleet_service(&self) -> &Arc<FleetService> {
        &self.fleet
    }

    pub fn history(&self) -> &Arc<DispatchHistory> {
        &self.history
    }

    pub fn epoch(&self) -> &Arc<ResetEpoch> {
        &self.epoch
    }

    /// 清空车队、队列与历史记录
    ///
    /// 重置前已出队、仍在处理中的请求不会再写回任何存储。
    pub async fn reset(&self) {
        let _reset = self.epoch.begin_reset().await;
        self.fleet.reset().await;
        self.queue.reset().await;
        self.history.reset().await;
        info!("调度服务已重置");
    }

    /// 登记一辆默认车辆（容量50，可靠度0.95），不影响队列
    pub async fn initialize_fleet(&self) -> Truck {
        let truck = SeedTruck::default().into_truck();
        self.fleet.add_truck(truck.clone()).await;
        info!("车队初始化完成，默认车辆 {}", truck.id);
        truck
    }

    /// 校验并提交调度请求
    pub async fn submit(&self, submit: SubmitDispatch) -> DispatchResult<DispatchRequest> {
        submit.validate()?;
        let request = self.queue.enqueue(submit.into_request()).await;
        info!(
            "回收站 {} 提交调度请求 {} (优先级: {:.2}, 预计数量: {})",
            request.recycler_id, request.id, request.priority, request.expected_bottles
        );
        Ok(request)
    }

    /// 直接入队已构造的请求
    pub async fn enqueue(&self, request: DispatchRequest) -> DispatchRequest {
        self.queue.enqueue(request).await
    }

    pub async fn seed_truck(&self, seed: SeedTruck) -> DispatchResult<Truck> {
        seed.validate()?;
        let truck = seed.into_truck();
        self.fleet.add_truck(truck.clone()).await;
        Ok(truck)
    }

    /// 批量登记车辆，遇到第一个非法配置即返回错误
    pub async fn seed_fleet(&self, seeds: &[SeedTruck]) -> DispatchResult<Vec<Truck>> {
        for seed in seeds {
            seed.validate()?;
        }

        let mut trucks = Vec::with_capacity(seeds.len());
        for seed in seeds {
            trucks.push(self.seed_truck(seed.clone()).await?);
        }
        debug!("登记 {} 辆车", trucks.len());
        Ok(trucks)
    }

    /// 按调度顺序返回等待中的请求
    pub async fn pending(&self) -> Vec<DispatchRequest> {
        self.queue.peek_all().await
    }

    /// 先查队列，再查已出队请求的历史记录
    pub async fn find_request(&self, id: Uuid) -> Option<DispatchRequest> {
        match self.queue.get(id).await {
            Some(request) => Some(request),
            None => self.history.get(id).await,
        }
    }

    /// 非法ID视为不存在
    pub async fn find_request_by_str(&self, id: &str) -> Option<DispatchRequest> {
        let id = Uuid::parse_str(id).ok()?;
        self.find_request(id).await
    }

    pub async fn fleet(&self) -> Vec<Truck> {
        self.fleet.get_all().await
    }

    pub async fn available_trucks(&self) -> Vec<Truck> {
        self.fleet.get_available_trucks().await
    }

    /// 手动调整车辆状态，例如标记车辆不可用
    pub async fn set_truck_status(&self, id: Uuid, status: TruckStatus) -> DispatchResult<Truck> {
        if !self.fleet.set_status(id, status).await {
            return Err(DispatchError::truck_not_found(id));
        }
        self.fleet
            .get(id)
            .await
            .ok_or_else(|| DispatchError::truck_not_found(id))
    }

    pub async fn summary(&self) -> DispatchSummary {
        let pending = self.queue.peek_all().await;
        let trucks = self.fleet.get_all().await;
        DispatchSummary::from_snapshot(&pending, &trucks)
    }

    /// 构造与本服务共享存储的处理器
    pub fn processor(
        &self,
        config: ProcessorConfig,
        event_sink: Arc<dyn DispatchEventSink>,
    ) -> DispatchProcessor {
        DispatchProcessor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.fleet),
            Arc::clone(&self.history),
            Arc::clone(&self.epoch),
            event_sink,
            config,
        )
    }
}

impl Default for DispatchService {
    fn default() -> Self {
        Self::new()
    }
}
