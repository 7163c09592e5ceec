use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use dispatch_domain::{DispatchRequest, DispatchStatus, Truck, TruckStatus};

use crate::strategies::{CapacityFitStrategy, TruckSelectionStrategy};

/// 车队登记与车辆分配服务
pub struct FleetService {
    trucks: RwLock<Vec<Truck>>,
    strategy: Arc<dyn TruckSelectionStrategy>,
}

impl FleetService {
    pub fn new() -> Self {
        Self::with_strategy(Arc::new(CapacityFitStrategy::new()))
    }

    pub fn with_strategy(strategy: Arc<dyn TruckSelectionStrategy>) -> Self {
        Self {
            trucks: RwLock::new(Vec::new()),
            strategy,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// 登记车辆，不检查ID唯一性
    pub async fn add_truck(&self, truck: Truck) {
        debug!(
            "登记车辆 {} (容量: {}, 可靠度: {:.2})",
            truck.id, truck.capacity, truck.reliability
        );
        self.trucks.write().await.push(truck);
    }

    pub async fn get_all(&self) -> Vec<Truck> {
        self.trucks.read().await.clone()
    }

    pub async fn get_available_trucks(&self) -> Vec<Truck> {
        self.trucks
            .read()
            .await
            .iter()
            .filter(|truck| truck.is_available())
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<Truck> {
        self.trucks
            .read()
            .await
            .iter()
            .find(|truck| truck.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.trucks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.trucks.read().await.is_empty()
    }

    /// 为请求分配车辆
    ///
    /// 选择与状态变更在同一写锁内完成，并发调用不会重复分配同一辆车。
    /// 未找到合适车辆时返回 `None`，车辆与请求均不被修改。
    pub async fn try_assign_truck(&self, request: &mut DispatchRequest) -> Option<Truck> {
        let mut trucks = self.trucks.write().await;

        let registry_index = {
            let (indices, available): (Vec<usize>, Vec<&Truck>) = trucks
                .iter()
                .enumerate()
                .filter(|(_, truck)| truck.is_available())
                .unzip();
            let selected = self.strategy.select_truck(request, &available)?;
            *indices.get(selected)?
        };

        let truck = &mut trucks[registry_index];
        truck.status = TruckStatus::Assigned;
        request.assigned_truck_id = Some(truck.id);
        request.update_status(DispatchStatus::Assigned);

        info!(
            "调度请求 {} 分配到车辆 {} (策略: {}, 容量: {}, 预计装载: {})",
            request.id,
            truck.id,
            self.strategy.name(),
            truck.capacity,
            request.expected_bottles
        );

        Some(truck.clone())
    }

    /// 更新车辆状态，车辆不存在时返回 `false`
    pub async fn set_status(&self, id: Uuid, status: TruckStatus) -> bool {
        let mut trucks = self.trucks.write().await;
        match trucks.iter_mut().find(|truck| truck.id == id) {
            Some(truck) => {
                debug!("车辆 {} 状态 {:?} -> {:?}", id, truck.status, status);
                truck.status = status;
                true
            }
            None => false,
        }
    }

    /// 记录车辆当前装载量
    pub async fn load_truck(&self, id: Uuid, load: i32) -> bool {
        let mut trucks = self.trucks.write().await;
        match trucks.iter_mut().find(|truck| truck.id == id) {
            Some(truck) => {
                truck.current_load = load;
                true
            }
            None => false,
        }
    }

    /// 卸空并释放车辆，使其重新可被分配
    pub async fn release_truck(&self, id: Uuid) -> Option<Truck> {
        let mut trucks = self.trucks.write().await;
        let truck = trucks.iter_mut().find(|truck| truck.id == id)?;
        truck.status = TruckStatus::Idle;
        truck.current_load = 0;
        debug!("车辆 {} 已释放", id);
        Some(truck.clone())
    }

    pub async fn reset(&self) {
        let mut trucks = self.trucks.write().await;
        let cleared = trucks.len();
        trucks.clear();
        debug!("车队已清空，移除 {} 辆车", cleared);
    }
}

impl Default for FleetService {
    fn default() -> Self {
        Self::new()
    }
}
