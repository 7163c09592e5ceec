use tracing::debug;

use dispatch_domain::{DispatchRequest, Truck};

/// 默认容量欠载容差：车辆容量不低于预计装载量的95%即视为可用
pub const DEFAULT_UNDERFILL_TOLERANCE: f64 = 0.05;

/// 车辆选择策略
///
/// `available_trucks` 中的车辆都已处于空闲且空载状态，返回值为被选中车辆在切片中的下标。
pub trait TruckSelectionStrategy: Send + Sync {
    fn select_truck(&self, request: &DispatchRequest, available_trucks: &[&Truck]) -> Option<usize>;

    fn name(&self) -> &str;
}

/// 容量匹配策略
///
/// 在满足容量要求的车辆中选择容量最小的一辆，把大容量车辆留给大批量请求；
/// 容量相同时优先可靠度高的，再优先累计里程少的。完全相同时按登记顺序。
#[derive(Debug, Clone)]
pub struct CapacityFitStrategy {
    underfill_tolerance: f64,
}

impl CapacityFitStrategy {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_UNDERFILL_TOLERANCE)
    }

    pub fn with_tolerance(underfill_tolerance: f64) -> Self {
        Self {
            underfill_tolerance,
        }
    }

    /// 请求所需的最小车辆容量
    pub fn required_capacity(&self, request: &DispatchRequest) -> f64 {
        request.expected_bottles as f64 * (1.0 - self.underfill_tolerance)
    }
}

impl Default for CapacityFitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl TruckSelectionStrategy for CapacityFitStrategy {
    fn select_truck(&self, request: &DispatchRequest, available_trucks: &[&Truck]) -> Option<usize> {
        if available_trucks.is_empty() {
            debug!("没有空闲车辆");
            return None;
        }
        let required = self.required_capacity(request);

        let selected = available_trucks
            .iter()
            .enumerate()
            .filter(|(_, truck)| truck.capacity as f64 >= required)
            .min_by(|(_, a), (_, b)| {
                a.capacity
                    .cmp(&b.capacity)
                    .then_with(|| b.reliability.total_cmp(&a.reliability))
                    .then_with(|| a.total_distance.total_cmp(&b.total_distance))
            });

        match selected {
            Some((index, truck)) => {
                debug!(
                    "容量匹配策略选择车辆: {} (容量: {}, 可靠度: {:.2}, 所需容量: {:.1})",
                    truck.id, truck.capacity, truck.reliability, required
                );
                Some(index)
            }
            None => {
                debug!(
                    "没有容量满足 {:.1} 的空闲车辆 (空闲车辆数: {})",
                    required,
                    available_trucks.len()
                );
                None
            }
        }
    }

    fn name(&self) -> &str {
        "CapacityFit"
    }
}

#[cfg(test)]
#[path = "strategies_test.rs"]
mod strategies_test;
