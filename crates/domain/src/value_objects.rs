use dispatch_errors::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{DispatchRequest, Truck};

/// 默认车辆容量（初始化车队时使用）
pub const DEFAULT_TRUCK_CAPACITY: i32 = 50;
/// 默认车辆可靠度
pub const DEFAULT_TRUCK_RELIABILITY: f64 = 0.95;

/// 提交调度请求的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitDispatch {
    pub recycler_id: Uuid,
    pub expected_bottles: i32,
    pub fullness_percentage: f64,
}

impl SubmitDispatch {
    pub fn validate(&self) -> DispatchResult<()> {
        if self.expected_bottles < 0 {
            return Err(DispatchError::validation_error(format!(
                "expected_bottles must not be negative, got {}",
                self.expected_bottles
            )));
        }
        if !self.fullness_percentage.is_finite()
            || !(0.0..=100.0).contains(&self.fullness_percentage)
        {
            return Err(DispatchError::validation_error(format!(
                "fullness_percentage must be within [0, 100], got {}",
                self.fullness_percentage
            )));
        }
        Ok(())
    }

    pub fn into_request(self) -> DispatchRequest {
        DispatchRequest::new(
            self.recycler_id,
            self.expected_bottles,
            self.fullness_percentage,
        )
    }
}

/// 登记车辆的输入
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedTruck {
    pub capacity: i32,
    pub reliability: f64,
}

impl Default for SeedTruck {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TRUCK_CAPACITY,
            reliability: DEFAULT_TRUCK_RELIABILITY,
        }
    }
}

impl SeedTruck {
    pub fn validate(&self) -> DispatchResult<()> {
        if self.capacity <= 0 {
            return Err(DispatchError::validation_error(format!(
                "capacity must be greater than 0, got {}",
                self.capacity
            )));
        }
        if !(self.reliability > 0.0 && self.reliability <= 1.0) {
            return Err(DispatchError::validation_error(format!(
                "reliability must be within (0, 1], got {}",
                self.reliability
            )));
        }
        Ok(())
    }

    pub fn into_truck(self) -> Truck {
        Truck::new(self.capacity, self.reliability)
    }
}

/// 调度状态汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DispatchSummary {
    pub pending_count: usize,
    pub truck_count: usize,
    pub busy_trucks: usize,
    pub utilization: f64,
}

impl DispatchSummary {
    pub fn from_snapshot(pending: &[DispatchRequest], trucks: &[Truck]) -> Self {
        let busy_trucks = trucks.iter().filter(|truck| truck.is_busy()).count();
        let utilization = if trucks.is_empty() {
            0.0
        } else {
            busy_trucks as f64 / trucks.len() as f64
        };

        Self {
            pending_count: pending.len(),
            truck_count: trucks.len(),
            busy_trucks,
            utilization,
        }
    }

    pub fn idle_trucks(&self) -> usize {
        self.truck_count - self.busy_trucks
    }
}
