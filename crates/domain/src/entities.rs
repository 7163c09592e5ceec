use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 满载度映射到优先级的比例系数（满载度100% => 优先级10）
pub const PRIORITY_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchRequest {
    pub id: Uuid,
    pub recycler_id: Uuid,
    pub expected_bottles: i32,
    pub fullness_percentage: f64, // 0-100
    pub priority: f64,            // 由满载度推导，越大越紧急
    pub status: DispatchStatus,
    pub assigned_truck_id: Option<Uuid>, // 分配后保留，不清空
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32, // 分配失败次数
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "FAILED")]
    Failed,
}

impl DispatchRequest {
    pub fn new(recycler_id: Uuid, expected_bottles: i32, fullness_percentage: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            recycler_id,
            expected_bottles,
            fullness_percentage,
            priority: Self::compute_priority(fullness_percentage),
            status: DispatchStatus::Pending,
            assigned_truck_id: None,
            enqueued_at: Utc::now(),
            attempts: 0,
            completed_at: None,
        }
    }
    pub fn compute_priority(fullness_percentage: f64) -> f64 {
        fullness_percentage / 100.0 * PRIORITY_SCALE
    }
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            DispatchStatus::Assigned | DispatchStatus::InProgress
        )
    }
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            DispatchStatus::Completed | DispatchStatus::Failed
        )
    }
    pub fn update_status(&mut self, status: DispatchStatus) {
        self.status = status;
        match status {
            DispatchStatus::Completed | DispatchStatus::Failed => {
                if self.completed_at.is_none() {
                    self.completed_at = Some(Utc::now());
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Truck {
    pub id: Uuid,
    pub capacity: i32,
    pub status: TruckStatus,
    pub current_load: i32,
    pub reliability: f64,    // (0,1]，越高越优先
    pub total_distance: f64, // 越低越优先
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TruckStatus {
    #[serde(rename = "IDLE")]
    Idle,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "UNAVAILABLE")]
    Unavailable,
}

impl Truck {
    pub fn new(capacity: i32, reliability: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            capacity,
            status: TruckStatus::Idle,
            current_load: 0,
            reliability,
            total_distance: 0.0,
        }
    }
    /// 空闲且未装载的车辆才可参与分配
    pub fn is_available(&self) -> bool {
        self.status == TruckStatus::Idle && self.current_load == 0
    }
    pub fn is_busy(&self) -> bool {
        self.status != TruckStatus::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending_with_priority() {
        let request = DispatchRequest::new(Uuid::new_v4(), 40, 95.0);
        assert_eq!(request.status, DispatchStatus::Pending);
        assert!((request.priority - 9.5).abs() < 1e-9);
        assert!(request.assigned_truck_id.is_none());
        assert_eq!(request.attempts, 0);
    }

    #[test]
    fn test_compute_priority_bounds() {
        assert_eq!(DispatchRequest::compute_priority(0.0), 0.0);
        assert!((DispatchRequest::compute_priority(100.0) - 10.0).abs() < 1e-9);
        assert!((DispatchRequest::compute_priority(80.0) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_status_sets_completed_at_once() {
        let mut request = DispatchRequest::new(Uuid::new_v4(), 10, 50.0);
        request.update_status(DispatchStatus::InProgress);
        assert!(request.completed_at.is_none());
        assert!(request.is_active());

        request.update_status(DispatchStatus::Completed);
        let first = request.completed_at;
        assert!(first.is_some());
        assert!(request.is_finished());

        request.update_status(DispatchStatus::Completed);
        assert_eq!(request.completed_at, first);
    }

    #[test]
    fn test_truck_availability() {
        let mut truck = Truck::new(50, 0.95);
        assert!(truck.is_available());
        assert!(!truck.is_busy());

        truck.current_load = 10;
        assert!(!truck.is_available());

        truck.current_load = 0;
        truck.status = TruckStatus::Unavailable;
        assert!(!truck.is_available());
        assert!(truck.is_busy());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&DispatchStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&TruckStatus::Idle).unwrap(),
            "\"IDLE\""
        );
        let status: DispatchStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(status, DispatchStatus::Completed);
    }
}
