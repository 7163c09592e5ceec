//! Test data builders for dispatch entities

use chrono::{DateTime, Utc};
use dispatch_domain::{DispatchRequest, DispatchStatus, Truck, TruckStatus};
use uuid::Uuid;

/// Builder for creating test DispatchRequest entities
pub struct DispatchRequestBuilder {
    request: DispatchRequest,
}

impl DispatchRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: DispatchRequest::new(Uuid::new_v4(), 10, 50.0),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.request.id = id;
        self
    }

    pub fn with_recycler_id(mut self, recycler_id: Uuid) -> Self {
        self.request.recycler_id = recycler_id;
        self
    }

    pub fn with_expected_bottles(mut self, expected_bottles: i32) -> Self {
        self.request.expected_bottles = expected_bottles;
        self
    }

    /// Sets fullness and the matching priority
    pub fn with_fullness(mut self, fullness_percentage: f64) -> Self {
        self.request.fullness_percentage = fullness_percentage;
        self.request.priority = DispatchRequest::compute_priority(fullness_percentage);
        self
    }

    /// Overrides priority without touching fullness; the queue re-stamps it on enqueue
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.request.priority = priority;
        self
    }

    pub fn with_status(mut self, status: DispatchStatus) -> Self {
        self.request.status = status;
        self
    }

    pub fn with_assigned_truck(mut self, truck_id: Uuid) -> Self {
        self.request.assigned_truck_id = Some(truck_id);
        self
    }

    pub fn with_enqueued_at(mut self, enqueued_at: DateTime<Utc>) -> Self {
        self.request.enqueued_at = enqueued_at;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.request.attempts = attempts;
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.request.completed_at = Some(completed_at);
        self
    }

    pub fn build(self) -> DispatchRequest {
        self.request
    }
}

impl Default for DispatchRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Truck entities
pub struct TruckBuilder {
    truck: Truck,
}

impl TruckBuilder {
    pub fn new() -> Self {
        Self {
            truck: Truck::new(50, 0.95),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.truck.id = id;
        self
    }

    pub fn with_capacity(mut self, capacity: i32) -> Self {
        self.truck.capacity = capacity;
        self
    }

    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.truck.reliability = reliability;
        self
    }

    pub fn with_status(mut self, status: TruckStatus) -> Self {
        self.truck.status = status;
        self
    }

    pub fn with_current_load(mut self, current_load: i32) -> Self {
        self.truck.current_load = current_load;
        self
    }

    pub fn with_total_distance(mut self, total_distance: f64) -> Self {
        self.truck.total_distance = total_distance;
        self
    }

    pub fn busy(self) -> Self {
        self.with_status(TruckStatus::InProgress)
    }

    pub fn build(self) -> Truck {
        self.truck
    }
}

impl Default for TruckBuilder {
    fn default() -> Self {
        Self::new()
    }
}
