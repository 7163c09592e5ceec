//! Event sink test doubles

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dispatch_dispatcher::DispatchEventSink;
use dispatch_domain::{DispatchRequest, Truck};
use dispatch_errors::{DispatchError, DispatchResult};

/// 记录所有回调的事件接收器
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    completed: Arc<Mutex<Vec<(DispatchRequest, Truck)>>>,
    failed: Arc<Mutex<Vec<DispatchRequest>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> Vec<(DispatchRequest, Truck)> {
        self.completed.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<DispatchRequest> {
        self.failed.lock().unwrap().clone()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.lock().unwrap().len()
    }
}

#[async_trait]
impl DispatchEventSink for RecordingEventSink {
    async fn on_completed(&self, request: &DispatchRequest, truck: &Truck) -> DispatchResult<()> {
        self.completed
            .lock()
            .unwrap()
            .push((request.clone(), truck.clone()));
        Ok(())
    }

    async fn on_failed(&self, request: &DispatchRequest) -> DispatchResult<()> {
        self.failed.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// 每次回调都返回协作方错误的事件接收器
#[derive(Debug, Clone, Default)]
pub struct FailingEventSink {
    calls: Arc<Mutex<usize>>,
}

impl FailingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn fail(&self) -> DispatchResult<()> {
        *self.calls.lock().unwrap() += 1;
        Err(DispatchError::collaborator("recycler service unavailable"))
    }
}

#[async_trait]
impl DispatchEventSink for FailingEventSink {
    async fn on_completed(&self, _request: &DispatchRequest, _truck: &Truck) -> DispatchResult<()> {
        self.fail()
    }

    async fn on_failed(&self, _request: &DispatchRequest) -> DispatchResult<()> {
        self.fail()
    }
}
