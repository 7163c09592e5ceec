use async_trait::async_trait;
use tracing::{info, warn};

use dispatch_domain::{DispatchRequest, Truck};
use dispatch_errors::DispatchResult;

/// 调度结果通知接口
///
/// 由外部协作方实现（例如通知回收站服务清空计数）。回调在请求状态已经提交之后触发，
/// 返回的错误由处理器循环记录后忽略，不会影响调度状态。
#[async_trait]
pub trait DispatchEventSink: Send + Sync {
    /// 请求完成且车辆已释放
    async fn on_completed(&self, request: &DispatchRequest, truck: &Truck) -> DispatchResult<()>;

    /// 请求因超过最大分配尝试次数而失败
    async fn on_failed(&self, request: &DispatchRequest) -> DispatchResult<()>;
}

/// 仅输出日志的默认实现
#[derive(Debug, Default, Clone)]
pub struct LoggingEventSink;

impl LoggingEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DispatchEventSink for LoggingEventSink {
    async fn on_completed(&self, request: &DispatchRequest, truck: &Truck) -> DispatchResult<()> {
        info!(
            "回收站 {} 的调度请求 {} 已由车辆 {} 完成",
            request.recycler_id, request.id, truck.id
        );
        Ok(())
    }

    async fn on_failed(&self, request: &DispatchRequest) -> DispatchResult<()> {
        warn!(
            "回收站 {} 的调度请求 {} 在 {} 次尝试后仍无可用车辆",
            request.recycler_id, request.id, request.attempts
        );
        Ok(())
    }
}
