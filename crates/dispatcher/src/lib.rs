//! 回收车辆调度核心
//!
//! 按满载程度排序的调度队列、车队登记与按容量匹配的车辆分配，
//! 以及把请求推进到完成状态的后台处理器。

pub mod epoch;
pub mod events;
pub mod fleet;
pub mod history;
pub mod processor;
pub mod queue;
pub mod service;
pub mod strategies;

pub use epoch::ResetEpoch;
pub use events::{DispatchEventSink, LoggingEventSink};
pub use fleet::FleetService;
pub use history::{DispatchHistory, DEFAULT_HISTORY_LIMIT};
pub use processor::{
    DispatchProcessor, ProcessOutcome, ProcessorConfig, ProcessorStats, ProcessorStatsSnapshot,
};
pub use queue::DispatchQueue;
pub use service::DispatchService;
pub use strategies::{CapacityFitStrategy, TruckSelectionStrategy, DEFAULT_UNDERFILL_TOLERANCE};
