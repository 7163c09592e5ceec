//! # Dispatch Testing Utils
//!
//! 调度系统各 crate 共用的测试工具：
//!
//! - **Builders**: 带默认值的 `DispatchRequest` / `Truck` 构造器
//! - **Mocks**: 记录回调或返回错误的 `DispatchEventSink` 实现
//! - **Helpers**: 异步条件等待、快速处理器配置
//!
//! ```toml
//! [dev-dependencies]
//! dispatch-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
