use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatcherConfig {
    pub enabled: bool,
    /// 队列为空时的等待间隔（毫秒）
    pub idle_interval_ms: u64,
    /// 分配失败重新入队后的退避间隔（毫秒）
    pub requeue_backoff_ms: u64,
    /// 退避间隔上限（毫秒）
    pub max_requeue_backoff_ms: u64,
    /// 退避倍数，1.0 表示固定间隔
    pub backoff_multiplier: f64,
    /// 退避间隔的随机抖动范围（0.0-1.0）
    pub backoff_jitter_factor: f64,
    /// 进入运输中状态的模拟耗时（毫秒）
    pub in_progress_delay_ms: u64,
    /// 进入完成状态的模拟耗时（毫秒）
    pub completion_delay_ms: u64,
    /// 最大分配尝试次数，未设置时无限等待运力
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_assignment_attempts: Option<u32>,
    /// 容量欠载容差（0.05 表示车辆容量不低于预计装载量的95%即可）
    pub underfill_tolerance: f64,
    /// 历史记录中保留的已结束调度请求数量
    pub history_limit: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_interval_ms: 100,
            requeue_backoff_ms: 50,
            max_requeue_backoff_ms: 1000,
            backoff_multiplier: 1.0,
            backoff_jitter_factor: 0.0,
            in_progress_delay_ms: 500,
            completion_delay_ms: 500,
            max_assignment_attempts: None,
            underfill_tolerance: 0.05,
            history_limit: 1000,
        }
    }
}

impl DispatcherConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
    pub fn requeue_backoff(&self) -> Duration {
        Duration::from_millis(self.requeue_backoff_ms)
    }
    pub fn max_requeue_backoff(&self) -> Duration {
        Duration::from_millis(self.max_requeue_backoff_ms)
    }
    pub fn in_progress_delay(&self) -> Duration {
        Duration::from_millis(self.in_progress_delay_ms)
    }
    pub fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_interval_ms(
            self.idle_interval_ms,
            "dispatcher.idle_interval_ms",
            60_000,
        )?;
        ValidationUtils::validate_interval_ms(
            self.requeue_backoff_ms,
            "dispatcher.requeue_backoff_ms",
            60_000,
        )?;
        ValidationUtils::validate_interval_ms(
            self.max_requeue_backoff_ms,
            "dispatcher.max_requeue_backoff_ms",
            600_000,
        )?;
        if self.max_requeue_backoff_ms < self.requeue_backoff_ms {
            return Err(crate::ConfigError::Validation(
                "dispatcher.max_requeue_backoff_ms must not be less than dispatcher.requeue_backoff_ms"
                    .to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(crate::ConfigError::Validation(
                "dispatcher.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        ValidationUtils::validate_ratio(
            self.backoff_jitter_factor,
            "dispatcher.backoff_jitter_factor",
        )?;
        ValidationUtils::validate_count(self.history_limit, "dispatcher.history_limit", 100_000)?;
        ValidationUtils::validate_delay_ms(
            self.in_progress_delay_ms,
            "dispatcher.in_progress_delay_ms",
            600_000,
        )?;
        ValidationUtils::validate_delay_ms(
            self.completion_delay_ms,
            "dispatcher.completion_delay_ms",
            600_000,
        )?;
        ValidationUtils::validate_ratio(self.underfill_tolerance, "dispatcher.underfill_tolerance")?;

        if self.max_assignment_attempts == Some(0) {
            return Err(crate::ConfigError::Validation(
                "dispatcher.max_assignment_attempts must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}
