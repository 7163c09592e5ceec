use crate::ConfigResult;

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that an interval in milliseconds is positive and bounded
    pub fn validate_interval_ms(value: u64, field_name: &str, max_ms: u64) -> ConfigResult<()> {
        if value == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if value > max_ms {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max_ms}"
            )));
        }
        Ok(())
    }

    /// Validate that a delay in milliseconds is bounded (zero allowed)
    pub fn validate_delay_ms(value: u64, field_name: &str, max_ms: u64) -> ConfigResult<()> {
        if value > max_ms {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max_ms}"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(crate::ConfigError::Validation(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if timeout_seconds > 3600 {
            return Err(crate::ConfigError::Validation(
                "timeout_seconds must be less than or equal to 3600".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that a count is positive and bounded
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> ConfigResult<()> {
        if count == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    /// Validate that a ratio lies within [0, 1)
    pub fn validate_ratio(value: f64, field_name: &str) -> ConfigResult<()> {
        if !value.is_finite() || !(0.0..1.0).contains(&value) {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be within [0, 1)"
            )));
        }
        Ok(())
    }

    /// Validate that a value is one of the allowed options
    pub fn validate_one_of(value: &str, field_name: &str, allowed: &[&str]) -> ConfigResult<()> {
        if !allowed.contains(&value) {
            return Err(crate::ConfigError::Validation(format!(
                "Invalid {field_name}: {value}. Valid options: {allowed:?}"
            )));
        }
        Ok(())
    }
}
