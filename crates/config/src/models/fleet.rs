use crate::validation::ConfigValidator;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TruckSeedConfig {
    pub capacity: i32,
    pub reliability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    /// 启动时是否登记一辆默认车辆（容量50，可靠度0.95）
    pub seed_default_truck: bool,
    /// 启动时额外登记的车辆
    pub trucks: Vec<TruckSeedConfig>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            seed_default_truck: true,
            trucks: Vec::new(),
        }
    }
}

impl ConfigValidator for FleetConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        for (index, truck) in self.trucks.iter().enumerate() {
            if truck.capacity <= 0 {
                return Err(crate::ConfigError::Validation(format!(
                    "fleet.trucks[{index}].capacity must be greater than 0"
                )));
            }
            if !(truck.reliability > 0.0 && truck.reliability <= 1.0) {
                return Err(crate::ConfigError::Validation(format!(
                    "fleet.trucks[{index}].reliability must be within (0, 1]"
                )));
            }
        }
        Ok(())
    }
}
