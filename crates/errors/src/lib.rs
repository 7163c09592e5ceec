use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("车辆未找到: {id}")]
    TruckNotFound { id: Uuid },
    #[error("数据验证失败: {0}")]
    Validation(String),
    #[error("外部协作方错误: {0}")]
    Collaborator(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    pub fn truck_not_found(id: Uuid) -> Self {
        Self::TruckNotFound { id }
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }
    pub fn collaborator<S: Into<String>>(msg: S) -> Self {
        Self::Collaborator(msg.into())
    }
}
