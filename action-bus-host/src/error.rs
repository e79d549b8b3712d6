//! 宿主层错误
//!
use action_bus::ActionError;
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("provider already registered: {name}")]
    AlreadyProvided { name: &'static str },

    #[error("provider not found: {name}")]
    NotProvided { name: &'static str },

    #[error("failed to create {name}: {source}")]
    Create {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// 统一 Result 类型别名
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// 构造函数中的业务失败
    pub fn create<T: ?Sized>(source: impl Into<anyhow::Error>) -> Self {
        HostError::Create {
            name: std::any::type_name::<T>(),
            source: source.into(),
        }
    }
}
