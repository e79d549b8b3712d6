//! 统一错误定义
//!
//! 这里只收录“配置类”错误：它们是编程错误（装配/调用方式不对），
//! 在注册或绑定时同步返回，期望在开发与测试阶段就被发现。
//!
//! 处理器自身的运行时失败不属于这里：
//! - 即时处理器（immediate）的 panic 直接穿透 `dispatch` 抛给调用方；
//! - 流式处理器（stream）的失败以 [`HandlerError`] 表达，被 `containment` 记录并吞掉。
//!
use crate::host::HostKind;
use thiserror::Error;

/// 配置类错误
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ActionError {
    // --- 宿主校验 ---
    #[error(
        "init_action_handlers() should be used inside a type marked as one of [{supported}]; `{host}` is marked as {kind}"
    )]
    UnsupportedHost {
        host: &'static str,
        kind: HostKind,
        supported: String,
    },

    // --- 绑定时机/次数 ---
    #[error(
        "init_action_handlers() should be called only once - inside the deepest type; `{host}` is already initialized"
    )]
    AlreadyInitialized { host: &'static str },
    #[error("init_action_handlers() should be called inside constructor of `{host}`")]
    OutsideConstructor { host: &'static str },
    #[error("cannot bind action handlers of `{host}`: instance is already destroyed")]
    Destroyed { host: &'static str },

    // --- 处理器声明 ---
    #[error("action handler `{host}::{method}` must declare at least one action kind")]
    EmptyActionKinds {
        host: &'static str,
        method: &'static str,
    },
    #[error("stream action handler `{host}::{method}` requires a tokio runtime at bind time")]
    NoRuntime {
        host: &'static str,
        method: &'static str,
    },

    // --- 内部 ---
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// 统一 Result 类型别名
pub type ActionResult<T> = Result<T, ActionError>;

/// 流式处理器的失败类型
pub type HandlerError = anyhow::Error;
