//! 宿主（Host）协议
//!
//! 绑定器对宿主框架只有三点要求：
//! 1. 类型标记：[`ActionHost::host_kind`] 表明该类型由框架托管、属于哪一类；
//! 2. 构造期钩子：[`Lifecycle::enter_construction`](crate::lifecycle::Lifecycle::enter_construction)；
//! 3. 销毁信号：[`Lifecycle::destroy`](crate::lifecycle::Lifecycle::destroy)。
//!
use crate::error::ActionResult;
use crate::registry::HandlerBindings;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 宿主类型的类别（由宿主框架标记）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    Component,
    Directive,
    Service,
    Pipe,
    /// 未被框架托管的普通类型
    Plain,
}

impl HostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::Component => "component",
            HostKind::Directive => "directive",
            HostKind::Service => "service",
            HostKind::Pipe => "pipe",
            HostKind::Plain => "plain",
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拥有动作处理器的宿主类型
///
/// `declare_handlers` 相当于“类定义期”：每个类型只会被注册表调用一次，结果被缓存。
///
/// ```rust
/// use action_bus::prelude::*;
///
/// #[derive(Debug)]
/// struct Refresh;
/// impl Action for Refresh {}
///
/// struct Dashboard;
///
/// impl Dashboard {
///     fn on_refresh(&self, _action: &Refresh) {}
/// }
///
/// impl ActionHost for Dashboard {
///     fn host_kind() -> HostKind {
///         HostKind::Component
///     }
///
///     fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
///         handlers.on::<Refresh>("on_refresh", Self::on_refresh);
///         Ok(())
///     }
/// }
/// ```
pub trait ActionHost: Send + Sync + Sized + 'static {
    /// 框架标记的类别
    fn host_kind() -> HostKind;

    /// 声明处理器；继承通过 [`HandlerBindings::inherit`] 显式完成
    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()>;

    /// 用于日志与错误信息的名称
    fn host_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
