//! 进程内动作总线（action-bus）
//!
//! 把离散事件（动作）广播给按类型过滤的订阅者，并把处理器的生命周期绑定到宿主实例：
//! - 动作与类型标识（`action`、`kind`）
//! - 同步多播通道（`channel`）：`dispatch` 返回前所有匹配的即时订阅者都已执行
//! - 处理器注册表（`registry`）：按宿主类型累积绑定，支持继承与按方法名覆写
//! - 生命周期绑定器（`binder`、`lifecycle`）：构造期绑定一次，销毁信号触发时全部退订
//! - 失败隔离（`containment`）与分发组合子（`combinators`）
//!
//! 典型用法：
//! 1. 定义动作类型（手写 `impl Action` 或使用 `#[action]` 宏）；
//! 2. 为宿主类型实现 `ActionHost::declare_handlers`，声明即时/流式处理器；
//! 3. 在宿主构造期间调用 `init_action_handlers`；
//! 4. 任意位置 `Actions::global().dispatch(..)`；宿主销毁时调用 `Lifecycle::destroy`。
//!
pub mod action;
pub mod binder;
pub mod channel;
pub mod combinators;
pub mod config;
pub mod containment;
pub mod error;
pub mod host;
pub mod kind;
pub mod lifecycle;
pub mod registry;

pub use action::{Action, ActionRef, IntoActions};
pub use binder::{ActionBinder, init_action_handlers};
pub use channel::{ActionStream, Actions, Subscription, TypedActionStream};
pub use combinators::DispatchStreamExt;
pub use config::BinderConfig;
pub use error::{ActionError, ActionResult, HandlerError};
pub use host::{ActionHost, HostKind};
pub use kind::{ActionKind, ActionKinds};
pub use lifecycle::{ConstructionGuard, Lifecycle, LifecycleState};
pub use registry::{HandlerBindings, HandlerRegistry};

/// 常用类型一次导入
pub mod prelude {
    pub use crate::action::{Action, ActionRef, IntoActions};
    pub use crate::binder::{ActionBinder, init_action_handlers};
    pub use crate::channel::{ActionStream, Actions, Subscription, TypedActionStream};
    pub use crate::combinators::DispatchStreamExt;
    pub use crate::error::{ActionError, ActionResult, HandlerError};
    pub use crate::host::{ActionHost, HostKind};
    pub use crate::kind::{ActionKind, ActionKinds};
    pub use crate::kinds;
    pub use crate::lifecycle::Lifecycle;
    pub use crate::registry::HandlerBindings;
}

// 允许在本 crate 内部通过 ::action_bus 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::action_bus 路径。
extern crate self as action_bus;
