//! 最小宿主框架（action-bus-host）
//!
//! 为 action-bus 提供它依赖的三项宿主能力：
//! - 类别标记：托管类型实现 `ActionHost::host_kind`；
//! - 构造期钩子：`create` 在构造期内执行，只有这里可以绑定处理器；
//! - 销毁信号：`Fixture`/`Container` 销毁时先调用 `on_destroy`，再销毁生命周期。
//!
//! `Container::provide` 会立即创建实例，使服务型宿主的处理器在应用启动时就生效。
//!
pub mod container;
pub mod error;
pub mod fixture;
pub mod managed;

pub use container::Container;
pub use error::{HostError, HostResult};
pub use fixture::Fixture;
pub use managed::{HostContext, Managed};
