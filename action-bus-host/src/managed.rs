//! 托管类型协议与构造上下文
//!
use crate::container::Container;
use crate::error::{HostError, HostResult};
use action_bus::{ActionBinder, ActionHost, Actions, Lifecycle};
use std::any::type_name;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 由宿主框架创建、初始化与销毁的类型
///
/// 调用顺序：进入构造期 → `create` → 退出构造期 → `on_init`；销毁时 `on_destroy`
/// 先于处理器退订执行。
pub trait Managed: ActionHost {
    /// 构造函数；只有这里可以调用 [`HostContext::init_action_handlers`]
    fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>>;

    /// 构造完成后的钩子
    fn on_init(this: &Arc<Self>, ctx: &HostContext<'_>) -> HostResult<()> {
        let _ = (this, ctx);
        Ok(())
    }

    /// 销毁钩子
    fn on_destroy(&self) {}
}

/// 创建一个托管实例时可用的上下文
pub struct HostContext<'a> {
    lifecycle: Lifecycle,
    binder: &'a ActionBinder,
    container: Option<&'a Container>,
}

impl<'a> HostContext<'a> {
    pub(crate) fn new(
        lifecycle: Lifecycle,
        binder: &'a ActionBinder,
        container: Option<&'a Container>,
    ) -> Self {
        Self {
            lifecycle,
            binder,
            container,
        }
    }

    /// 正在创建的实例的生命周期
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn binder(&self) -> &ActionBinder {
        self.binder
    }

    pub fn actions(&self) -> &Actions {
        self.binder.actions()
    }

    /// 绑定 `host` 的处理器到当前实例的生命周期
    pub fn init_action_handlers<T: ActionHost>(&self, host: &Arc<T>) -> HostResult<()> {
        self.binder.bind(host, &self.lifecycle)?;
        Ok(())
    }

    /// 获取此前已提供的实例
    pub fn get<D: Send + Sync + 'static>(&self) -> HostResult<Arc<D>> {
        self.container
            .ok_or(HostError::NotProvided {
                name: type_name::<D>(),
            })?
            .get::<D>()
    }
}

/// 在构造期内调用 `create`，随后执行 `on_init`；任一步失败都会销毁该生命周期
pub(crate) fn instantiate<T: Managed>(ctx: &HostContext<'_>) -> HostResult<Arc<T>> {
    let lifecycle = ctx.lifecycle();
    let created = {
        let _guard = lifecycle.enter_construction();
        T::create(ctx)
    };

    let instance = match created {
        Ok(instance) => instance,
        Err(err) => {
            lifecycle.destroy();
            return Err(err);
        }
    };

    if let Err(err) = T::on_init(&instance, ctx) {
        instance.on_destroy();
        lifecycle.destroy();
        return Err(err);
    }

    tracing::debug!(
        host = T::host_name(),
        instance = %lifecycle.id(),
        state = ?lifecycle.state(),
        "host instance created"
    );
    Ok(instance)
}

/// 先执行用户销毁钩子，再销毁生命周期（幂等）
///
/// 钩子是否已执行由 `hook_ran` 单独记录：生命周期可能已经通过其他句柄销毁，
/// 钩子仍要执行一次。
pub(crate) fn teardown<T: Managed>(
    instance: &T,
    lifecycle: &Lifecycle,
    hook_ran: &AtomicBool,
) {
    if !hook_ran.swap(true, Ordering::AcqRel) {
        instance.on_destroy();
    }
    lifecycle.destroy();
}
