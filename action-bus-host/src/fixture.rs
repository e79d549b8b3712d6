//! 单个托管实例
//!
use crate::error::HostResult;
use crate::managed::{HostContext, Managed, instantiate, teardown};
use action_bus::{ActionBinder, Lifecycle};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// 创建并持有一个托管实例；`drop` 时销毁
pub struct Fixture<T: Managed> {
    instance: Arc<T>,
    lifecycle: Lifecycle,
    hook_ran: AtomicBool,
}

impl<T: Managed> Fixture<T> {
    /// 使用全局通道与默认配置创建
    pub fn create() -> HostResult<Self> {
        Self::with_binder(ActionBinder::global())
    }

    pub fn with_binder(binder: &ActionBinder) -> HostResult<Self> {
        let lifecycle = Lifecycle::new();
        let ctx = HostContext::new(lifecycle.clone(), binder, None);
        let instance = instantiate::<T>(&ctx)?;
        Ok(Self {
            instance,
            lifecycle,
            hook_ran: AtomicBool::new(false),
        })
    }

    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// 销毁实例（幂等）
    pub fn destroy(&self) {
        teardown(self.instance.as_ref(), &self.lifecycle, &self.hook_ran);
    }
}

impl<T: Managed> Drop for Fixture<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T: Managed> fmt::Debug for Fixture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("host", &T::host_name())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
