//! 提供者容器
//!
//! `provide` 按调用顺序立即创建实例（即时绑定其处理器），`destroy` 逆序销毁。
//!
use crate::error::{HostError, HostResult};
use crate::managed::{HostContext, Managed, instantiate, teardown};
use action_bus::{ActionBinder, Lifecycle};
use parking_lot::Mutex;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

type Teardown = Box<dyn Fn() + Send + Sync>;

struct Entry {
    type_id: TypeId,
    name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    teardown: Teardown,
}

pub struct Container {
    binder: ActionBinder,
    entries: Mutex<Vec<Entry>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// 使用全局通道与默认配置
    pub fn new() -> Self {
        Self::with_binder(ActionBinder::global().clone())
    }

    pub fn with_binder(binder: ActionBinder) -> Self {
        Self {
            binder,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn binder(&self) -> &ActionBinder {
        &self.binder
    }

    /// 立即创建 `T` 并登记
    pub fn provide<T: Managed>(&self) -> HostResult<Arc<T>> {
        let name = type_name::<T>();
        if self.contains::<T>() {
            return Err(HostError::AlreadyProvided { name });
        }

        // 创建期间不持锁：构造函数可能通过上下文 get 其他实例
        let lifecycle = Lifecycle::new();
        let ctx = HostContext::new(lifecycle.clone(), &self.binder, Some(self));
        let instance = instantiate::<T>(&ctx)?;

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.type_id == TypeId::of::<T>()) {
            drop(entries);
            teardown(instance.as_ref(), &lifecycle, &AtomicBool::new(false));
            return Err(HostError::AlreadyProvided { name });
        }

        let held = instance.clone();
        let hook_ran = AtomicBool::new(false);
        entries.push(Entry {
            type_id: TypeId::of::<T>(),
            name,
            instance: instance.clone(),
            teardown: Box::new(move || teardown(held.as_ref(), &lifecycle, &hook_ran)),
        });
        tracing::debug!(provider = name, providers = entries.len(), "provider registered");

        Ok(instance)
    }

    /// 登记一个现成的值（不参与处理器绑定，销毁时仅释放引用）
    pub fn provide_value<T: Send + Sync + 'static>(&self, value: T) -> HostResult<Arc<T>> {
        let name = type_name::<T>();
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.type_id == TypeId::of::<T>()) {
            return Err(HostError::AlreadyProvided { name });
        }

        let value = Arc::new(value);
        entries.push(Entry {
            type_id: TypeId::of::<T>(),
            name,
            instance: value.clone(),
            teardown: Box::new(|| {}),
        });
        Ok(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> HostResult<Arc<T>> {
        let found = self
            .entries
            .lock()
            .iter()
            .find(|e| e.type_id == TypeId::of::<T>())
            .map(|e| e.instance.clone());

        found
            .and_then(|instance| instance.downcast::<T>().ok())
            .ok_or(HostError::NotProvided {
                name: type_name::<T>(),
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|e| e.type_id == TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// 逆序销毁全部实例
    pub fn destroy(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for entry in entries.into_iter().rev() {
            (entry.teardown)();
            tracing::debug!(provider = entry.name, "provider destroyed");
        }
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.entries.lock().iter().map(|e| e.name).collect();
        f.debug_struct("Container")
            .field("providers", &names)
            .finish()
    }
}
