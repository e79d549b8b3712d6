//! 实例生命周期（Lifecycle）
//!
//! 每个宿主实例一份显式状态：
//! - 构造期标记：只有在 [`ConstructionGuard`] 存活期间才允许绑定处理器；
//! - 一次性初始化标记：false → true 只发生一次；
//! - 销毁信号：`CancellationToken`，取消后所有即时订阅立即失效、流驱动任务退出；
//! - 持有的资源：即时/流式订阅句柄与驱动任务句柄。
//!
//! `destroy` 幂等；最后一个句柄被丢弃时自动销毁。
//!
use crate::channel::Subscription;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 生命周期所处阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// 尚未绑定处理器
    Unbound,
    /// 已绑定，处理器生效中
    Bound,
    /// 已销毁
    Destroyed,
}

#[derive(Default)]
struct Resources {
    subscriptions: Vec<Subscription>,
    drivers: Vec<JoinHandle<()>>,
}

struct LifecycleInner {
    id: Uuid,
    constructing: AtomicBool,
    initialized: AtomicBool,
    destroyed: AtomicBool,
    token: CancellationToken,
    resources: Mutex<Resources>,
}

impl LifecycleInner {
    fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();

        // 锁外释放：Subscription::drop 会回到通道加锁
        let subscriptions = std::mem::take(&mut self.resources.lock().subscriptions);
        let released = subscriptions.len();
        drop(subscriptions);

        tracing::debug!(instance = %self.id, released, "lifecycle destroyed");
        true
    }
}

impl Drop for LifecycleInner {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// 宿主实例的生命周期句柄（克隆共享同一状态）
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                id: Uuid::new_v4(),
                constructing: AtomicBool::new(false),
                initialized: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
                token: CancellationToken::new(),
                resources: Mutex::new(Resources::default()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 进入构造期，返回的守卫被丢弃时退出构造期
    pub fn enter_construction(&self) -> ConstructionGuard {
        self.inner.constructing.store(true, Ordering::Release);
        ConstructionGuard {
            lifecycle: self.clone(),
        }
    }

    pub fn is_constructing(&self) -> bool {
        self.inner.constructing.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// 标记为已初始化；已经初始化过则返回 false
    pub(crate) fn mark_initialized(&self) -> bool {
        self.inner
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_destroyed() {
            LifecycleState::Destroyed
        } else if self.is_initialized() {
            LifecycleState::Bound
        } else {
            LifecycleState::Unbound
        }
    }

    /// 触发销毁信号并同步释放全部订阅（幂等）
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// 等待销毁信号
    pub async fn destroyed(&self) {
        self.inner.token.cancelled().await
    }

    /// 等待所有流驱动任务退出（通常在 `destroy` 之后调用）
    pub async fn join(&self) {
        let drivers = std::mem::take(&mut self.inner.resources.lock().drivers);
        for driver in drivers {
            let _ = driver.await;
        }
    }

    pub(crate) fn scope(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    pub(crate) fn retain_subscription(&self, subscription: Subscription) {
        let mut resources = self.inner.resources.lock();
        if self.is_destroyed() {
            drop(resources);
            subscription.unsubscribe();
            return;
        }
        resources.subscriptions.push(subscription);
    }

    pub(crate) fn retain_driver(&self, driver: JoinHandle<()>) {
        let mut resources = self.inner.resources.lock();
        resources.drivers.retain(|d| !d.is_finished());
        resources.drivers.push(driver);
    }

    /// 当前持有的订阅数
    pub fn subscription_count(&self) -> usize {
        self.inner.resources.lock().subscriptions.len()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("constructing", &self.is_constructing())
            .finish()
    }
}

/// 构造期守卫
#[must_use = "construction ends as soon as the guard is dropped"]
pub struct ConstructionGuard {
    lifecycle: Lifecycle,
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        self.lifecycle
            .inner
            .constructing
            .store(false, Ordering::Release);
    }
}
