//! 动作通道（Actions）
//!
//! 进程内的多播广播器，按 kind 过滤订阅：
//! - `dispatch`：同步投递，返回前所有匹配的即时订阅者都已执行完毕；
//! - `subscribe`：即时回调订阅，返回 RAII 的 [`Subscription`]；
//! - `on_action`：过滤后的动作流（[`ActionStream`]），只接收订阅之后分发的动作。
//!
//! 与 `tokio::sync::broadcast` 不同，这里没有缓冲容量与滞后（lag）：
//! 每个（动作，匹配订阅者）恰好通知一次。流订阅者通过无界 mpsc 接收，
//! 投递本身仍然是同步且不阻塞的。
//!
//! 注意：订阅者列表只在订阅/退订时修改；投递前对列表做快照并在锁外回调，
//! 因此处理器内部再次 `dispatch` 或退订不会死锁。
//!
use crate::action::{Action, ActionRef, IntoActions};
use crate::kind::ActionKinds;
use futures_core::Stream;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

static GLOBAL: Lazy<Actions> = Lazy::new(Actions::new);

type Callback = Arc<dyn Fn(&ActionRef) + Send + Sync>;

enum Sink {
    Callback(Callback),
    Stream(mpsc::UnboundedSender<ActionRef>),
}

struct Subscriber {
    id: u64,
    kinds: ActionKinds,
    sink: Sink,
    /// 作用域：被取消后该订阅立即失效
    scope: Option<CancellationToken>,
    closed: AtomicBool,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && !self.scope.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// 投递一个动作；返回 false 表示该订阅者已不可用
    fn deliver(&self, action: &ActionRef) -> bool {
        match &self.sink {
            Sink::Callback(f) => {
                f(action);
                true
            }
            Sink::Stream(tx) => tx.send(action.clone()).is_ok(),
        }
    }
}

struct ChannelInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Arc<Subscriber>>>,
}

impl ChannelInner {
    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|s| s.id != id);
    }

    fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| s.is_live());
        subscribers.clone()
    }
}

/// 动作通道句柄，克隆开销很小（内部为 `Arc`）
#[derive(Clone)]
pub struct Actions {
    inner: Arc<ChannelInner>,
}

impl Default for Actions {
    fn default() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Actions {
    /// 创建一个独立的通道
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级通道
    pub fn global() -> &'static Actions {
        &GLOBAL
    }

    /// 分发单个动作
    pub fn dispatch(&self, action: impl Into<ActionRef>) {
        self.dispatch_one(&action.into());
    }

    /// 按顺序分发一个或多个动作
    pub fn dispatch_all(&self, actions: impl IntoActions) {
        for action in actions.into_actions() {
            self.dispatch_one(&action);
        }
    }

    fn dispatch_one(&self, action: &ActionRef) {
        let mut delivered = 0usize;
        for subscriber in self.inner.snapshot() {
            // 快照之后可能已被退订/销毁，逐个复查
            if !subscriber.is_live() || !subscriber.kinds.matches(action) {
                continue;
            }
            if subscriber.deliver(action) {
                delivered += 1;
            } else {
                subscriber.closed.store(true, Ordering::Release);
            }
        }
        tracing::trace!(action = action.kind().name(), delivered, "action dispatched");
    }

    /// 即时回调订阅
    pub fn subscribe<F>(&self, kinds: ActionKinds, callback: F) -> Subscription
    where
        F: Fn(&ActionRef) + Send + Sync + 'static,
    {
        self.register(kinds, Sink::Callback(Arc::new(callback)), None)
    }

    /// 按具体类型订阅，回调拿到已向下转型的引用
    pub fn subscribe_to<A, F>(&self, callback: F) -> Subscription
    where
        A: Action,
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe(ActionKinds::of::<A>(), move |action| {
            if let Some(action) = action.downcast_ref::<A>() {
                callback(action);
            }
        })
    }

    /// 受 `scope` 约束的即时订阅：`scope` 被取消后不再收到任何通知
    pub fn subscribe_until<F>(
        &self,
        kinds: ActionKinds,
        scope: CancellationToken,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&ActionRef) + Send + Sync + 'static,
    {
        self.register(kinds, Sink::Callback(Arc::new(callback)), Some(scope))
    }

    /// 过滤后的动作流，只接收本次调用之后分发的动作
    pub fn on_action(&self, kinds: ActionKinds) -> ActionStream {
        self.stream(kinds, None)
    }

    pub(crate) fn on_action_until(
        &self,
        kinds: ActionKinds,
        scope: CancellationToken,
    ) -> ActionStream {
        self.stream(kinds, Some(scope))
    }

    fn stream(&self, kinds: ActionKinds, scope: Option<CancellationToken>) -> ActionStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.register(kinds, Sink::Stream(tx), scope);
        ActionStream {
            inner: UnboundedReceiverStream::new(rx),
            subscription,
        }
    }

    fn register(
        &self,
        kinds: ActionKinds,
        sink: Sink,
        scope: Option<CancellationToken>,
    ) -> Subscription {
        let subscriber = Arc::new(Subscriber {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            kinds,
            sink,
            scope,
            closed: AtomicBool::new(false),
        });
        self.inner.subscribers.lock().push(subscriber.clone());
        Subscription {
            subscriber,
            channel: Arc::downgrade(&self.inner),
        }
    }

    /// 当前仍然有效的订阅数
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.is_live())
            .count()
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// 订阅句柄：`drop` 时自动退订
pub struct Subscription {
    subscriber: Arc<Subscriber>,
    channel: Weak<ChannelInner>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if self.subscriber.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(channel) = self.channel.upgrade() {
            channel.remove(self.subscriber.id);
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.subscriber.is_live()
    }

    pub fn kinds(&self) -> &ActionKinds {
        &self.subscriber.kinds
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.subscriber.id)
            .field("kinds", &self.subscriber.kinds)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 按具体类型收窄后的动作流
pub type TypedActionStream<A> = BoxStream<'static, Arc<A>>;

/// 过滤后的动作流（无限、不可重启）；`drop` 时退订
pub struct ActionStream {
    inner: UnboundedReceiverStream<ActionRef>,
    subscription: Subscription,
}

impl ActionStream {
    /// 收窄为具体类型 `A`，无法转型的动作被跳过
    pub fn typed<A: Action>(self) -> TypedActionStream<A> {
        self.filter_map(|action| futures_util::future::ready(action.downcast::<A>()))
            .boxed()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Stream for ActionStream {
    type Item = ActionRef;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for ActionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionStream")
            .field("subscription", &self.subscription)
            .finish()
    }
}
