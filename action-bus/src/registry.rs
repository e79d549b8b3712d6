//! 处理器注册表（HandlerRegistry）
//!
//! 以宿主类型（TypeId）为键累积处理器绑定：
//! - [`HandlerBindings`]：一个宿主类型的两张有序绑定表（即时/流式）；
//! - 继承：[`HandlerBindings::inherit`] 复制祖先已合并的绑定表（写时复制，祖先不受影响），
//!   并通过投影函数把接收者从子类型映射到祖先；祖先从解析子类型的同一个注册表取得；
//! - 覆写：同一张表内方法名相同，后声明者生效（先移除旧绑定，再追加新绑定）；
//! - 注册表对每个宿主类型只调用一次 [`ActionHost::declare_handlers`]，结果缓存复用。
//!
use crate::action::{Action, ActionRef};
use crate::channel::{ActionStream, TypedActionStream};
use crate::error::{ActionError, ActionResult, HandlerError};
use crate::host::ActionHost;
use crate::kind::{ActionKind, ActionKinds};
use dashmap::DashMap;
use futures_core::Stream;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

static GLOBAL: Lazy<HandlerRegistry> = Lazy::new(HandlerRegistry::new);

/// 流式处理器返回的流（已擦除元素类型）
pub type HandlerStream = BoxStream<'static, Result<(), HandlerError>>;

type ImmediateFn<H> = Arc<dyn Fn(&H, &ActionRef) + Send + Sync>;
type StreamFn<H> = Arc<dyn Fn(&H, ActionStream) -> HandlerStream + Send + Sync>;

/// 流式处理器输出流的元素：`()` 或 `Result<T, E>`
pub trait HandlerOutput: Send + 'static {
    fn into_result(self) -> Result<(), HandlerError>;
}

impl HandlerOutput for () {
    fn into_result(self) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl<T, E> HandlerOutput for Result<T, E>
where
    T: Send + 'static,
    E: Into<HandlerError> + Send + 'static,
{
    fn into_result(self) -> Result<(), HandlerError> {
        self.map(|_| ()).map_err(Into::into)
    }
}

/// 即时处理器绑定：每个匹配动作调用一次回调
pub struct ImmediateBinding<H> {
    method: &'static str,
    kinds: ActionKinds,
    callback: ImmediateFn<H>,
}

impl<H> ImmediateBinding<H> {
    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn kinds(&self) -> &ActionKinds {
        &self.kinds
    }

    pub fn call(&self, host: &H, action: &ActionRef) {
        (self.callback)(host, action)
    }

    pub(crate) fn callback(&self) -> ImmediateFn<H> {
        self.callback.clone()
    }
}

impl<H> Clone for ImmediateBinding<H> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            kinds: self.kinds.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<H> fmt::Debug for ImmediateBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateBinding")
            .field("method", &self.method)
            .field("kinds", &self.kinds)
            .finish()
    }
}

/// 流式处理器绑定：绑定时调用一次回调，拿到过滤后的动作流并返回需要驱动的流
pub struct StreamBinding<H> {
    method: &'static str,
    kinds: ActionKinds,
    callback: StreamFn<H>,
}

impl<H> StreamBinding<H> {
    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn kinds(&self) -> &ActionKinds {
        &self.kinds
    }

    pub fn call(&self, host: &H, actions: ActionStream) -> HandlerStream {
        (self.callback)(host, actions)
    }
}

impl<H> Clone for StreamBinding<H> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            kinds: self.kinds.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<H> fmt::Debug for StreamBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBinding")
            .field("method", &self.method)
            .field("kinds", &self.kinds)
            .finish()
    }
}

trait Named {
    fn method(&self) -> &'static str;
}

impl<H> Named for ImmediateBinding<H> {
    fn method(&self) -> &'static str {
        self.method
    }
}

impl<H> Named for StreamBinding<H> {
    fn method(&self) -> &'static str {
        self.method
    }
}

/// 同名覆写：移除已有的同名绑定后追加
fn push_overriding<B: Named>(list: &mut Vec<B>, binding: B) {
    if let Some(index) = list.iter().position(|b| b.method() == binding.method()) {
        list.remove(index);
    }
    list.push(binding);
}

/// 一个宿主类型的处理器绑定表
pub struct HandlerBindings<H> {
    host: &'static str,
    immediate: Vec<ImmediateBinding<H>>,
    streams: Vec<StreamBinding<H>>,
    /// 声明期间解析祖先用的注册表；缓存前清空，避免循环引用
    registry: Option<HandlerRegistry>,
}

impl<H: 'static> HandlerBindings<H> {
    pub fn new() -> Self {
        Self {
            host: type_name::<H>(),
            immediate: Vec::new(),
            streams: Vec::new(),
            registry: None,
        }
    }

    fn declared_in(host: &'static str, registry: &HandlerRegistry) -> Self {
        Self {
            host,
            registry: Some(registry.clone()),
            ..Self::new()
        }
    }

    pub fn host(&self) -> &'static str {
        self.host
    }

    pub fn immediate(&self) -> &[ImmediateBinding<H>] {
        &self.immediate
    }

    pub fn streams(&self) -> &[StreamBinding<H>] {
        &self.streams
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.streams.is_empty()
    }

    /// 继承祖先 `P` 的全部绑定
    ///
    /// `project` 把子类型映射到其内嵌的祖先部分。应在声明自身处理器之前调用，
    /// 之后同名声明会覆写继承来的绑定。
    ///
    /// 祖先取自正在解析本类型的注册表；通过 [`HandlerBindings::new`] 单独创建的
    /// 绑定表则使用全局注册表。
    pub fn inherit<P: ActionHost>(
        &mut self,
        project: impl Fn(&H) -> &P + Send + Sync + 'static,
    ) -> ActionResult<&mut Self> {
        let parent = match &self.registry {
            Some(registry) => registry.bindings::<P>()?,
            None => HandlerRegistry::global().bindings::<P>()?,
        };
        self.inherit_from(&parent, project);
        Ok(self)
    }

    /// 从给定的祖先绑定表继承
    pub fn inherit_from<P, F>(&mut self, parent: &HandlerBindings<P>, project: F) -> &mut Self
    where
        P: 'static,
        F: Fn(&H) -> &P + Send + Sync + 'static,
    {
        let project = Arc::new(project);

        for binding in &parent.immediate {
            let parent_cb = binding.callback.clone();
            let project = project.clone();
            let callback: ImmediateFn<H> =
                Arc::new(move |host: &H, action: &ActionRef| parent_cb(project(host), action));
            push_overriding(
                &mut self.immediate,
                ImmediateBinding {
                    method: binding.method,
                    kinds: binding.kinds.clone(),
                    callback,
                },
            );
        }

        for binding in &parent.streams {
            let parent_cb = binding.callback.clone();
            let project = project.clone();
            let callback: StreamFn<H> =
                Arc::new(move |host: &H, actions: ActionStream| parent_cb(project(host), actions));
            push_overriding(
                &mut self.streams,
                StreamBinding {
                    method: binding.method,
                    kinds: binding.kinds.clone(),
                    callback,
                },
            );
        }

        self
    }

    /// 即时处理器：只处理具体类型 `A`
    pub fn on<A: Action>(
        &mut self,
        method: &'static str,
        callback: impl Fn(&H, &A) + Send + Sync + 'static,
    ) -> &mut Self {
        let callback: ImmediateFn<H> = Arc::new(move |host: &H, action: &ActionRef| {
            if let Some(action) = action.downcast_ref::<A>() {
                callback(host, action);
            }
        });
        self.push_immediate(method, ActionKinds::of::<A>(), callback)
    }

    /// 即时处理器：处理任一 kind（至少一个）
    pub fn on_any<I, F>(
        &mut self,
        method: &'static str,
        kinds: I,
        callback: F,
    ) -> ActionResult<&mut Self>
    where
        I: IntoIterator<Item = ActionKind>,
        F: Fn(&H, &ActionRef) + Send + Sync + 'static,
    {
        let kinds = self.require_kinds(method, kinds)?;
        Ok(self.push_immediate(method, kinds, Arc::new(callback)))
    }

    /// 流式处理器：只处理具体类型 `A`
    pub fn on_stream<A, S>(
        &mut self,
        method: &'static str,
        callback: impl Fn(&H, TypedActionStream<A>) -> S + Send + Sync + 'static,
    ) -> &mut Self
    where
        A: Action,
        S: Stream + Send + 'static,
        S::Item: HandlerOutput,
    {
        let callback: StreamFn<H> = Arc::new(move |host: &H, actions: ActionStream| {
            erase(callback(host, actions.typed::<A>()))
        });
        self.push_stream(method, ActionKinds::of::<A>(), callback)
    }

    /// 流式处理器：处理任一 kind（至少一个）
    pub fn on_stream_any<I, F, S>(
        &mut self,
        method: &'static str,
        kinds: I,
        callback: F,
    ) -> ActionResult<&mut Self>
    where
        I: IntoIterator<Item = ActionKind>,
        F: Fn(&H, ActionStream) -> S + Send + Sync + 'static,
        S: Stream + Send + 'static,
        S::Item: HandlerOutput,
    {
        let kinds = self.require_kinds(method, kinds)?;
        let callback: StreamFn<H> =
            Arc::new(move |host: &H, actions: ActionStream| erase(callback(host, actions)));
        Ok(self.push_stream(method, kinds, callback))
    }

    fn require_kinds<I>(&self, method: &'static str, kinds: I) -> ActionResult<ActionKinds>
    where
        I: IntoIterator<Item = ActionKind>,
    {
        ActionKinds::try_new(kinds).ok_or(ActionError::EmptyActionKinds {
            host: self.host,
            method,
        })
    }

    fn push_immediate(
        &mut self,
        method: &'static str,
        kinds: ActionKinds,
        callback: ImmediateFn<H>,
    ) -> &mut Self {
        push_overriding(
            &mut self.immediate,
            ImmediateBinding {
                method,
                kinds,
                callback,
            },
        );
        self
    }

    fn push_stream(
        &mut self,
        method: &'static str,
        kinds: ActionKinds,
        callback: StreamFn<H>,
    ) -> &mut Self {
        push_overriding(
            &mut self.streams,
            StreamBinding {
                method,
                kinds,
                callback,
            },
        );
        self
    }
}

impl<H: 'static> Default for HandlerBindings<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for HandlerBindings<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBindings")
            .field("host", &self.host)
            .field("immediate", &self.immediate)
            .field("streams", &self.streams)
            .finish()
    }
}

fn erase<S>(stream: S) -> HandlerStream
where
    S: Stream + Send + 'static,
    S::Item: HandlerOutput,
{
    stream.map(HandlerOutput::into_result).boxed()
}

/// 宿主类型 → 已合并的绑定表（克隆共享同一份缓存）
#[derive(Clone)]
pub struct HandlerRegistry {
    hosts: Arc<DashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            hosts: Arc::new(DashMap::new()),
        }
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级注册表
    pub fn global() -> &'static HandlerRegistry {
        &GLOBAL
    }

    /// 获取 `H` 的绑定表；首次访问时调用 `declare_handlers` 并缓存
    pub fn bindings<H: ActionHost>(&self) -> ActionResult<Arc<HandlerBindings<H>>> {
        let key = TypeId::of::<H>();

        // 先查缓存；declare_handlers 可能通过 inherit 递归访问注册表，不能在持有分片锁时调用
        let cached = self.hosts.get(&key).map(|entry| entry.value().1.clone());
        let erased = match cached {
            Some(erased) => erased,
            None => {
                let mut bindings = HandlerBindings::<H>::declared_in(H::host_name(), self);
                H::declare_handlers(&mut bindings)?;
                bindings.registry = None;
                tracing::trace!(
                    host = H::host_name(),
                    immediate = bindings.immediate.len(),
                    streams = bindings.streams.len(),
                    "action handlers registered"
                );
                let erased: Arc<dyn Any + Send + Sync> = Arc::new(bindings);
                self.hosts
                    .entry(key)
                    .or_insert((H::host_name(), erased))
                    .value()
                    .1
                    .clone()
            }
        };

        erased
            .downcast::<HandlerBindings<H>>()
            .map_err(|_| ActionError::TypeMismatch {
                expected: type_name::<HandlerBindings<H>>(),
                found: "unknown",
            })
    }

    pub fn is_registered<H: ActionHost>(&self) -> bool {
        self.hosts.contains_key(&TypeId::of::<H>())
    }

    /// 已注册的宿主类型名列表（只读视图）
    pub fn registered_hosts(&self) -> Vec<&'static str> {
        self.hosts.iter().map(|e| e.value().0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostKind;
    use crate::kinds;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Saved;
    impl Action for Saved {}

    #[derive(Debug)]
    struct Deleted;
    impl Action for Deleted {}

    #[derive(Default)]
    struct Base {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Base {
        fn overwritten(&self, _: &Saved) {
            self.calls.lock().push("base.overwritten");
        }
        fn inherited(&self, _: &Saved) {
            self.calls.lock().push("base.inherited");
        }
    }

    impl ActionHost for Base {
        fn host_kind() -> HostKind {
            HostKind::Directive
        }
        fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
            handlers
                .on::<Saved>("overwritten", Self::overwritten)
                .on::<Saved>("inherited", Self::inherited);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Child {
        base: Base,
        calls: Mutex<Vec<&'static str>>,
    }

    impl Child {
        fn overwritten(&self, _: &Saved) {
            self.calls.lock().push("child.overwritten");
        }
        fn own(&self, _: &ActionRef) {
            self.calls.lock().push("child.own");
        }
    }

    impl ActionHost for Child {
        fn host_kind() -> HostKind {
            HostKind::Component
        }
        fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
            handlers
                .inherit::<Base>(|child: &Child| &child.base)?
                .on::<Saved>("overwritten", Self::overwritten)
                .on_any("own", kinds![Saved, Deleted].iter().copied(), Self::own)?;
            Ok(())
        }
    }

    fn methods<H: 'static>(bindings: &HandlerBindings<H>) -> Vec<&'static str> {
        bindings.immediate().iter().map(|b| b.method()).collect()
    }

    #[test]
    fn override_keeps_one_binding_per_method() {
        let registry = HandlerRegistry::new();
        let bindings = registry.bindings::<Child>().unwrap();
        assert_eq!(methods(&bindings), vec!["inherited", "overwritten", "own"]);
    }

    #[test]
    fn overridden_callback_replaces_ancestor() {
        let registry = HandlerRegistry::new();
        let bindings = registry.bindings::<Child>().unwrap();
        let child = Child::default();
        let action = ActionRef::new(Saved);

        for binding in bindings.immediate() {
            if binding.kinds().matches(&action) {
                binding.call(&child, &action);
            }
        }

        assert_eq!(*child.base.calls.lock(), vec!["base.inherited"]);
        assert_eq!(*child.calls.lock(), vec!["child.overwritten", "child.own"]);
    }

    #[test]
    fn ancestor_list_is_not_mutated_by_descendant() {
        let registry = HandlerRegistry::new();
        let _ = registry.bindings::<Child>().unwrap();
        let base = registry.bindings::<Base>().unwrap();
        assert_eq!(methods(&base), vec!["overwritten", "inherited"]);
    }

    #[test]
    fn ancestor_resolves_through_the_same_registry() {
        let registry = HandlerRegistry::new();
        let _ = registry.bindings::<Child>().unwrap();

        assert!(registry.is_registered::<Base>());
        assert!(!HandlerRegistry::global().is_registered::<Base>());
        assert!(!HandlerRegistry::global().is_registered::<Child>());
    }

    #[test]
    fn empty_kinds_are_rejected_at_registration() {
        struct Broken;
        impl ActionHost for Broken {
            fn host_kind() -> HostKind {
                HostKind::Service
            }
            fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
                handlers.on_any(
                    "nothing",
                    Vec::<ActionKind>::new(),
                    |_: &Broken, _: &ActionRef| {},
                )?;
                Ok(())
            }
        }

        let registry = HandlerRegistry::new();
        let err = registry.bindings::<Broken>().unwrap_err();
        match err {
            ActionError::EmptyActionKinds { method, host } => {
                assert_eq!(method, "nothing");
                assert!(host.ends_with("Broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!registry.is_registered::<Broken>());
    }

    #[test]
    fn bindings_are_cached_per_host() {
        let registry = HandlerRegistry::new();
        let a = registry.bindings::<Child>().unwrap();
        let b = registry.bindings::<Child>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.is_registered::<Child>());
        assert!(
            registry
                .registered_hosts()
                .iter()
                .any(|name| name.ends_with("Child"))
        );
    }

    #[test]
    fn stream_bindings_override_by_name_separately() {
        let mut bindings = HandlerBindings::<Base>::new();
        bindings
            .on::<Saved>("save", |_: &Base, _: &Saved| {})
            .on_stream::<Saved, _>("save", |_: &Base, s| s.map(|_| ()))
            .on_stream::<Deleted, _>("save", |_: &Base, s| s.map(|_| ()));

        assert_eq!(bindings.immediate().len(), 1);
        assert_eq!(bindings.streams().len(), 1);
        assert!(bindings.streams()[0].kinds().contains(&ActionKind::of::<Deleted>()));
    }
}
