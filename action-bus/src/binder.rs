//! 生命周期绑定器（ActionBinder）
//!
//! 在宿主实例构造期间调用一次 [`ActionBinder::bind`]：
//! 1. 校验宿主类别；
//! 2. 校验实例未销毁、正处于构造期、且尚未绑定过；
//! 3. 取出注册表中已合并（继承 + 覆写）的绑定表，有流式绑定时确认 tokio 运行时可用，
//!    之后才翻转一次性初始化标记；
//! 4. 即时绑定：订阅通道，订阅作用域为实例的销毁信号，接收者以 `Weak` 持有；
//! 5. 流式绑定：取得过滤后的动作流，调用一次处理器，把输出流经失败隔离后
//!    交给 tokio 任务驱动，任务与销毁信号 `select!`。
//!
use crate::channel::Actions;
use crate::config::BinderConfig;
use crate::containment::{Attribution, contain};
use crate::error::{ActionError, ActionResult};
use crate::host::ActionHost;
use crate::lifecycle::Lifecycle;
use crate::registry::HandlerRegistry;
use bon::Builder;
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::Instrument;

static DEFAULT_BINDER: Lazy<ActionBinder> = Lazy::new(ActionBinder::default);

/// 把宿主类型的处理器绑定到实例生命周期
#[derive(Builder, Clone, Debug)]
pub struct ActionBinder {
    #[builder(default = Actions::global().clone())]
    actions: Actions,
    #[builder(default)]
    config: BinderConfig,
}

impl Default for ActionBinder {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ActionBinder {
    pub fn new(actions: Actions, config: BinderConfig) -> Self {
        Self { actions, config }
    }

    /// 进程级默认绑定器：全局通道 + 默认配置
    pub fn global() -> &'static ActionBinder {
        &DEFAULT_BINDER
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// 绑定 `host` 的全部处理器，作用域为 `lifecycle` 的销毁信号
    pub fn bind<H: ActionHost>(&self, host: &Arc<H>, lifecycle: &Lifecycle) -> ActionResult<()> {
        let name = H::host_name();

        let kind = H::host_kind();
        if !self.config.supports(kind) {
            return Err(ActionError::UnsupportedHost {
                host: name,
                kind,
                supported: self.config.supported_list(),
            });
        }
        if lifecycle.is_destroyed() {
            return Err(ActionError::Destroyed { host: name });
        }
        if !lifecycle.is_constructing() {
            return Err(ActionError::OutsideConstructor { host: name });
        }
        if lifecycle.is_initialized() {
            return Err(ActionError::AlreadyInitialized { host: name });
        }

        let bindings = HandlerRegistry::global().bindings::<H>()?;
        let runtime = match bindings.streams().first() {
            Some(first) => Some(Handle::try_current().map_err(|_| ActionError::NoRuntime {
                host: name,
                method: first.method(),
            })?),
            None => None,
        };

        // 前置校验全部通过后才翻转标记；失败的绑定不改变状态
        if !lifecycle.mark_initialized() {
            return Err(ActionError::AlreadyInitialized { host: name });
        }

        let scope = lifecycle.scope();

        for binding in bindings.immediate() {
            let receiver = Arc::downgrade(host);
            let callback = binding.callback();
            let subscription =
                self.actions
                    .subscribe_until(binding.kinds().clone(), scope.clone(), move |action| {
                        if let Some(host) = receiver.upgrade() {
                            callback(&*host, action);
                        }
                    });
            lifecycle.retain_subscription(subscription);
        }

        if let Some(runtime) = runtime {
            for binding in bindings.streams() {
                let actions = self
                    .actions
                    .on_action_until(binding.kinds().clone(), scope.clone());
                let output = binding.call(host, actions);
                let attribution = Attribution {
                    host: name,
                    kinds: binding.kinds().clone(),
                    method: binding.method(),
                };
                let mut driven = contain(output, attribution, self.config.catch_panics);

                let token = scope.clone();
                let driver = runtime.spawn(
                    async move {
                        loop {
                            tokio::select! {
                                biased;
                                _ = token.cancelled() => break,
                                next = driven.next() => {
                                    if next.is_none() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    .in_current_span(),
                );
                lifecycle.retain_driver(driver);
            }
        }

        tracing::debug!(
            host = name,
            instance = %lifecycle.id(),
            immediate = bindings.immediate().len(),
            streams = bindings.streams().len(),
            "action handlers bound"
        );
        Ok(())
    }
}

/// 用全局通道与默认配置绑定处理器
pub fn init_action_handlers<H: ActionHost>(
    host: &Arc<H>,
    lifecycle: &Lifecycle,
) -> ActionResult<()> {
    ActionBinder::global().bind(host, lifecycle)
}
