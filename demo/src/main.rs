use action_bus::prelude::*;
use action_bus::BinderConfig;
use action_bus_host::{Container, Fixture, HostContext, HostError, HostResult, Managed};
use action_bus_macros::action;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 购物车内容变化
struct CartChanged;

#[action(extends(CartChanged))]
struct AddItem {
    sku: &'static str,
    qty: u32,
}

#[action(extends(CartChanged))]
struct RemoveItem {
    sku: &'static str,
}

#[action]
struct Checkout;

#[action]
struct CheckoutSucceeded {
    order_id: u64,
    items: u32,
}

#[action]
struct CheckoutFailed {
    reason: String,
}

#[derive(Debug, thiserror::Error)]
enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("payment declined for {items} items")]
    Declined { items: u32 },
}

// ---------- 服务 ----------

#[derive(Default)]
struct CartStore {
    items: Mutex<BTreeMap<&'static str, u32>>,
}

impl CartStore {
    fn add(&self, action: &AddItem) {
        *self.items.lock().entry(action.sku).or_default() += action.qty;
    }

    fn remove(&self, action: &RemoveItem) {
        self.items.lock().remove(action.sku);
    }

    fn clear(&self, _: &CheckoutSucceeded) {
        self.items.lock().clear();
    }

    fn total(&self) -> u32 {
        self.items.lock().values().sum()
    }
}

impl ActionHost for CartStore {
    fn host_kind() -> HostKind {
        HostKind::Service
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers
            .on::<AddItem>("add", Self::add)
            .on::<RemoveItem>("remove", Self::remove)
            .on::<CheckoutSucceeded>("clear", Self::clear);
        Ok(())
    }
}

impl Managed for CartStore {
    fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>> {
        let store = Arc::new(CartStore::default());
        ctx.init_action_handlers(&store)?;
        Ok(store)
    }
}

struct CheckoutEffects {
    actions: Actions,
    store: Arc<CartStore>,
}

impl CheckoutEffects {
    async fn pay(items: u32, order_id: u64) -> Result<u64, CheckoutError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        match items {
            0 => Err(CheckoutError::EmptyCart),
            n if n > 10 => Err(CheckoutError::Declined { items: n }),
            _ => Ok(order_id),
        }
    }
}

impl ActionHost for CheckoutEffects {
    fn host_kind() -> HostKind {
        HostKind::Service
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers.on_stream::<Checkout, _>("checkout", |effects: &CheckoutEffects, checkouts| {
            let actions = effects.actions.clone();
            let store = effects.store.clone();
            checkouts.enumerate().then(move |(order, _)| {
                let actions = actions.clone();
                let items = store.total();
                async move {
                    futures_util::stream::once(Self::pay(items, order as u64 + 1))
                        .dispatch_on_success(&actions, move |order_id| CheckoutSucceeded {
                            order_id: *order_id,
                            items,
                        })
                        .dispatch_on_error(&actions, |err| CheckoutFailed {
                            reason: err.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .await;
                }
            })
        });
        Ok(())
    }
}

impl Managed for CheckoutEffects {
    fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>> {
        let effects = Arc::new(CheckoutEffects {
            actions: ctx.actions().clone(),
            store: ctx.get::<CartStore>()?,
        });
        ctx.init_action_handlers(&effects)?;
        Ok(effects)
    }
}

// ---------- 组件 ----------

#[derive(Default)]
struct CartBadge {
    changes: Mutex<u32>,
}

impl ActionHost for CartBadge {
    fn host_kind() -> HostKind {
        HostKind::Component
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers.on_any(
            "refresh",
            [ActionKind::of::<CartChanged>()],
            |badge: &CartBadge, action: &ActionRef| {
                let mut changes = badge.changes.lock();
                *changes += 1;
                println!("badge: change #{changes} ({action:?})");
            },
        )?;
        Ok(())
    }
}

impl Managed for CartBadge {
    fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>> {
        let badge = Arc::new(CartBadge::default());
        ctx.init_action_handlers(&badge)?;
        Ok(badge)
    }

    fn on_destroy(&self) {
        println!("badge: destroyed after {} changes", self.changes.lock());
    }
}

fn load_config() -> anyhow::Result<BinderConfig> {
    match std::env::var("ACTION_BUS_CONFIG") {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(_) => Ok(BinderConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,action_bus=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let binder = ActionBinder::new(Actions::new(), load_config()?);
    let actions = binder.actions().clone();
    let container = Container::with_binder(binder.clone());
    let store = container.provide::<CartStore>()?;
    container.provide::<CheckoutEffects>()?;

    let mut outcomes = actions.on_action(kinds![CheckoutSucceeded, CheckoutFailed]);

    let badge = Fixture::<CartBadge>::with_binder(&binder)?;
    actions.dispatch(AddItem { sku: "apple", qty: 3 });
    actions.dispatch(AddItem { sku: "pear", qty: 2 });
    actions.dispatch(RemoveItem { sku: "apple" });
    println!("cart total: {}", store.total());

    actions.dispatch(Checkout);
    if let Some(outcome) = outcomes.next().await {
        println!("outcome: {outcome:?}");
    }

    badge.destroy();
    actions.dispatch(AddItem { sku: "melon", qty: 11 });
    actions.dispatch(Checkout);
    if let Some(outcome) = outcomes.next().await {
        println!("outcome: {outcome:?}");
    }

    // 宿主类别校验：管道不允许绑定处理器
    match Fixture::<PricePipe>::with_binder(&binder) {
        Err(HostError::Action(err)) => println!("rejected: {err}"),
        other => println!("unexpected: {other:?}"),
    }

    container.destroy();
    Ok(())
}

#[derive(Debug)]
struct PricePipe;

impl ActionHost for PricePipe {
    fn host_kind() -> HostKind {
        HostKind::Pipe
    }

    fn declare_handlers(_: &mut HandlerBindings<Self>) -> ActionResult<()> {
        Ok(())
    }
}

impl Managed for PricePipe {
    fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>> {
        let pipe = Arc::new(PricePipe);
        ctx.init_action_handlers(&pipe)?;
        Ok(pipe)
    }
}
