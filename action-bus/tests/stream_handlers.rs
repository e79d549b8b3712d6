use action_bus::prelude::*;
use action_bus_macros::action;
use anyhow::anyhow;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

#[action]
struct Load {
    id: u32,
}

#[action]
struct Loaded {
    id: u32,
}

#[action]
struct LoadFailed {
    reason: String,
}

type Spy = Arc<Mutex<Vec<String>>>;

fn binder() -> ActionBinder {
    ActionBinder::builder().actions(Actions::new()).build()
}

fn construct<H: ActionHost>(
    binder: &ActionBinder,
    host: H,
) -> ActionResult<(Arc<H>, Lifecycle)> {
    let lifecycle = Lifecycle::new();
    let host = Arc::new(host);
    let _guard = lifecycle.enter_construction();
    binder.bind(&host, &lifecycle)?;
    Ok((host, lifecycle))
}

async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ---------- 失败隔离 ----------

struct Fragile {
    spy: Spy,
}

impl ActionHost for Fragile {
    fn host_kind() -> HostKind {
        HostKind::Component
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers
            .on_stream::<Load, _>("failing", |f: &Fragile, actions| {
                let spy = f.spy.clone();
                actions.map(move |load| {
                    spy.lock().push(format!("failing:{}", load.id));
                    Err::<(), _>(anyhow!("cannot load {}", load.id))
                })
            })
            .on_stream::<Load, _>("healthy", |f: &Fragile, actions| {
                let spy = f.spy.clone();
                actions.map(move |load| spy.lock().push(format!("healthy:{}", load.id)))
            })
            .on::<Load>("immediate", |f: &Fragile, load: &Load| {
                f.spy.lock().push(format!("immediate:{}", load.id))
            });
        Ok(())
    }
}

#[tokio::test]
#[traced_test]
async fn failing_stream_does_not_stop_siblings() {
    let binder = binder();
    let spy = Spy::default();
    let (_host, _lifecycle) = construct(&binder, Fragile { spy: spy.clone() }).unwrap();

    binder.actions().dispatch(Load { id: 1 });
    eventually(|| spy.lock().len() == 3).await;

    binder.actions().dispatch(Load { id: 2 });
    eventually(|| spy.lock().iter().any(|c| c == "healthy:2")).await;

    let calls = spy.lock().clone();
    assert!(calls.contains(&"immediate:2".to_string()));
    // 失败的处理器只处理了第一个动作
    assert!(!calls.contains(&"failing:2".to_string()));

    assert!(logs_contain("action handler stream failed"));
    assert!(logs_contain("Fragile"));
    assert!(logs_contain("failing"));
    assert!(logs_contain("cannot load 1"));
}

struct Explosive {
    spy: Spy,
}

impl ActionHost for Explosive {
    fn host_kind() -> HostKind {
        HostKind::Service
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers
            .on_stream::<Load, _>("explodes", |_: &Explosive, actions| {
                actions.map(|load| {
                    if load.id == 1 {
                        panic!("boom on {}", load.id);
                    }
                })
            })
            .on_stream::<Load, _>("survives", |e: &Explosive, actions| {
                let spy = e.spy.clone();
                actions.map(move |load| spy.lock().push(format!("survives:{}", load.id)))
            });
        Ok(())
    }
}

#[tokio::test]
#[traced_test]
async fn panicking_stream_is_contained() {
    let binder = binder();
    let spy = Spy::default();
    let (_host, _lifecycle) = construct(&binder, Explosive { spy: spy.clone() }).unwrap();

    binder.actions().dispatch(Load { id: 1 });
    binder.actions().dispatch(Load { id: 2 });

    eventually(|| spy.lock().len() == 2).await;
    eventually(|| logs_contain("action handler stream panicked")).await;
    assert!(logs_contain("boom on 1"));
}

// ---------- 生命周期 ----------

struct Counter {
    spy: Spy,
}

impl ActionHost for Counter {
    fn host_kind() -> HostKind {
        HostKind::Directive
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers.on_stream::<Load, _>("count", |c: &Counter, actions| {
            let spy = c.spy.clone();
            actions.map(move |load| spy.lock().push(format!("count:{}", load.id)))
        });
        Ok(())
    }
}

#[tokio::test]
async fn destroy_stops_the_driver() {
    let binder = binder();
    let spy = Spy::default();
    let (_host, lifecycle) = construct(&binder, Counter { spy: spy.clone() }).unwrap();

    binder.actions().dispatch(Load { id: 1 });
    eventually(|| spy.lock().len() == 1).await;

    lifecycle.destroy();
    lifecycle.join().await;
    binder.actions().dispatch(Load { id: 2 });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(*spy.lock(), vec!["count:1"]);
    assert_eq!(binder.actions().subscriber_count(), 0);
}

#[tokio::test]
async fn stream_sees_only_actions_after_binding() {
    let binder = binder();
    let spy = Spy::default();

    binder.actions().dispatch(Load { id: 0 });
    let (_host, _lifecycle) = construct(&binder, Counter { spy: spy.clone() }).unwrap();
    binder.actions().dispatch(Load { id: 1 });

    eventually(|| spy.lock().len() == 1).await;
    assert_eq!(*spy.lock(), vec!["count:1"]);
}

#[test]
fn stream_bindings_need_a_runtime() {
    let binder = binder();
    match construct(&binder, Counter { spy: Spy::default() }) {
        Err(ActionError::NoRuntime { host, method }) => {
            assert!(host.ends_with("Counter"));
            assert_eq!(method, "count");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("binding stream handlers without a runtime must fail"),
    }
}

// ---------- 副作用：处理结果再分发 ----------

struct Loader;

impl Loader {
    async fn fetch(id: u32) -> Result<u32, String> {
        tokio::time::sleep(Duration::from_millis(1)).await;
        if id % 2 == 0 {
            Ok(id * 10)
        } else {
            Err(format!("{id} is odd"))
        }
    }
}

struct LoaderEffects {
    actions: Actions,
}

impl ActionHost for LoaderEffects {
    fn host_kind() -> HostKind {
        HostKind::Service
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers.on_stream::<Load, _>("load", |effects: &LoaderEffects, loads| {
            let actions = effects.actions.clone();
            loads.then(move |load| {
                let actions = actions.clone();
                async move {
                    futures_util::stream::once(Loader::fetch(load.id))
                        .dispatch_on_success(&actions, |id| Loaded { id: *id })
                        .dispatch_on_error(&actions, |reason| LoadFailed {
                            reason: reason.clone(),
                        })
                        .collect::<Vec<_>>()
                        .await;
                }
            })
        });
        Ok(())
    }
}

#[tokio::test]
async fn effects_dispatch_results() {
    let binder = binder();
    let spy = Spy::default();
    let sink = spy.clone();
    let _subscription = binder
        .actions()
        .subscribe(kinds![Loaded, LoadFailed], move |action: &ActionRef| {
            sink.lock().push(format!("{action:?}"));
        });

    let (_host, _lifecycle) = construct(
        &binder,
        LoaderEffects {
            actions: binder.actions().clone(),
        },
    )
    .unwrap();

    binder.actions().dispatch(Load { id: 2 });
    eventually(|| spy.lock().len() == 1).await;
    binder.actions().dispatch(Load { id: 3 });
    eventually(|| spy.lock().len() == 2).await;

    assert_eq!(
        *spy.lock(),
        vec![
            "Loaded { id: 20 }".to_string(),
            r#"LoadFailed { reason: "3 is odd" }"#.to_string()
        ]
    );
}
