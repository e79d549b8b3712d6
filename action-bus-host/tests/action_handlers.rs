use action_bus::prelude::*;
use action_bus_host::{Container, HostContext, HostResult, Managed};
use action_bus_macros::action;
use parking_lot::Mutex;
use std::sync::Arc;

#[action]
struct SyncAction;

#[action]
struct SyncAction2;

#[derive(Default)]
struct Spy {
    calls: Mutex<Vec<&'static str>>,
}

impl Spy {
    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }

    fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }
}

fn container() -> (Container, Arc<Spy>) {
    let binder = ActionBinder::builder().actions(Actions::new()).build();
    let container = Container::with_binder(binder);
    let spy = container.provide_value(Spy::default()).unwrap();
    (container, spy)
}

// 父类型声明 overwritten，子类型覆写它并声明自己的处理器；三种宿主类别各一份
macro_rules! host_suite {
    ($suite:ident, $kind:expr) => {
        mod $suite {
            use super::*;

            struct Parent {
                spy: Arc<Spy>,
            }

            impl ActionHost for Parent {
                fn host_kind() -> HostKind {
                    $kind
                }

                fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
                    handlers.on::<SyncAction>("overwritten", |p: &Parent, _: &SyncAction| {
                        p.spy.record("parent.overwritten")
                    });
                    Ok(())
                }
            }

            struct Child {
                parent: Parent,
                spy: Arc<Spy>,
            }

            impl ActionHost for Child {
                fn host_kind() -> HostKind {
                    $kind
                }

                fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
                    handlers
                        .inherit::<Parent>(|c: &Child| &c.parent)?
                        .on::<SyncAction>("sync", |c: &Child, _: &SyncAction| {
                            c.spy.record("child.sync")
                        })
                        .on_any(
                            "multiple",
                            kinds![SyncAction, SyncAction2].iter().copied(),
                            |c: &Child, _: &ActionRef| c.spy.record("child.multiple"),
                        )?
                        .on::<SyncAction>("overwritten", |c: &Child, _: &SyncAction| {
                            c.spy.record("child.overwritten")
                        });
                    Ok(())
                }
            }

            impl Managed for Child {
                fn create(ctx: &HostContext<'_>) -> HostResult<Arc<Self>> {
                    let spy = ctx.get::<Spy>()?;
                    let child = Arc::new(Child {
                        parent: Parent { spy: spy.clone() },
                        spy,
                    });
                    ctx.init_action_handlers(&child)?;
                    Ok(child)
                }
            }

            #[test]
            fn subscribes_to_declared_actions() {
                let (container, spy) = container();
                container.provide::<Child>().unwrap();

                container.binder().actions().dispatch(SyncAction);
                assert_eq!(spy.count("child.sync"), 1);
                assert_eq!(spy.count("child.multiple"), 1);

                container.binder().actions().dispatch(SyncAction2);
                assert_eq!(spy.count("child.sync"), 1);
                assert_eq!(spy.count("child.multiple"), 2);
            }

            #[test]
            fn child_handler_overrides_parent_handler() {
                let (container, spy) = container();
                container.provide::<Child>().unwrap();

                container.binder().actions().dispatch(SyncAction);
                assert_eq!(spy.count("parent.overwritten"), 0);
                assert_eq!(spy.count("child.overwritten"), 1);
            }

            #[test]
            fn unsubscribes_on_destroy() {
                let (container, spy) = container();
                container.provide::<Child>().unwrap();
                let actions = container.binder().actions().clone();

                actions.dispatch(SyncAction);
                container.destroy();
                actions.dispatch(SyncAction);
                actions.dispatch(SyncAction2);

                assert_eq!(spy.count("child.sync"), 1);
                assert_eq!(spy.count("child.multiple"), 1);
                assert_eq!(actions.subscriber_count(), 0);
            }
        }
    };
}

host_suite!(component, HostKind::Component);
host_suite!(directive, HostKind::Directive);
host_suite!(service, HostKind::Service);
