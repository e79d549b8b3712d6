use action_bus::prelude::*;
use action_bus_macros::action;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[action]
struct Increment {
    by: u32,
}

#[action]
struct Reset;

#[derive(Default)]
struct CounterComponent {
    value: AtomicU32,
}

impl CounterComponent {
    fn new(lifecycle: &Lifecycle) -> ActionResult<Arc<Self>> {
        let component = Arc::new(CounterComponent::default());
        let _guard = lifecycle.enter_construction();
        init_action_handlers(&component, lifecycle)?;
        Ok(component)
    }

    fn on_increment(&self, action: &Increment) {
        let value = self.value.fetch_add(action.by, Ordering::SeqCst) + action.by;
        println!("Increment: by={}, value={}", action.by, value);
    }

    fn on_reset(&self, _: &Reset) {
        self.value.store(0, Ordering::SeqCst);
        println!("Reset");
    }
}

impl ActionHost for CounterComponent {
    fn host_kind() -> HostKind {
        HostKind::Component
    }

    fn declare_handlers(handlers: &mut HandlerBindings<Self>) -> ActionResult<()> {
        handlers
            .on::<Increment>("on_increment", Self::on_increment)
            .on::<Reset>("on_reset", Self::on_reset);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let lifecycle = Lifecycle::new();
    let counter = CounterComponent::new(&lifecycle)?;

    let actions = Actions::global();
    actions.dispatch(Increment { by: 2 });
    actions.dispatch_all(vec![Increment { by: 3 }, Increment { by: 5 }]);
    actions.dispatch(Reset);

    lifecycle.destroy();
    // 已销毁：不再处理
    actions.dispatch(Increment { by: 100 });

    println!("final value={}", counter.value.load(Ordering::SeqCst));
    Ok(())
}
