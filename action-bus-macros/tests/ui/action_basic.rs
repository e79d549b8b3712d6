use action_bus::{Action, ActionKind, ActionRef};
use action_bus_macros::action;

#[action]
struct Saved {
    id: u32,
}

#[action]
#[derive(Clone, PartialEq)]
enum Toggled {
    On,
    Off,
}

#[action(debug = false)]
struct Secret(String);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(..)")
    }
}

fn main() {
    let saved = ActionRef::new(Saved { id: 1 });
    assert!(saved.is::<Saved>());
    assert_eq!(format!("{saved:?}"), "Saved { id: 1 }");

    let toggled = Toggled::On;
    assert_eq!(toggled.clone(), Toggled::On);
    assert_ne!(Toggled::Off, Toggled::On);
    assert!(!toggled.is_a(&ActionKind::of::<Saved>()));

    // 使用手写 Debug，可编译则说明未自动派生 Debug
    assert_eq!(format!("{:?}", ActionRef::new(Secret("pin".into()))), "Secret(..)");
}
