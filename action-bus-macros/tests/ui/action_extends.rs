use action_bus::{ActionKind, ActionKinds, ActionRef};
use action_bus_macros::action;

/// 仅用作父级 kind
struct Persistence;
struct Audited;

#[action(extends(Persistence, Audited))]
struct Saved;

#[action(extends(Persistence))]
struct Deleted {
    #[allow(dead_code)]
    id: u64,
}

#[action]
struct Clicked;

fn main() {
    let persistence = ActionKinds::of::<Persistence>();
    assert!(persistence.matches(&ActionRef::new(Saved)));
    assert!(persistence.matches(&ActionRef::new(Deleted { id: 3 })));
    assert!(!persistence.matches(&ActionRef::new(Clicked)));

    let audited = ActionKind::of::<Audited>();
    assert!(audited.matches(&ActionRef::new(Saved)));
    assert!(!audited.matches(&ActionRef::new(Deleted { id: 4 })));
}
