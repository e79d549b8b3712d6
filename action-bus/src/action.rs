//! 动作（Action）
//!
//! 动作是总线上分发的离散事件，除类型身份外不要求任何固定结构：
//! - 通道层以 [`ActionRef`] 类型擦除地传递；
//! - 仅在过滤边界（[`ActionKind`]）上按类型身份判断是否匹配。
//!
//! “抽象基类”语义通过 [`Action::is_a`] 声明额外所属的 kind 实现，
//! 通常由 `#[action(extends(..))]` 宏生成。
//!
use crate::kind::ActionKind;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// 可在总线上分发的动作
pub trait Action: Any + Send + Sync + fmt::Debug {
    /// 是否同时属于 `kind`（除自身具体类型之外的父级 kind）
    fn is_a(&self, kind: &ActionKind) -> bool {
        let _ = kind;
        false
    }
}

/// 已分发动作的共享句柄
///
/// 同一次分发的所有订阅者拿到的是同一个引用（见 [`ActionRef::ptr_eq`]）。
#[derive(Clone)]
pub struct ActionRef {
    action: Arc<dyn Action>,
    any: Arc<dyn Any + Send + Sync>,
    kind: ActionKind,
}

impl ActionRef {
    pub fn new<A: Action>(action: A) -> Self {
        Self::from_arc(Arc::new(action))
    }

    pub fn from_arc<A: Action>(action: Arc<A>) -> Self {
        Self {
            any: action.clone(),
            action,
            kind: ActionKind::of::<A>(),
        }
    }

    /// 具体类型对应的 kind
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn is<A: Action>(&self) -> bool {
        self.any.is::<A>()
    }

    pub fn downcast_ref<A: Action>(&self) -> Option<&A> {
        self.any.downcast_ref::<A>()
    }

    pub fn downcast<A: Action>(&self) -> Option<Arc<A>> {
        self.any.clone().downcast::<A>().ok()
    }

    /// 是否指向同一个动作实例
    pub fn ptr_eq(&self, other: &ActionRef) -> bool {
        Arc::ptr_eq(&self.any, &other.any)
    }

    pub fn as_action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

impl Deref for ActionRef {
    type Target = dyn Action;

    fn deref(&self) -> &Self::Target {
        self.action.as_ref()
    }
}

impl fmt::Debug for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.action.as_ref(), f)
    }
}

impl<A: Action> From<A> for ActionRef {
    fn from(action: A) -> Self {
        ActionRef::new(action)
    }
}

impl<A: Action> From<Arc<A>> for ActionRef {
    fn from(action: Arc<A>) -> Self {
        ActionRef::from_arc(action)
    }
}

/// “一个或多个动作”
///
/// `dispatch_all` 与组合子的回调返回值均接受该 trait。
pub trait IntoActions {
    fn into_actions(self) -> Vec<ActionRef>;
}

impl<A: Action> IntoActions for A {
    fn into_actions(self) -> Vec<ActionRef> {
        vec![ActionRef::new(self)]
    }
}

impl IntoActions for ActionRef {
    fn into_actions(self) -> Vec<ActionRef> {
        vec![self]
    }
}

impl<T: IntoActions> IntoActions for Vec<T> {
    fn into_actions(self) -> Vec<ActionRef> {
        self.into_iter().flat_map(IntoActions::into_actions).collect()
    }
}
