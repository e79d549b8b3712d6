//! 动作类型标识（ActionKind）与非空 kind 集合（ActionKinds）
//!
//! - `ActionKind`：以 `TypeId` 比较/哈希，用作过滤条件与处理器元信息的键；
//! - `ActionKinds`：有序、去重、非空；多个 kind 之间是逻辑“或”。
//!
use crate::action::ActionRef;
use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 一类动作的标识
///
/// 既可以是具体动作类型，也可以是仅用作父级 kind 的标记类型。
#[derive(Clone, Copy)]
pub struct ActionKind {
    id: TypeId,
    name: &'static str,
}

impl ActionKind {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `action` 是否是该 kind 的实例：具体类型相同，或动作声明了该父级 kind
    pub fn matches(&self, action: &ActionRef) -> bool {
        action.kind().id == self.id || action.is_a(self)
    }
}

impl PartialEq for ActionKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActionKind {}

impl Hash for ActionKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 非空、有序、去重的 kind 集合
#[derive(Clone, PartialEq, Eq)]
pub struct ActionKinds {
    kinds: Arc<[ActionKind]>,
}

impl ActionKinds {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::one(ActionKind::of::<T>())
    }

    pub fn one(kind: ActionKind) -> Self {
        Self {
            kinds: Arc::from([kind]),
        }
    }

    /// 至少一个 kind：`first` 必填，其余可选
    pub fn new(first: ActionKind, rest: impl IntoIterator<Item = ActionKind>) -> Self {
        let mut kinds = vec![first];
        for kind in rest {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Self {
            kinds: kinds.into(),
        }
    }

    /// 从任意迭代器构建；为空时返回 `None`
    pub fn try_new(kinds: impl IntoIterator<Item = ActionKind>) -> Option<Self> {
        let mut iter = kinds.into_iter();
        let first = iter.next()?;
        Some(Self::new(first, iter))
    }

    /// 逻辑“或”：任一 kind 匹配即可
    pub fn matches(&self, action: &ActionRef) -> bool {
        self.kinds.iter().any(|kind| kind.matches(action))
    }

    pub fn contains(&self, kind: &ActionKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionKind> {
        self.kinds.iter()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// 恒为 false
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl From<ActionKind> for ActionKinds {
    fn from(kind: ActionKind) -> Self {
        Self::one(kind)
    }
}

impl fmt::Debug for ActionKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds.iter()).finish()
    }
}

impl fmt::Display for ActionKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.kinds.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.name())?;
        }
        Ok(())
    }
}

/// 按类型列表构建 [`ActionKinds`]：`kinds![Saved, Deleted]`
#[macro_export]
macro_rules! kinds {
    ($first:ty $(, $rest:ty)* $(,)?) => {
        $crate::kind::ActionKinds::new(
            $crate::kind::ActionKind::of::<$first>(),
            [$($crate::kind::ActionKind::of::<$rest>()),*],
        )
    };
}
