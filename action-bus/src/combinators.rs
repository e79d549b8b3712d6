//! 流组合子：把结果流中的成功/失败映射为动作并分发
//!
use crate::action::IntoActions;
use crate::channel::Actions;
use futures_core::Stream;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use futures_util::TryStreamExt;
use futures_util::future::ready;

/// 为所有 `Stream<Item = Result<T, E>>` 提供分发组合子
pub trait DispatchStreamExt<T, E>: Stream<Item = Result<T, E>> + Sized + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// 每个成功值都映射为动作并分发，值本身原样放行
    fn dispatch_on_success<F, R>(
        self,
        actions: &Actions,
        mut f: F,
    ) -> BoxStream<'static, Result<T, E>>
    where
        F: FnMut(&T) -> R + Send + 'static,
        R: IntoActions,
    {
        let actions = actions.clone();
        self.inspect_ok(move |value| actions.dispatch_all(f(value)))
            .boxed()
    }

    /// 失败时把错误映射为动作并分发，然后吞掉错误、结束流
    fn dispatch_on_error<F, R>(
        self,
        actions: &Actions,
        mut f: F,
    ) -> BoxStream<'static, Result<T, E>>
    where
        F: FnMut(&E) -> R + Send + 'static,
        R: IntoActions,
    {
        let actions = actions.clone();
        self.map(move |item| match item {
            Ok(value) => Some(value),
            Err(err) => {
                actions.dispatch_all(f(&err));
                None
            }
        })
        .take_while(|item| ready(item.is_some()))
        .filter_map(|item| ready(item.map(Ok)))
        .boxed()
    }

    /// 首个错误处静默结束，不分发任何动作
    fn ignore_errors(self) -> BoxStream<'static, Result<T, E>> {
        self.map(Result::ok)
            .take_while(|item| ready(item.is_some()))
            .filter_map(|item| ready(item.map(Ok)))
            .boxed()
    }
}

impl<S, T, E> DispatchStreamExt<T, E> for S
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
}
