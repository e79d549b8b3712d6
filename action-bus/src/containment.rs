//! 流式处理器的失败隔离
//!
//! 处理器流失败（`Err` 或 panic）时：记录一条 `error` 日志（宿主名、动作 kind、方法名），
//! 然后仅结束该处理器自己的流。通道、其他处理器与宿主实例不受影响。
//!
use crate::error::HandlerError;
use crate::kind::ActionKinds;
use crate::registry::HandlerStream;
use futures_core::stream::BoxStream;
use futures_util::{FutureExt, StreamExt, stream};
use std::any::Any;
use std::panic::AssertUnwindSafe;

/// 失败归属：出错的是哪个宿主的哪个处理器
#[derive(Clone, Debug)]
pub struct Attribution {
    pub host: &'static str,
    pub kinds: ActionKinds,
    pub method: &'static str,
}

impl Attribution {
    fn report(&self, err: &HandlerError) {
        let error = format!("{err:#}");
        tracing::error!(
            host = self.host,
            actions = %self.kinds,
            method = self.method,
            error = %error,
            "action handler stream failed"
        );
    }

    fn report_panic(&self, payload: &(dyn Any + Send)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::error!(
            host = self.host,
            actions = %self.kinds,
            method = self.method,
            panic = %message,
            "action handler stream panicked"
        );
    }
}

/// 包装处理器流：正常元素原样放行，首个失败被记录并结束该流
pub fn contain(
    handler: HandlerStream,
    attribution: Attribution,
    catch_panics: bool,
) -> BoxStream<'static, ()> {
    stream::unfold((handler, attribution), move |(mut handler, attribution)| async move {
        let next = if catch_panics {
            match AssertUnwindSafe(handler.next()).catch_unwind().await {
                Ok(next) => next,
                Err(payload) => {
                    attribution.report_panic(payload.as_ref());
                    return None;
                }
            }
        } else {
            handler.next().await
        };

        match next? {
            Ok(()) => Some(((), (handler, attribution))),
            Err(err) => {
                attribution.report(&err);
                None
            }
        }
    })
    .boxed()
}
