//! action-bus 的过程宏
//!
use proc_macro::TokenStream;

mod action;
mod utils;

/// 动作宏
/// - 为结构体/枚举实现 `::action_bus::action::Action`
/// - 合并/追加派生：Debug（可通过 `debug = false` 关闭，便于手写实现）
/// - 参数：`#[action(extends(Parent, ..), debug = true|false)]`
///   - `extends` 声明额外所属的父级 kind，生成 `Action::is_a`
#[proc_macro_attribute]
pub fn action(attr: TokenStream, item: TokenStream) -> TokenStream {
    action::expand(attr, item)
}
