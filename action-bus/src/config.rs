//! 绑定器配置
//!
use crate::host::HostKind;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// ActionBinder 的配置
#[derive(Builder, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// 允许绑定处理器的宿主类别
    #[builder(default = default_supported_hosts())]
    pub supported_hosts: Vec<HostKind>,
    /// 是否把流式处理器中的 panic 当作失败隔离
    #[builder(default = true)]
    pub catch_panics: bool,
}

fn default_supported_hosts() -> Vec<HostKind> {
    vec![HostKind::Component, HostKind::Directive, HostKind::Service]
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            supported_hosts: default_supported_hosts(),
            catch_panics: true,
        }
    }
}

impl BinderConfig {
    pub fn supports(&self, kind: HostKind) -> bool {
        self.supported_hosts.contains(&kind)
    }

    /// 形如 `component, directive, service`，用于错误信息
    pub(crate) fn supported_list(&self) -> String {
        self.supported_hosts
            .iter()
            .map(HostKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
