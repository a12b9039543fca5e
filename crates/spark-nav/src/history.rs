//! # HistoryBridge：宿主历史栈适配层
//!
//! ## 核心意图（Why）
//! - 宿主的可导航历史栈被视为一个不透明的事务日志：转换引擎只向其追加/替换条目，
//!   并通过回退通知获知宿主侧已经发生的移动；
//! - [`HistoryStack`] 定义宿主需要实现的最小接口，测试中以记录调用的假实现替代。
//!
//! ## 行为契约（What）
//! - 条目状态为 [`HistoryState`]，以 JSON 形式交给宿主保存；
//! - 地址由启动时的路径与查询串加上 `#路由ID[/后缀]` 组成，查询串原样保留；
//! - 回退通知携带的状态缺失或损坏时，桥接层从当前地址恢复，并替换掉损坏的条目。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    params::RouteParams,
    route::ActiveRoute,
    url::{self, Address, InitialRoute},
};

/// 宿主历史栈接口。
pub trait HistoryStack: Send + Sync + 'static {
    /// 追加新条目。
    fn push_entry(&self, state: Option<Value>, title: &str, address: &str);

    /// 替换当前条目；`address` 为 `None` 时保留宿主当前地址。
    fn replace_entry(&self, state: Option<Value>, title: &str, address: Option<&str>);

    /// 请求宿主后退一步。
    fn go_back(&self);

    /// 宿主当前地址（路径 + 查询串 + 片段）。
    fn current_address(&self) -> String;
}

/// 写入历史条目的状态载荷。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub route_id: Option<String>,
    #[serde(default)]
    pub params: Option<RouteParams>,
}

impl HistoryState {
    pub fn for_route(active: &ActiveRoute) -> Self {
        Self {
            route_id: Some(active.id().to_owned()),
            params: Some(active.params().clone()),
        }
    }

    /// 解码宿主交回的状态；结构不符时返回 `None`，由调用方走地址恢复路径。
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value::<HistoryState>(value.clone()) {
            Ok(state) => Some(state),
            Err(err) => {
                debug!(error = %err, "history entry carries an unrecognised state");
                None
            }
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// 转换引擎与宿主历史栈之间的桥。
pub struct HistoryBridge {
    host: Arc<dyn HistoryStack>,
    /// 启动时的地址，路径与查询串在后续写入中保持不变。
    origin: Address,
    keep_query: bool,
}

impl HistoryBridge {
    /// 以宿主当前地址（或显式覆盖）建立桥接。
    pub fn new(host: Arc<dyn HistoryStack>, initial_address: Option<&str>, keep_query: bool) -> Self {
        let address = initial_address
            .map(str::to_owned)
            .unwrap_or_else(|| host.current_address());
        Self {
            host,
            origin: Address::parse(&address),
            keep_query,
        }
    }

    /// 启动时读取的地址中的片段路由。
    pub fn initial_route(&self) -> Option<InitialRoute> {
        self.origin
            .fragment
            .as_deref()
            .and_then(|fragment| url::parse_initial(&format!("{}{fragment}", url::FRAGMENT_MARKER)))
    }

    /// 解析宿主“此刻”的地址。
    pub fn current_route(&self) -> Option<InitialRoute> {
        url::parse_initial(&self.host.current_address())
    }

    /// 某一激活状态对应的地址。
    pub fn address_for(&self, active: &ActiveRoute) -> String {
        let suffix = active.route().url_suffix(active.params());
        self.origin
            .with_route(active.id(), suffix.as_deref(), self.keep_query)
    }

    /// 为提交后的状态追加历史条目。
    pub fn record(&self, active: Option<&ActiveRoute>) {
        match active {
            Some(active) => {
                let address = self.address_for(active);
                debug!(route_id = active.id(), %address, "pushing history entry");
                self.host.push_entry(
                    Some(HistoryState::for_route(active).to_value()),
                    active.route().name(),
                    &address,
                );
            }
            None => {
                let address = self.origin.without_fragment(self.keep_query);
                debug!(%address, "pushing empty history entry");
                self.host.push_entry(None, "", &address);
            }
        }
    }

    /// 以修正后的载荷替换宿主当前条目，地址保持不变。
    pub fn repair(&self, state: &HistoryState, title: &str) {
        self.host.replace_entry(Some(state.to_value()), title, None);
    }

    /// 清空当前条目的状态与片段地址。
    pub fn clear(&self) {
        let address = self.origin.without_fragment(self.keep_query);
        self.host.replace_entry(None, "", Some(&address));
    }

    /// 启动时把宿主当前条目的状态置空，地址不变。
    pub fn reset_entry(&self) {
        self.host.replace_entry(None, "", None);
    }

    pub fn go_back(&self) {
        self.host.go_back();
    }
}

impl std::fmt::Debug for HistoryBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryBridge")
            .field("origin", &self.origin)
            .field("keep_query", &self.keep_query)
            .finish_non_exhaustive()
    }
}
