//! # RouteRegistry：路由定义仓储
//!
//! ## 行为契约（What）
//! - `add`：若 ID 已存在，返回 [`NavError::DuplicateRoute`]，否则存入并返回待广播的 [`RouteEvent::Added`]；
//! - `remove`：不存在时为空操作；存在时移除并返回 [`RouteEvent::Removed`]，不会触碰当前激活路由；
//! - `is_descendant`：沿 `parent_id` 向上遍历，步数以注册表大小为上界，父链成环时返回 `false`
//!   并记录告警，而不是无限循环。
//!
//! ## 风险提示（Trade-offs）
//! - 使用 `BTreeMap` 保持按 ID 排序的稳定迭代顺序，便于快照与测试。

use std::{collections::BTreeMap, sync::Arc};

use tracing::warn;

use crate::{error::NavError, event::RouteEvent, route::RouteDefinition};

#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<Arc<str>, Arc<RouteDefinition>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新路由。
    ///
    /// - **前置条件**：同一 ID 不应已存在；
    /// - **后置条件**：成功时返回共享的定义与对应的 `Added` 事件，事件由调用方负责广播。
    pub fn add(&mut self, route: RouteDefinition) -> Result<(Arc<RouteDefinition>, RouteEvent), NavError> {
        if self.routes.contains_key(route.id()) {
            return Err(NavError::DuplicateRoute {
                route_id: route.id().to_owned(),
            });
        }

        let route = Arc::new(route);
        self.routes.insert(Arc::clone(route.id_arc()), Arc::clone(&route));
        Ok((Arc::clone(&route), RouteEvent::Added(route)))
    }

    /// 移除路由，返回被移除的定义与待广播的 `Removed` 事件。
    pub fn remove(&mut self, route_id: &str) -> Option<(Arc<RouteDefinition>, RouteEvent)> {
        self.routes
            .remove(route_id)
            .map(|route| (Arc::clone(&route), RouteEvent::Removed(route)))
    }

    pub fn get(&self, route_id: &str) -> Option<Arc<RouteDefinition>> {
        self.routes.get(route_id).cloned()
    }

    pub fn contains(&self, route_id: &str) -> bool {
        self.routes.contains_key(route_id)
    }

    /// 按 ID 顺序迭代全部路由。
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RouteDefinition>> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 判断 `descendant_id` 是否为 `ancestor_id` 的后代。
    ///
    /// - `ancestor_id` 为 `None`（根）时恒为 `true`；
    /// - `descendant_id` 为 `None` 时恒为 `false`；
    /// - 路由并非自身的后代；父 ID 即使未注册也参与比较，但遍历在该处终止。
    pub fn is_descendant(&self, descendant_id: Option<&str>, ancestor_id: Option<&str>) -> bool {
        let Some(ancestor_id) = ancestor_id else {
            return true;
        };
        let Some(descendant_id) = descendant_id else {
            return false;
        };

        let mut cursor = self.routes.get(descendant_id);
        // 无环时父链长度不超过注册表大小。
        for _ in 0..=self.routes.len() {
            let Some(parent_id) = cursor.and_then(|route| route.parent_id()) else {
                return false;
            };
            if parent_id == ancestor_id {
                return true;
            }
            cursor = self.routes.get(parent_id);
        }

        warn!(
            route_id = descendant_id,
            ancestor_id, "parent chain is cyclic, treating as not a descendant"
        );
        false
    }

    /// 返回由近及远的祖先链（不含自身）。
    ///
    /// 链条在遇到未注册的父 ID 时终止；若父链重新访问到已见过的路由，返回 [`NavError::CyclicParent`]。
    pub fn ancestors(&self, route_id: &str) -> Result<Vec<Arc<RouteDefinition>>, NavError> {
        let mut chain: Vec<Arc<RouteDefinition>> = Vec::new();
        let mut cursor = self.routes.get(route_id);

        while let Some(parent_id) = cursor.and_then(|route| route.parent_id()) {
            if parent_id == route_id || chain.iter().any(|seen| seen.id() == parent_id) {
                return Err(NavError::CyclicParent {
                    route_id: route_id.to_owned(),
                });
            }
            let Some(parent) = self.routes.get(parent_id) else {
                break;
            };
            chain.push(Arc::clone(parent));
            cursor = Some(parent);
        }

        Ok(chain)
    }
}
