//! # Navigator：路由转换引擎
//!
//! ## 核心意图（Why）
//! - 对任意一次路由变更请求给出唯一判定：空操作、需守卫确认、回落到默认路由、
//!   与宿主历史栈对账（包括并非由引擎发起的回退事件）；
//! - 注册表、当前路由与历史桥均为引擎实例自有的状态，不存在全局单例，测试中可并存多个引擎。
//!
//! ## 转换流程（How）
//! 1. **解析**：未给出路由 ID 时替换为默认路由；都没有则解析为空路由；
//! 2. **空操作判定**：与当前路由 ID 相同且参数浅比较相等时立即返回，不触发守卫、初始化、历史与通知；
//! 3. **空路由快速路径**：直接提交 `None`；
//! 4. **守卫阶段**：当前路由声明了离开守卫、未强制且参数未要求绕过时等待守卫；否决时放弃本次转换，
//!    若请求来自回退通知，则补写一条恢复当前路由的历史条目；
//! 5. **初始化阶段**：静态参数垫底、调用方参数覆盖，等待目标路由的 `set_state`；
//! 6. **提交**：整体替换当前路由，按需写入历史，随后发出 `set` 通知。
//!
//! ## 并发模型（What）
//! - 单个逻辑线程上协作调度，挂起点只有守卫与初始化两处；锁从不跨越 `.await` 持有；
//! - 每个请求持有单调递增的令牌，只有最新令牌能提交；被取代的请求返回 [`NavError::Superseded`]，
//!   即“最后发起者胜出”，而不是“最后完成者胜出”；
//! - 令牌在目标路由解析成功后才分配：指向未注册路由的请求不会取代进行中的转换，
//!   而进入守卫阶段后被否决的请求仍会取代此前的转换。

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::NavigatorConfig,
    error::NavError,
    event::{NoopSink, RouteChange, RouteEvent, RouteEventSink},
    history::{HistoryBridge, HistoryStack, HistoryState},
    params::RouteParams,
    registry::RouteRegistry,
    route::{ActiveRoute, RouteDefinition},
    transition::{PendingTransition, TransitionPhase, TransitionTracker},
    url::{self, InitialRoute},
};

/// 转换结果：`None` 表示当前无激活路由。
pub type RouteResult = Result<Option<Arc<ActiveRoute>>, NavError>;

/// 未给出路由 ID 时使用的默认路由。
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultRoute {
    pub route_id: String,
    pub params: RouteParams,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum TransitionOrigin {
    #[default]
    Caller,
    /// 宿主历史栈已先行移动。
    HistoryPop,
}

/// 一次路由变更请求。
#[derive(Clone, Debug)]
pub struct RouteRequest {
    route_id: Option<String>,
    params: Option<RouteParams>,
    record_history: bool,
    force: bool,
    origin: TransitionOrigin,
}

impl Default for RouteRequest {
    fn default() -> Self {
        Self {
            route_id: None,
            params: None,
            record_history: true,
            force: false,
            origin: TransitionOrigin::Caller,
        }
    }
}

impl RouteRequest {
    /// 指向 `route_id` 的请求。
    pub fn to<S: Into<String>>(route_id: S) -> Self {
        Self {
            route_id: Some(route_id.into()),
            ..Self::default()
        }
    }

    /// 不指定路由 ID 的请求，解析为默认路由或空路由。
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = Some(params);
        self
    }

    /// 以任意 JSON 值作为参数；`null` 视为未给出参数，其余非对象值返回 [`NavError::InvalidParams`]。
    pub fn with_params_value(mut self, value: Value) -> Result<Self, NavError> {
        self.params = match value {
            Value::Null => None,
            other => Some(RouteParams::from_value(other)?),
        };
        Ok(self)
    }

    /// 不写入历史栈。
    pub fn without_history(mut self) -> Self {
        self.record_history = false;
        self
    }

    pub fn record_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// 忽略当前路由的离开守卫。
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    fn from_history(route_id: Option<String>, params: Option<RouteParams>) -> Self {
        Self {
            route_id,
            params,
            record_history: false,
            force: false,
            origin: TransitionOrigin::HistoryPop,
        }
    }
}

#[derive(Debug, Default)]
struct RouterState {
    current: Option<Arc<ActiveRoute>>,
    previous: Option<Arc<ActiveRoute>>,
    default: Option<DefaultRoute>,
    /// 启动地址指向、但尚未注册的路由。
    deep_link: Option<InitialRoute>,
    transitions: TransitionTracker,
}

/// 构造 [`Navigator`]。
pub struct NavigatorBuilder {
    history: Arc<dyn HistoryStack>,
    config: NavigatorConfig,
    events: Arc<dyn RouteEventSink>,
}

impl NavigatorBuilder {
    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn events(mut self, events: Arc<dyn RouteEventSink>) -> Self {
        self.events = events;
        self
    }

    /// 校验配置，置空宿主当前条目的状态，并解析启动地址。
    pub fn build(self) -> Result<Navigator, NavError> {
        self.config.validate()?;

        let history = HistoryBridge::new(
            self.history,
            self.config.initial_address.as_deref(),
            self.config.preserve_query,
        );
        history.reset_entry();
        let deep_link = history
            .initial_route()
            .filter(|initial| !initial.route_id.is_empty());
        if let Some(initial) = &deep_link {
            debug!(route_id = %initial.route_id, "startup address names a route");
        }

        Ok(Navigator {
            config: self.config,
            registry: RwLock::new(RouteRegistry::new()),
            state: Mutex::new(RouterState {
                deep_link,
                ..RouterState::default()
            }),
            history,
            events: self.events,
        })
    }
}

/// 路由管理器。
pub struct Navigator {
    config: NavigatorConfig,
    registry: RwLock<RouteRegistry>,
    state: Mutex<RouterState>,
    history: HistoryBridge,
    events: Arc<dyn RouteEventSink>,
}

impl Navigator {
    pub fn builder(history: Arc<dyn HistoryStack>) -> NavigatorBuilder {
        NavigatorBuilder {
            history,
            config: NavigatorConfig::default(),
            events: Arc::new(NoopSink),
        }
    }

    // ----------------------------------------------------------------------
    // 注册表
    // ----------------------------------------------------------------------

    /// 注册路由并广播 `add` 事件。
    ///
    /// 重复 ID 在任何副作用之前返回 [`NavError::DuplicateRoute`]。若启动地址恰好指向该路由，
    /// 以其 `parse_url` 解析出的参数激活它；激活失败只记录日志。
    pub async fn add_route(&self, route: RouteDefinition) -> Result<Arc<RouteDefinition>, NavError> {
        let (stored, event) = self.registry.write().add(route)?;
        self.events.emit(event);

        let deep_link = {
            let mut state = self.state.lock();
            if state
                .deep_link
                .as_ref()
                .is_some_and(|initial| initial.route_id == stored.id())
            {
                state.deep_link.take()
            } else {
                None
            }
        };

        if let Some(initial) = deep_link {
            let params = stored.parse_url(&initial.raw_segments).unwrap_or_default();
            let request = RouteRequest::to(stored.id()).with_params(params);
            if let Err(err) = self.set_route(request).await {
                warn!(route_id = stored.id(), error = %err, code = err.code(), "deep link activation failed");
            }
        }

        Ok(stored)
    }

    /// 移除路由并广播 `remove` 事件；不影响当前激活路由。
    pub fn remove_route(&self, route_id: &str) -> Option<Arc<RouteDefinition>> {
        let (removed, event) = self.registry.write().remove(route_id)?;
        self.events.emit(event);
        Some(removed)
    }

    pub fn route(&self, route_id: &str) -> Option<Arc<RouteDefinition>> {
        self.registry.read().get(route_id)
    }

    /// 全部路由，按 ID 排序。
    pub fn routes(&self) -> Vec<Arc<RouteDefinition>> {
        self.registry.read().iter().cloned().collect()
    }

    pub fn is_descendant(&self, descendant_id: Option<&str>, ancestor_id: Option<&str>) -> bool {
        self.registry.read().is_descendant(descendant_id, ancestor_id)
    }

    /// 由近及远的祖先链，父链成环时返回 [`NavError::CyclicParent`]。
    pub fn ancestors(&self, route_id: &str) -> Result<Vec<Arc<RouteDefinition>>, NavError> {
        self.registry.read().ancestors(route_id)
    }

    // ----------------------------------------------------------------------
    // 状态读取
    // ----------------------------------------------------------------------

    pub fn current(&self) -> Option<Arc<ActiveRoute>> {
        self.state.lock().current.clone()
    }

    pub fn previous(&self) -> Option<Arc<ActiveRoute>> {
        self.state.lock().previous.clone()
    }

    pub fn default_route(&self) -> Option<DefaultRoute> {
        self.state.lock().default.clone()
    }

    /// 正处于守卫或初始化阶段的最新请求。
    pub fn pending(&self) -> Option<PendingTransition> {
        self.state.lock().transitions.in_flight().cloned()
    }

    pub fn phase(&self) -> TransitionPhase {
        self.state.lock().transitions.phase()
    }

    // ----------------------------------------------------------------------
    // 转换
    // ----------------------------------------------------------------------

    /// 设置默认路由。
    ///
    /// `route_id` 未注册时返回 [`NavError::DefaultRouteMissing`]。若此时没有激活路由、
    /// 也没有待激活的启动地址，立即激活默认路由且不写历史。
    pub async fn set_default(&self, route_id: &str, params: RouteParams) -> RouteResult {
        if self.route(route_id).is_none() {
            return Err(NavError::DefaultRouteMissing {
                route_id: route_id.to_owned(),
            });
        }

        let activate = {
            let mut state = self.state.lock();
            state.default = Some(DefaultRoute {
                route_id: route_id.to_owned(),
                params: params.clone(),
            });
            state.current.is_none() && state.deep_link.is_none()
        };

        if activate {
            self.set_route(RouteRequest::to(route_id).with_params(params).without_history())
                .await
        } else {
            Ok(self.current())
        }
    }

    /// 执行一次路由变更。
    pub async fn set_route(&self, request: RouteRequest) -> RouteResult {
        let RouteRequest {
            route_id,
            params,
            record_history,
            force,
            origin,
        } = request;

        let (route_id, params) = match route_id.filter(|id| !id.is_empty()) {
            Some(id) => (Some(id), params.unwrap_or_default()),
            None => match self.default_route() {
                Some(default) => (Some(default.route_id), default.params),
                None => (None, RouteParams::new()),
            },
        };

        // 提交后的参数已合并静态参数，这里与调用方给出的原始参数比较；
        // 声明了静态参数的路由因此不会被判定为空操作。
        let (mut pending, original, route) = {
            let mut state = self.state.lock();
            if is_current(state.current.as_ref(), route_id.as_deref(), &params) {
                state.transitions.begin(route_id.as_deref());
                debug!(route_id = ?route_id, "route already active");
                return Ok(state.current.clone());
            }
            // 目标不存在的请求不分配令牌，不会取代进行中的转换。
            let route = match route_id.as_deref() {
                Some(id) => Some(self.route(id).ok_or_else(|| NavError::RouteNotFound {
                    route_id: id.to_owned(),
                })?),
                None => None,
            };
            let pending = state.transitions.begin(route_id.as_deref());
            (pending, state.current.clone(), route)
        };

        let Some(route) = route else {
            pending.advance(TransitionPhase::Committed)?;
            return self.commit(&pending, None, record_history);
        };
        let route_id = route.id().to_owned();

        let bypass = force || params.is_truthy(&self.config.guard_bypass_param);
        if let Some(leaving) = original
            .as_ref()
            .filter(|active| !bypass && active.route().has_unload_guard())
        {
            pending.advance(TransitionPhase::Guarding)?;
            self.track(&pending);

            let verdict = leaving.route().run_before_unload().await;
            match verdict {
                Ok(true) => {}
                Ok(false) => {
                    self.settle(&mut pending);
                    debug!(from = leaving.id(), to = %route_id, "transition vetoed by unload guard");
                    if origin == TransitionOrigin::HistoryPop {
                        self.restore_history_entry(&pending);
                    }
                    return Ok(original);
                }
                Err(source) => {
                    self.settle(&mut pending);
                    return Err(NavError::GuardRejected {
                        route_id: leaving.id().to_owned(),
                        source,
                    });
                }
            }
        }

        let merged = params.merged_over(route.static_params());
        pending.advance(TransitionPhase::Initializing)?;
        self.track(&pending);

        if let Err(source) = route.run_set_state(merged.clone()).await {
            self.settle(&mut pending);
            return Err(NavError::InitializerRejected { route_id, source });
        }

        pending.advance(TransitionPhase::Committed)?;
        self.commit(&pending, Some(ActiveRoute::new(route, merged)), record_history)
    }

    /// 以相同参数切换到当前路由的父路由；无激活路由或无父路由时原样返回当前路由。
    pub async fn set_parent(&self, record_history: bool) -> RouteResult {
        let Some(active) = self.current() else {
            return Ok(None);
        };
        let Some(parent_id) = active.route().parent_id() else {
            return Ok(Some(active));
        };

        let request = RouteRequest::to(parent_id)
            .with_params(active.params().clone())
            .record_history(record_history);
        self.set_route(request).await
    }

    /// 以不变的参数重新执行当前路由的 `set_state`；不写历史、不发通知。
    ///
    /// 返回 `Ok(false)` 表示当前没有激活路由。
    pub async fn reload(&self) -> Result<bool, NavError> {
        let Some(active) = self.current() else {
            return Ok(false);
        };

        active
            .route()
            .run_set_state(active.params().clone())
            .await
            .map_err(|source| NavError::InitializerRejected {
                route_id: active.id().to_owned(),
                source,
            })?;
        Ok(true)
    }

    /// 重新读取宿主地址并激活其指向的路由；路由尚未注册时记为待激活的启动地址。
    pub async fn reset_route(&self) -> RouteResult {
        let Some(initial) = self
            .history
            .current_route()
            .filter(|initial| !initial.route_id.is_empty())
        else {
            return Ok(self.current());
        };

        let Some(route) = self.route(&initial.route_id) else {
            self.state.lock().deep_link = Some(initial);
            return Ok(self.current());
        };

        let params = route.parse_url(&initial.raw_segments).unwrap_or_default();
        self.set_route(RouteRequest::to(route.id()).with_params(params))
            .await
    }

    /// 请求宿主后退一步，结果通过 [`Self::handle_pop_state`] 回流。
    pub fn go_back(&self) {
        self.history.go_back();
    }

    /// 对路径段逐一编码并以 `/` 拼接，供 `get_url` 回调生成地址后缀。
    pub fn create_url<I, S>(&self, parts: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        url::build_address(parts)
    }

    // ----------------------------------------------------------------------
    // 回退通知
    // ----------------------------------------------------------------------

    /// 处理宿主的回退/前进通知。
    ///
    /// - 载荷可解码时直接以其 `(route_id, params)` 发起不写历史的转换；
    /// - 载荷缺失或无法识别时，从宿主当前地址恢复，并以修正后的载荷替换该条目；
    /// - 转换失败不会向外传播：记录告警后清空地址并重置路由。
    pub async fn handle_pop_state(&self, state: Option<Value>) -> Option<Arc<ActiveRoute>> {
        let decoded = state.as_ref().and_then(HistoryState::from_value);
        let (route_id, params) = match decoded {
            Some(HistoryState { route_id, params }) => (route_id, params),
            None => self.recover_from_address(),
        };

        match self
            .set_route(RouteRequest::from_history(route_id.clone(), params))
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_superseded() => {
                debug!(route_id = ?route_id, "back navigation superseded by a newer request");
            }
            Err(err) => {
                warn!(
                    route_id = ?route_id,
                    error = %err,
                    code = err.code(),
                    "failed to navigate back, resetting to start route"
                );
                if self.config.reset_on_back_failure {
                    self.history.clear();
                    if let Err(err) = self.set_route(RouteRequest::empty().without_history()).await {
                        warn!(error = %err, code = err.code(), "reset after failed back navigation also failed");
                    }
                }
            }
        }

        self.current()
    }

    fn recover_from_address(&self) -> (Option<String>, Option<RouteParams>) {
        let Some(initial) = self.history.current_route() else {
            return (None, None);
        };
        let Some(route) = self.route(&initial.route_id) else {
            debug!(route_id = %initial.route_id, "address names an unknown route");
            return (None, None);
        };

        let params = route.parse_url(&initial.raw_segments);
        let repaired = HistoryState {
            route_id: Some(route.id().to_owned()),
            params: params.clone(),
        };
        self.history.repair(&repaired, route.name());
        (Some(route.id().to_owned()), params)
    }

    // ----------------------------------------------------------------------
    // 内部步骤
    // ----------------------------------------------------------------------

    fn track(&self, pending: &PendingTransition) {
        self.state.lock().transitions.record(pending);
    }

    /// 守卫否决或回调失败后回落到 `Idle`。
    fn settle(&self, pending: &mut PendingTransition) {
        if let Err(err) = pending.advance(TransitionPhase::Idle) {
            debug!(error = %err, "transition already settled");
        }
        self.track(pending);
    }

    /// 回退被否决时，历史栈已经移动，补写一条指向当前路由的条目。
    fn restore_history_entry(&self, pending: &PendingTransition) {
        let current = {
            let state = self.state.lock();
            if !state.transitions.is_latest(pending.token()) {
                return;
            }
            state.current.clone()
        };
        self.history.record(current.as_deref());
    }

    /// 整体替换当前路由，随后写历史并发出通知。
    fn commit(
        &self,
        pending: &PendingTransition,
        next: Option<ActiveRoute>,
        record_history: bool,
    ) -> RouteResult {
        let next = next.map(Arc::new);
        let previous = {
            let mut state = self.state.lock();
            if !state.transitions.is_latest(pending.token()) {
                debug!(
                    token = pending.token().get(),
                    target = ?pending.target(),
                    "discarding superseded transition"
                );
                return Err(NavError::Superseded {
                    route_id: pending.target().map(str::to_owned),
                });
            }
            state.transitions.record(pending);
            let previous = std::mem::replace(&mut state.current, next.clone());
            state.previous = previous.clone();
            previous
        };

        if record_history {
            self.history.record(next.as_deref());
        }
        info!(
            to = ?next.as_ref().map(|active| active.id()),
            from = ?previous.as_ref().map(|active| active.id()),
            "route committed"
        );
        self.events.emit(RouteEvent::Set(RouteChange {
            current: next.clone(),
            previous,
        }));
        Ok(next)
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self.registry.read().len();
        let current = self.current().map(|active| active.id().to_owned());
        f.debug_struct("Navigator")
            .field("config", &self.config)
            .field("routes", &routes)
            .field("current", &current)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

fn is_current(current: Option<&Arc<ActiveRoute>>, route_id: Option<&str>, params: &RouteParams) -> bool {
    match (current, route_id) {
        (None, None) => true,
        (Some(active), Some(route_id)) => active.matches(route_id, params),
        _ => false,
    }
}
