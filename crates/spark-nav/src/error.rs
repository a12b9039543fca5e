//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义路由管理器对外暴露的错误语义，区分调用方编程错误（重复注册、非法参数）
//!   与运行期失败（守卫/初始化回调拒绝、转换被更新的请求取代）；
//! - 每个变体都提供稳定错误码（[`NavError::code`]），便于宿主做日志聚合与告警。
//!
//! ## 设计要求（What）
//! - 所有错误类型实现 `std::error::Error`，`NavError` 通过 `thiserror` 派生；
//! - 路由回调的失败原因以 [`CallbackError`] 原样透传，不做二次包装信息的篡改。

use std::{borrow::Cow, error::Error as StdError, fmt, sync::Arc};

use thiserror::Error;

use crate::transition::TransitionPhase;

/// 路由回调（`set_state`、`on_before_unload`）返回的失败原因。
///
/// # 教案式说明
/// - **契约 (What)**：`message` 为人类可读描述；`source` 可选地携带底层错误，以 `Arc` 共享，
///   使 `CallbackError` 可以 `Clone` 并在多个观察者之间传递；
/// - **执行 (How)**：`Display` 仅输出 `message`，`source()` 暴露底层错误链。
#[derive(Clone)]
pub struct CallbackError {
    message: Cow<'static, str>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl CallbackError {
    /// 以描述文本构造回调错误。
    pub fn new<M>(message: M) -> Self
    where
        M: Into<Cow<'static, str>>,
    {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// 包装任意底层错误，描述文本取其 `Display` 输出。
    pub fn from_source<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: Cow::Owned(source.to_string()),
            source: Some(Arc::new(source)),
        }
    }

    /// 读取描述文本。
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }
}

impl fmt::Debug for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CallbackError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

impl PartialEq for CallbackError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

impl Eq for CallbackError {}

/// 路由管理器错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把注册期错误、转换期错误与配置错误聚合到单一枚举，
///   让 `Navigator` 的所有异步入口都可以直接 `?` 传播；
/// - **契约 (What)**：
///   - `DuplicateRoute` / `InvalidParams` 属于调用方编程错误，在任何状态变更前返回；
///   - `GuardRejected` / `InitializerRejected` 携带回调原始错误，返回时当前路由保证未被修改；
///   - `Superseded` 表示该请求在提交前已被更新的请求取代；
/// - **设计权衡 (Trade-offs)**：上下文以 `String` 保存，牺牲少量分配换取可读性。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NavError {
    /// 注册的路由 ID 已存在。
    #[error("a route with id `{route_id}` already exists")]
    DuplicateRoute { route_id: String },

    /// 路由参数不是键值映射。
    #[error("route params must be an object: {detail}")]
    InvalidParams { detail: String },

    /// 请求的路由 ID 未注册。
    #[error("route id `{route_id}` not found")]
    RouteNotFound { route_id: String },

    /// `set_default` 指向了未注册的路由。
    #[error("no route with id `{route_id}` exists to serve as default")]
    DefaultRouteMissing { route_id: String },

    /// 当前路由的离开守卫返回错误。
    #[error("unload guard of route `{route_id}` failed: {source}")]
    GuardRejected {
        route_id: String,
        #[source]
        source: CallbackError,
    },

    /// 目标路由的状态初始化回调返回错误。
    #[error("state initializer of route `{route_id}` failed: {source}")]
    InitializerRejected {
        route_id: String,
        #[source]
        source: CallbackError,
    },

    /// 父路由链出现环。
    #[error("parent chain of route `{route_id}` is cyclic")]
    CyclicParent { route_id: String },

    /// 转换在提交前被更新的请求取代。
    #[error("transition to {} was superseded by a newer request", display_target(.route_id))]
    Superseded { route_id: Option<String> },

    /// 转换阶段违反状态图。
    #[error("transition phase {from:?} -> {to:?} is not permitted")]
    InvalidPhaseTransition {
        from: TransitionPhase,
        to: TransitionPhase,
    },

    /// 配置无法解析。
    #[error("invalid navigator configuration: {detail}")]
    InvalidConfig { detail: String },
}

fn display_target(route_id: &Option<String>) -> String {
    match route_id {
        Some(id) => format!("`{id}`"),
        None => String::from("the empty route"),
    }
}

impl NavError {
    /// 稳定错误码，前缀统一为 `nav.`。
    pub fn code(&self) -> &'static str {
        match self {
            NavError::DuplicateRoute { .. } => "nav.route.duplicate",
            NavError::InvalidParams { .. } => "nav.params.invalid",
            NavError::RouteNotFound { .. } => "nav.route.missing",
            NavError::DefaultRouteMissing { .. } => "nav.default.missing",
            NavError::GuardRejected { .. } => "nav.guard.rejected",
            NavError::InitializerRejected { .. } => "nav.initializer.rejected",
            NavError::CyclicParent { .. } => "nav.route.cyclic_parent",
            NavError::Superseded { .. } => "nav.transition.superseded",
            NavError::InvalidPhaseTransition { .. } => "nav.transition.invalid_phase",
            NavError::InvalidConfig { .. } => "nav.config.invalid",
        }
    }

    /// 若错误源自路由回调，返回回调给出的原始错误。
    pub fn callback_error(&self) -> Option<&CallbackError> {
        match self {
            NavError::GuardRejected { source, .. } | NavError::InitializerRejected { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }

    /// 是否为“被更新请求取代”，回退导航据此区分真正的失败。
    pub fn is_superseded(&self) -> bool {
        matches!(self, NavError::Superseded { .. })
    }
}
