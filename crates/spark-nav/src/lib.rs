//! # spark-nav
//!
//! ## 定位与职责（Why）
//! - 单页应用中的客户端路由管理器：维护路由注册表，把“切换到某路由”的请求转化为一次受守卫、
//!   可异步初始化的状态转换，并与宿主的可导航历史栈保持同步；
//! - 宿主（浏览器壳、桌面壳或测试替身）只需实现 [`HistoryStack`]，即可获得前进/后退、
//!   深链接与地址恢复能力。
//!
//! ## 架构嵌入（Where）
//! - `route` / `params`：路由定义、回调契约与参数表；
//! - `registry`：路由仓储与父子关系查询；
//! - `transition` / `navigator`：阶段状态机与转换引擎；
//! - `history` / `url`：历史栈桥接与地址编解码；
//! - `event`：`add` / `remove` / `set` 三类通知的出口；
//! - `error` / `config`：稳定错误码与可选的 TOML 配置。
//!
//! ## Feature 策略（Trade-offs）
//! - `subscriber` 特性开启后提供 `observability::install_tracing`，默认关闭以免库替宿主做日志决策；
//! - 引擎本身与运行时无关，回调返回 `BoxFuture`，可由任意执行器驱动。

/// 路由管理器配置。
pub mod config;

/// 错误类型与稳定错误码。
///
/// - **契约定位 (What)**：使用 `thiserror::Error` 派生，每个变体都有 `nav.*` 形式的错误码；
/// - **风险提示 (Trade-offs)**：守卫否决不是错误，只有守卫自身失败才返回 `GuardRejected`。
pub mod error;

/// 路由事件与监听器表。
pub mod event;

/// 宿主历史栈适配层。
pub mod history;

/// 路由转换引擎。
///
/// - **意图说明 (Why)**：集中处理空操作判定、守卫、初始化、提交与回退对账；
/// - **扩展指引 (How)**：宿主通过 [`NavigatorBuilder`] 注入历史栈、事件出口与配置。
pub mod navigator;

#[cfg(feature = "subscriber")]
pub mod observability;

pub mod params;
pub mod registry;
pub mod route;
pub mod transition;
pub mod url;

pub use config::NavigatorConfig;
pub use error::{CallbackError, NavError};
pub use event::{ListenerId, NoopSink, RouteChange, RouteEvent, RouteEventSink, RouteListeners, topics};
pub use history::{HistoryBridge, HistoryStack, HistoryState};
pub use navigator::{DefaultRoute, Navigator, NavigatorBuilder, RouteRequest, RouteResult};
pub use params::RouteParams;
pub use registry::RouteRegistry;
pub use route::{ActiveRoute, RouteDefinition, StateInitializer, UiHandle, UnloadGuard};
pub use transition::{PendingTransition, RequestToken, TransitionPhase};
