//! # 路由定义与激活状态
//!
//! ## 核心意图（Why）
//! - [`RouteDefinition`] 描述一条可寻址的应用状态：ID、父路由、展示元数据、静态参数，
//!   以及四类可选回调（状态初始化、离开守卫、地址解析、地址生成）；
//! - 回调以显式的可选字段保存，每类回调只有一个分派入口（`run_set_state`、`run_before_unload`、
//!   `parse_url`、`url_suffix`），转换引擎无需关心回调是否存在。
//!
//! ## 行为契约（What）
//! - 定义一经注册即不可变，注册表与转换引擎均以 `Arc<RouteDefinition>` 共享；
//! - UI 句柄（主体/侧栏/页眉/页脚）对路由核心完全不透明，仅原样保存。

use std::{any::Any, fmt, future::Future, sync::Arc};

use futures::future::{self, BoxFuture, FutureExt};

use crate::{error::CallbackError, params::RouteParams};

/// 路由激活前的异步状态初始化回调。
///
/// 闭包 `Fn(RouteParams) -> impl Future<Output = Result<(), CallbackError>>` 自动实现该 trait。
pub trait StateInitializer: Send + Sync + 'static {
    /// 以合并后的参数准备路由状态；返回错误将中止本次转换。
    fn set_state(&self, params: RouteParams) -> BoxFuture<'static, Result<(), CallbackError>>;
}

impl<F, Fut> StateInitializer for F
where
    F: Fn(RouteParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
{
    fn set_state(&self, params: RouteParams) -> BoxFuture<'static, Result<(), CallbackError>> {
        (self)(params).boxed()
    }
}

/// 离开当前路由前的异步确认守卫。
///
/// - 返回 `Ok(true)` 放行，`Ok(false)` 否决本次转换，`Err` 使转换整体失败。
pub trait UnloadGuard: Send + Sync + 'static {
    fn before_unload(&self) -> BoxFuture<'static, Result<bool, CallbackError>>;
}

impl<F, Fut> UnloadGuard for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, CallbackError>> + Send + 'static,
{
    fn before_unload(&self) -> BoxFuture<'static, Result<bool, CallbackError>> {
        (self)().boxed()
    }
}

/// 由原始地址段解析路由参数。
pub type ParseUrlFn = Arc<dyn Fn(&[String]) -> Option<RouteParams> + Send + Sync>;

/// 由参数生成地址后缀（追加在路由 ID 之后）。
pub type GetUrlFn = Arc<dyn Fn(&RouteParams) -> Option<String> + Send + Sync>;

/// 不透明 UI 句柄，路由核心从不解读其内容。
pub type UiHandle = Arc<dyn Any + Send + Sync>;

/// 路由定义。
///
/// # 教案式说明
/// - **契约 (What)**：`id` 以点号分层（如 `user.edit`），在注册表内唯一；`parent_id` 指向另一条路由；
///   `static_params` 在每次激活时作为底层默认值合并，调用方同名键优先；
/// - **设计 (How)**：提供 Builder 风格的 `with_*` 方法，避免构造时漏填字段。
#[derive(Clone)]
pub struct RouteDefinition {
    id: Arc<str>,
    name: String,
    parent_id: Option<Arc<str>>,
    icon: Option<String>,
    static_params: RouteParams,
    component: Option<UiHandle>,
    aside: Option<UiHandle>,
    header: Option<UiHandle>,
    footer: Option<UiHandle>,
    set_state: Option<Arc<dyn StateInitializer>>,
    on_before_unload: Option<Arc<dyn UnloadGuard>>,
    parse_url: Option<ParseUrlFn>,
    get_url: Option<GetUrlFn>,
}

impl RouteDefinition {
    /// 创建仅包含 ID 与展示名称的路由定义。
    pub fn new<I, N>(id: I, name: N) -> Self
    where
        I: Into<Arc<str>>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
            icon: None,
            static_params: RouteParams::new(),
            component: None,
            aside: None,
            header: None,
            footer: None,
            set_state: None,
            on_before_unload: None,
            parse_url: None,
            get_url: None,
        }
    }

    pub fn with_parent<P: Into<Arc<str>>>(mut self, parent_id: P) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_icon<S: Into<String>>(mut self, icon: S) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_static_params(mut self, params: RouteParams) -> Self {
        self.static_params = params;
        self
    }

    pub fn with_component(mut self, handle: UiHandle) -> Self {
        self.component = Some(handle);
        self
    }

    pub fn with_aside(mut self, handle: UiHandle) -> Self {
        self.aside = Some(handle);
        self
    }

    pub fn with_header(mut self, handle: UiHandle) -> Self {
        self.header = Some(handle);
        self
    }

    pub fn with_footer(mut self, handle: UiHandle) -> Self {
        self.footer = Some(handle);
        self
    }

    /// 挂载状态初始化回调。
    pub fn with_set_state<S: StateInitializer>(mut self, initializer: S) -> Self {
        self.set_state = Some(Arc::new(initializer));
        self
    }

    /// 挂载离开守卫。
    pub fn with_before_unload<G: UnloadGuard>(mut self, guard: G) -> Self {
        self.on_before_unload = Some(Arc::new(guard));
        self
    }

    pub fn with_parse_url<F>(mut self, parse: F) -> Self
    where
        F: Fn(&[String]) -> Option<RouteParams> + Send + Sync + 'static,
    {
        self.parse_url = Some(Arc::new(parse));
        self
    }

    pub fn with_get_url<F>(mut self, get_url: F) -> Self
    where
        F: Fn(&RouteParams) -> Option<String> + Send + Sync + 'static,
    {
        self.get_url = Some(Arc::new(get_url));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn id_arc(&self) -> &Arc<str> {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn static_params(&self) -> &RouteParams {
        &self.static_params
    }

    pub fn component(&self) -> Option<&UiHandle> {
        self.component.as_ref()
    }

    pub fn aside(&self) -> Option<&UiHandle> {
        self.aside.as_ref()
    }

    pub fn header(&self) -> Option<&UiHandle> {
        self.header.as_ref()
    }

    pub fn footer(&self) -> Option<&UiHandle> {
        self.footer.as_ref()
    }

    /// 是否声明了离开守卫。
    pub fn has_unload_guard(&self) -> bool {
        self.on_before_unload.is_some()
    }

    /// 执行状态初始化；未声明回调时立即成功。
    pub fn run_set_state(&self, params: RouteParams) -> BoxFuture<'static, Result<(), CallbackError>> {
        match &self.set_state {
            Some(initializer) => initializer.set_state(params),
            None => future::ready(Ok(())).boxed(),
        }
    }

    /// 执行离开守卫；未声明守卫时直接放行。
    pub fn run_before_unload(&self) -> BoxFuture<'static, Result<bool, CallbackError>> {
        match &self.on_before_unload {
            Some(guard) => guard.before_unload(),
            None => future::ready(Ok(true)).boxed(),
        }
    }

    /// 由原始地址段解析参数；未声明解析器或解析无结果时返回 `None`。
    pub fn parse_url(&self, raw_segments: &[String]) -> Option<RouteParams> {
        self.parse_url
            .as_ref()
            .and_then(|parse| parse(raw_segments))
    }

    /// 生成追加在路由 ID 之后的地址后缀，空串视为无后缀。
    pub fn url_suffix(&self, params: &RouteParams) -> Option<String> {
        self.get_url
            .as_ref()
            .and_then(|get_url| get_url(params))
            .filter(|suffix| !suffix.is_empty())
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent_id", &self.parent_id)
            .field("icon", &self.icon)
            .field("static_params", &self.static_params)
            .field("set_state", &self.set_state.is_some())
            .field("on_before_unload", &self.on_before_unload.is_some())
            .finish_non_exhaustive()
    }
}

/// 两条定义在可观察的数据字段上相等即视为相等；回调与 UI 句柄按指针比较。
impl PartialEq for RouteDefinition {
    fn eq(&self, other: &Self) -> bool {
        fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }

        self.id == other.id
            && self.name == other.name
            && self.parent_id == other.parent_id
            && self.icon == other.icon
            && self.static_params == other.static_params
            && same(&self.component, &other.component)
            && same(&self.aside, &other.aside)
            && same(&self.header, &other.header)
            && same(&self.footer, &other.footer)
            && same(&self.set_state, &other.set_state)
            && same(&self.on_before_unload, &other.on_before_unload)
            && same(&self.parse_url, &other.parse_url)
            && same(&self.get_url, &other.get_url)
    }
}

/// 当前激活的路由及其参数，整体替换、从不逐字段修改。
#[derive(Clone, Debug)]
pub struct ActiveRoute {
    route: Arc<RouteDefinition>,
    params: RouteParams,
}

impl ActiveRoute {
    pub fn new(route: Arc<RouteDefinition>, params: RouteParams) -> Self {
        Self { route, params }
    }

    pub fn route(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    pub fn id(&self) -> &str {
        self.route.id()
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// 是否与 `(route_id, params)` 指向同一激活状态。
    pub fn matches(&self, route_id: &str, params: &RouteParams) -> bool {
        self.route.id() == route_id && self.params.shallow_eq(params)
    }
}
