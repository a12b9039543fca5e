//! # 路由事件与通知出口
//!
//! ## 核心意图（Why）
//! - 路由管理器只把事件交给外部事件总线，不关心订阅方如何处理；
//!   [`RouteEventSink`] 即该边界，投递同步、即发即忘。
//! - [`RouteListeners`] 是进程内的默认实现，支持按 [`ListenerId`] 订阅与退订。
//!
//! ## 行为契约（What）
//! - `Set` 事件只会在新状态提交之后发出；
//! - 监听器在锁外调用，回调中再次读取 `Navigator` 状态是安全的。

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::route::{ActiveRoute, RouteDefinition};

/// 事件名称，与外部事件总线约定的主题保持一致。
pub mod topics {
    pub const ADD: &str = "module.route.add";
    pub const REMOVE: &str = "module.route.remove";
    pub const SET: &str = "module.route.set";
}

/// 一次路由提交的前后状态。
#[derive(Clone, Debug)]
pub struct RouteChange {
    pub current: Option<Arc<ActiveRoute>>,
    pub previous: Option<Arc<ActiveRoute>>,
}

#[derive(Clone, Debug)]
pub enum RouteEvent {
    Added(Arc<RouteDefinition>),
    Removed(Arc<RouteDefinition>),
    Set(RouteChange),
}

impl RouteEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            RouteEvent::Added(_) => topics::ADD,
            RouteEvent::Removed(_) => topics::REMOVE,
            RouteEvent::Set(_) => topics::SET,
        }
    }
}

/// 外部事件总线边界。
pub trait RouteEventSink: Send + Sync + 'static {
    fn emit(&self, event: RouteEvent);
}

/// 丢弃全部事件。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl RouteEventSink for NoopSink {
    fn emit(&self, _event: RouteEvent) {}
}

/// 订阅句柄。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&RouteEvent) + Send + Sync>;

struct Subscription {
    id: ListenerId,
    /// `None` 表示订阅全部主题。
    topic: Option<&'static str>,
    handler: Listener,
}

/// 进程内监听器表。
#[derive(Default)]
pub struct RouteListeners {
    inner: Mutex<ListenerTable>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl RouteListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件；`topic` 为 `None` 时接收全部事件。
    pub fn on<F>(&self, topic: Option<&'static str>, handler: F) -> ListenerId
    where
        F: Fn(&RouteEvent) + Send + Sync + 'static,
    {
        let mut table = self.inner.lock();
        let id = ListenerId(table.next_id);
        table.next_id += 1;
        table.subscriptions.push(Subscription {
            id,
            topic,
            handler: Arc::new(handler),
        });
        id
    }

    /// 退订；返回是否确有订阅被移除。
    pub fn off(&self, id: ListenerId) -> bool {
        let mut table = self.inner.lock();
        let before = table.subscriptions.len();
        table.subscriptions.retain(|subscription| subscription.id != id);
        table.subscriptions.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RouteEventSink for RouteListeners {
    fn emit(&self, event: RouteEvent) {
        let topic = event.topic();
        let handlers: Vec<Listener> = self
            .inner
            .lock()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.topic.is_none_or(|wanted| wanted == topic))
            .map(|subscription| Arc::clone(&subscription.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }
}

impl fmt::Debug for RouteListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteListeners")
            .field("subscriptions", &self.len())
            .finish()
    }
}

impl<S: RouteEventSink + ?Sized> RouteEventSink for Arc<S> {
    fn emit(&self, event: RouteEvent) {
        (**self).emit(event);
    }
}
