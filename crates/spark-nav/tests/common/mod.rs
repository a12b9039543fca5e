//! 集成测试共用的宿主替身。

#![allow(dead_code)]

use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::Mutex;
use serde_json::Value;
use spark_nav::{
    CallbackError, HistoryStack, Navigator, NavigatorConfig, RouteDefinition, RouteEvent,
    RouteListeners, RouteParams,
};

/// 宿主历史栈上发生的一次调用。
#[derive(Clone, Debug, PartialEq)]
pub enum HostCall {
    Push {
        state: Option<Value>,
        title: String,
        address: String,
    },
    Replace {
        state: Option<Value>,
        title: String,
        address: Option<String>,
    },
    Back,
}

/// 只记录调用、不维护真实栈的历史替身。
#[derive(Debug)]
pub struct FakeHost {
    address: Mutex<String>,
    calls: Mutex<Vec<HostCall>>,
}

impl FakeHost {
    pub fn at(address: &str) -> Arc<Self> {
        Arc::new(Self {
            address: Mutex::new(address.to_owned()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// 模拟用户在地址栏或历史中移动到 `address`。
    pub fn move_to(&self, address: &str) {
        *self.address.lock() = address.to_owned();
    }

    pub fn address(&self) -> String {
        self.address.lock().clone()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    /// 启动时的状态重置之后的调用。
    pub fn calls_after_startup(&self) -> Vec<HostCall> {
        self.calls.lock().iter().skip(1).cloned().collect()
    }

    pub fn pushes(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                HostCall::Push { address, .. } => Some(address.clone()),
                _ => None,
            })
            .collect()
    }
}

impl HistoryStack for FakeHost {
    fn push_entry(&self, state: Option<Value>, title: &str, address: &str) {
        *self.address.lock() = address.to_owned();
        self.calls.lock().push(HostCall::Push {
            state,
            title: title.to_owned(),
            address: address.to_owned(),
        });
    }

    fn replace_entry(&self, state: Option<Value>, title: &str, address: Option<&str>) {
        if let Some(address) = address {
            *self.address.lock() = address.to_owned();
        }
        self.calls.lock().push(HostCall::Replace {
            state,
            title: title.to_owned(),
            address: address.map(str::to_owned),
        });
    }

    fn go_back(&self) {
        self.calls.lock().push(HostCall::Back);
    }

    fn current_address(&self) -> String {
        self.address.lock().clone()
    }
}

/// 收集全部事件主题的监听器表。
pub fn recording_listeners() -> (Arc<RouteListeners>, Arc<Mutex<Vec<RouteEvent>>>) {
    let listeners = Arc::new(RouteListeners::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    listeners.on(None, move |event: &RouteEvent| sink.lock().push(event.clone()));
    (listeners, seen)
}

pub struct Harness {
    pub nav: Navigator,
    pub host: Arc<FakeHost>,
    pub events: Arc<Mutex<Vec<RouteEvent>>>,
}

impl Harness {
    pub fn new(address: &str) -> Self {
        Self::with_config(address, NavigatorConfig::default())
    }

    pub fn with_config(address: &str, config: NavigatorConfig) -> Self {
        let host = FakeHost::at(address);
        let (listeners, events) = recording_listeners();
        let nav = Navigator::builder(host.clone())
            .config(config)
            .events(listeners)
            .build()
            .expect("测试配置合法");
        Self { nav, host, events }
    }

    /// 已收到的事件主题。
    pub fn topics(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(RouteEvent::topic).collect()
    }

    pub fn set_events(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, RouteEvent::Set(_)))
            .count()
    }

    pub fn current_id(&self) -> Option<String> {
        self.nav.current().map(|active| active.id().to_owned())
    }
}

/// `set_state` 挂起直到返回的发送端被触发。
pub fn with_gated_initializer(route: RouteDefinition) -> (RouteDefinition, oneshot::Sender<()>) {
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let route = route.with_set_state(move |_params: RouteParams| {
        let gate = gate.lock().take();
        async move {
            if let Some(gate) = gate {
                gate.await.map_err(CallbackError::from_source)?;
            }
            Ok::<(), CallbackError>(())
        }
    });
    (route, release)
}

/// 离开守卫挂起直到发送端被触发，随后否决。
pub fn with_gated_veto(route: RouteDefinition) -> (RouteDefinition, oneshot::Sender<()>) {
    let (release, gate) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(gate)));
    let route = route.with_before_unload(move || {
        let gate = gate.lock().take();
        async move {
            if let Some(gate) = gate {
                gate.await.map_err(CallbackError::from_source)?;
            }
            Ok::<bool, CallbackError>(false)
        }
    });
    (route, release)
}
