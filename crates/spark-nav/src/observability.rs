//! tracing 装配入口。
//!
//! 宿主调用一次 [`install_tracing`] 即可获得 `fmt + EnvFilter` 的全局 Subscriber；
//! 过滤规则读取 `RUST_LOG`，缺省为 `info`。

use std::fmt;

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// 安装阶段的失败原因。
#[derive(Debug)]
pub enum InstallError {
    /// 外部已设置全局 Subscriber。
    SubscriberAlreadySet,
    /// 设置全局 Subscriber 失败的底层错误。
    SetGlobalSubscriber(tracing::dispatcher::SetGlobalDefaultError),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::SubscriberAlreadySet => {
                f.write_str("a global tracing subscriber is already installed")
            }
            InstallError::SetGlobalSubscriber(err) => {
                write!(f, "failed to set the global tracing subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstallError::SubscriberAlreadySet => None,
            InstallError::SetGlobalSubscriber(err) => Some(err),
        }
    }
}

/// 安装全局 tracing Subscriber。
pub fn install_tracing() -> Result<(), InstallError> {
    if dispatcher::has_been_set() {
        return Err(InstallError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).map_err(InstallError::SetGlobalSubscriber)
}

/// 读取 `RUST_LOG`；缺失或非法时回落到 `info`。
pub fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
