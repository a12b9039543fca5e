//! 路由管理器配置。
//!
//! 所有字段都有默认值，宿主可以只覆盖关心的键：
//!
//! ```toml
//! guard_bypass_param = "skipConfirm"
//! preserve_query = false
//! initial_address = "/app/#home"
//! ```

use serde::Deserialize;

use crate::error::NavError;

/// 默认的守卫绕过参数名。
pub const DEFAULT_GUARD_BYPASS_PARAM: &str = "ignoreOnBeforeUnload";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigatorConfig {
    /// 目标参数中该键为真时跳过当前路由的离开守卫。
    pub guard_bypass_param: String,
    /// 历史写入时是否保留启动地址中的查询串。
    pub preserve_query: bool,
    /// 覆盖从宿主读取的启动地址。
    pub initial_address: Option<String>,
    /// 回退导航失败时是否重置为空路由并清空地址。
    pub reset_on_back_failure: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            guard_bypass_param: DEFAULT_GUARD_BYPASS_PARAM.to_owned(),
            preserve_query: true,
            initial_address: None,
            reset_on_back_failure: true,
        }
    }
}

impl NavigatorConfig {
    /// 从 TOML 文本加载配置。
    pub fn from_toml_str(source: &str) -> Result<Self, NavError> {
        let config: NavigatorConfig = toml::from_str(source).map_err(|err| NavError::InvalidConfig {
            detail: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if self.guard_bypass_param.trim().is_empty() {
            return Err(NavError::InvalidConfig {
                detail: "guard_bypass_param must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn with_initial_address<S: Into<String>>(mut self, address: S) -> Self {
        self.initial_address = Some(address.into());
        self
    }
}
