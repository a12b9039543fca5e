//! 路由参数映射。
//!
//! 参数以 JSON 对象承载：宿主历史栈中保存的状态本身就是 JSON，路由回调也以 JSON 值读写参数。
//! 非对象的输入在边界处由 [`RouteParams::from_value`] 拒绝。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::NavError;

/// 路由参数，键值有序，比较时与插入顺序无关。
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(Map<String, Value>);

impl RouteParams {
    /// 创建空参数表。
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// 从任意 JSON 值构造参数。
    ///
    /// - **契约 (What)**：仅接受 `Value::Object`，其余类型返回 [`NavError::InvalidParams`]；
    ///   `Value::Null` 同样被拒绝，调用方若想表达“无参数”应直接传 `None`。
    pub fn from_value(value: Value) -> Result<Self, NavError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(NavError::InvalidParams {
                detail: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Builder 风格插入。
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    /// 插入或覆盖键值。
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    /// 键是否存在且取值为“真”（按 JavaScript 的真值规则判定）。
    pub fn is_truthy(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(is_truthy)
    }

    /// 以 `defaults` 为底、`self` 覆盖其上合并出新的参数表，两者均不被修改。
    pub fn merged_over(&self, defaults: &RouteParams) -> RouteParams {
        let mut merged = defaults.0.clone();
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        RouteParams(merged)
    }

    /// 浅比较：键集合一致且逐键取值相等，与键顺序无关。
    pub fn shallow_eq(&self, other: &RouteParams) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .all(|(key, value)| other.0.get(key) == Some(value))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for RouteParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for RouteParams {
    type Error = NavError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
