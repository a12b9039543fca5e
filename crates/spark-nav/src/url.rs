//! 地址编解码。
//!
//! 地址形如 `pathname?query#route.id/seg1/seg2`：片段部分承载路由 ID 与原始参数段，
//! 查询部分在启动时读取一次，之后的每次历史写入都原样保留。

use std::borrow::Cow;

/// 片段起始标记。
pub const FRAGMENT_MARKER: char = '#';

/// 逐段百分号编码后以 `/` 拼接。
pub fn build_address<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|segment| urlencoding::encode(segment.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// 从地址片段解析出的初始路由。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitialRoute {
    /// 首段解码结果，即路由 ID。
    pub route_id: String,
    /// 全部解码段（含首段），交由路由自身的 `parse_url` 解读。
    pub raw_segments: Vec<String>,
}

/// 解析地址中的片段部分。
///
/// 地址不含片段或片段为空时返回 `None`。无法按 UTF-8 解码的段保留原文。
pub fn parse_initial(address: &str) -> Option<InitialRoute> {
    let (_, fragment) = address.split_once(FRAGMENT_MARKER)?;
    if fragment.is_empty() {
        return None;
    }

    let raw_segments: Vec<String> = fragment.split('/').map(decode_segment).collect();
    let route_id = raw_segments
        .first()
        .map(|first| first.trim_start_matches(FRAGMENT_MARKER).to_owned())
        .unwrap_or_default();

    Some(InitialRoute {
        route_id,
        raw_segments,
    })
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| segment.to_owned())
}

/// 宿主地址的三段式拆分。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    pub pathname: String,
    /// 含前导 `?`，不存在时为空串。
    pub query: String,
    /// 不含前导 `#`，不存在时为 `None`。
    pub fragment: Option<String>,
}

impl Address {
    pub fn parse(address: &str) -> Self {
        let (rest, fragment) = match address.split_once(FRAGMENT_MARKER) {
            Some((rest, fragment)) => (rest, Some(fragment.to_owned())),
            None => (address, None),
        };
        let (pathname, query) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        Self {
            pathname: pathname.to_owned(),
            query: query.to_owned(),
            fragment,
        }
    }

    /// 以当前路径与查询串为前缀，拼出指向 `route_id`（及可选后缀）的地址。
    pub fn with_route(&self, route_id: &str, suffix: Option<&str>, keep_query: bool) -> String {
        let mut out = String::with_capacity(self.pathname.len() + route_id.len() + 8);
        out.push_str(&self.pathname);
        if keep_query {
            out.push_str(&self.query);
        }
        out.push(FRAGMENT_MARKER);
        out.push_str(route_id);
        if let Some(suffix) = suffix {
            out.push('/');
            out.push_str(suffix);
        }
        out
    }

    /// 清除片段后的地址。
    pub fn without_fragment(&self, keep_query: bool) -> String {
        if keep_query {
            format!("{}{}", self.pathname, self.query)
        } else {
            self.pathname.clone()
        }
    }
}
