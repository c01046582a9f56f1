//! 请求描述

use std::fmt;

use serde_json::Value as JsonValue;

use crate::config::ServiceTarget;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// 重复执行是否安全
    pub fn is_idempotent(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }

    /// 参数是否放在查询字符串里（否则作为 JSON 请求体）
    pub fn sends_query(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次调用的请求描述，由调用方创建后交给分发器
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    /// 相对路径或带协议的完整地址
    pub path: String,
    pub data: Option<JsonValue>,
    pub headers: Vec<(String, String)>,
    pub service: ServiceTarget,
}

impl RequestDescriptor {
    pub fn new(service: ServiceTarget, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            data: None,
            headers: Vec::new(),
            service,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}
