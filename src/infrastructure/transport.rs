//! HTTP 传输 - 基础设施层
//!
//! 只负责"发出一个请求，拿回状态码和响应体"，不认识会话，也不做重试。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::debug;

use crate::models::request::HttpMethod;

/// 交给传输层的完整请求
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    pub timeout: Duration,
}

impl TransportRequest {
    /// 按名称查找请求头（不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 原始响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: &JsonValue) -> Self {
        Self::new(status, body.to_string())
    }
}

/// 传输层失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    /// 超时
    #[error("请求超时")]
    Timeout,
    /// 连接失败（拒绝连接、DNS 解析失败等）
    #[error("连接失败: {0}")]
    Connect(String),
    /// 已收到响应头，但读取响应体失败
    #[error("读取响应失败: {0}")]
    Body(String),
    /// 请求本身无法构建
    #[error("无效请求: {0}")]
    Invalid(String),
    /// 其他未收到响应的失败
    #[error("{0}")]
    Other(String),
}

impl TransportFailure {
    /// 是否可以对该方法重试
    ///
    /// 没收到响应的失败任何方法都可以重试；已经收到响应的失败
    /// 只对 GET / DELETE 重试，避免 POST / PUT 在后端产生重复数据。
    pub fn is_retryable(&self, method: HttpMethod) -> bool {
        match self {
            TransportFailure::Timeout | TransportFailure::Connect(_) | TransportFailure::Other(_) => true,
            TransportFailure::Body(_) => method.is_idempotent(),
            TransportFailure::Invalid(_) => false,
        }
    }
}

/// HTTP 传输
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure>;
}

/// 基于 reqwest 的传输实现
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        debug!("{} {} -> {}", request.method, request.url, status);

        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure::Body(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportFailure {
    if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect(err.to_string())
    } else if err.is_builder() {
        TransportFailure::Invalid(err.to_string())
    } else {
        TransportFailure::Other(err.to_string())
    }
}
