//! 请求分发器
//!
//! 一次逻辑调用的完整流程：
//! 1. 解析地址（完整地址原样使用，相对路径拼接服务地址）
//! 2. 组装请求头（JSON、登录令牌、调用方自定义头）
//! 3. 按配置的超时发送，未收到响应时线性退避重试
//! 4. 归类响应：2xx → 统一结构；401 → 过期处理；其他 → HTTP 错误

use std::sync::Arc;

use reqwest::Url;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::clients::expiry_handler::ExpiryHandler;
use crate::config::{BackendTarget, Config};
use crate::error::{AppError, AppResult, NetworkError};
use crate::infrastructure::{SessionStore, Transport, TransportFailure, TransportRequest, TransportResponse};
use crate::models::envelope::ResponseEnvelope;
use crate::models::request::{HttpMethod, RequestDescriptor};
use crate::models::session::Token;
use crate::utils::logging::truncate_text;

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";

/// 请求分发器
pub struct RequestDispatcher {
    config: Config,
    transport: Arc<dyn Transport>,
    session: SessionStore,
    expiry: ExpiryHandler,
}

impl RequestDispatcher {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        session: SessionStore,
        expiry: ExpiryHandler,
    ) -> Self {
        Self {
            config,
            transport,
            session,
            expiry,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// 执行一次调用
    pub async fn dispatch(&self, descriptor: RequestDescriptor) -> AppResult<ResponseEnvelope> {
        let target = self.config.target(descriptor.service)?;
        let url = resolve_url(&target.base_url, &descriptor)?;

        let (response, epoch) = self.send_with_retry(&target, &descriptor, &url).await?;
        self.classify(descriptor.method, &url, response, epoch).await
    }

    /// 组装单次尝试的请求，令牌取自当前会话
    fn build_request(
        &self,
        target: &BackendTarget,
        descriptor: &RequestDescriptor,
        url: &str,
        token: Option<&Token>,
    ) -> TransportRequest {
        let body = if descriptor.method.sends_query() {
            None
        } else {
            descriptor.data.clone()
        };

        TransportRequest {
            method: descriptor.method,
            url: url.to_string(),
            headers: build_headers(token, &descriptor.headers),
            body,
            timeout: target.timeout(),
        }
    }

    /// 发送并在未收到响应时重试，返回响应和发出该次请求时的会话版本
    async fn send_with_retry(
        &self,
        target: &BackendTarget,
        descriptor: &RequestDescriptor,
        url: &str,
    ) -> AppResult<(TransportResponse, u64)> {
        let method = descriptor.method;
        let max_attempts = target.retry_count.saturating_add(1);
        let mut attempt: u32 = 1;

        loop {
            // 每次尝试重新读取会话，退避期间会话被清除后不再携带旧令牌
            let snapshot = self.session.snapshot().await;
            let request = self.build_request(target, descriptor, url, snapshot.token.as_ref());

            debug!(
                "[{}] {} {} (尝试 {}/{})",
                target.service, method, url, attempt, max_attempts
            );

            let result = match timeout(target.timeout(), self.transport.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportFailure::Timeout),
            };

            let failure = match result {
                Ok(response) => return Ok((response, snapshot.epoch)),
                Err(failure) => failure,
            };

            if let TransportFailure::Invalid(reason) = failure {
                return Err(NetworkError::InvalidRequest {
                    url: url.to_string(),
                    reason,
                }
                .into());
            }

            if attempt >= max_attempts || !failure.is_retryable(method) {
                error!("❌ {} {} 失败，共尝试 {} 次: {}", method, url, attempt, failure);
                return Err(NetworkError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    reason: failure.to_string(),
                }
                .into());
            }

            let delay = target.backoff(attempt);
            warn!(
                "{} {} 失败: {} (尝试 {}/{}), {}ms 后重试...",
                method,
                url,
                failure,
                attempt,
                max_attempts,
                delay.as_millis()
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn classify(
        &self,
        method: HttpMethod,
        url: &str,
        response: TransportResponse,
        epoch: u64,
    ) -> AppResult<ResponseEnvelope> {
        let status = response.status;
        debug!(
            "{} {} -> {}: {}",
            method,
            url,
            status,
            truncate_text(&response.body, 200)
        );

        match status {
            200..=299 => Ok(ResponseEnvelope::from_body(status, parse_body(&response.body))),
            401 => {
                warn!("{} {} 返回 401，登录已过期", method, url);
                self.expiry.handle(epoch).await;
                Err(AppError::SessionExpired)
            }
            _ => {
                let message = backend_message(&response.body);
                warn!("{} {} 返回 {}: {:?}", method, url, status, message);
                Err(AppError::http(status, message))
            }
        }
    }
}

/// 路径是否已经带协议
pub fn is_absolute_url(path: &str) -> bool {
    Url::parse(path).is_ok_and(|url| url.has_host())
}

/// 解析最终请求地址，GET / DELETE 的参数编码进查询字符串
pub fn resolve_url(base_url: &str, descriptor: &RequestDescriptor) -> AppResult<String> {
    let raw = if is_absolute_url(&descriptor.path) {
        descriptor.path.clone()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            descriptor.path.trim_start_matches('/')
        )
    };

    let query = match (&descriptor.data, descriptor.method.sends_query()) {
        (Some(JsonValue::Object(map)), true) if !map.is_empty() => map,
        _ => return Ok(raw),
    };

    let mut url = Url::parse(&raw).map_err(|e| NetworkError::InvalidRequest {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            match value {
                JsonValue::Null => continue,
                JsonValue::String(s) => pairs.append_pair(key, s),
                other => pairs.append_pair(key, &other.to_string()),
            };
        }
    }
    Ok(url.into())
}

/// 组装请求头
///
/// 调用方的头可以覆盖 `Content-Type`，但不能设置或覆盖 `Authorization`。
pub fn build_headers(token: Option<&Token>, extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut headers = vec![(CONTENT_TYPE.to_string(), "application/json".to_string())];

    for (name, value) in extra {
        if name.eq_ignore_ascii_case(AUTHORIZATION) {
            debug!("忽略调用方设置的 Authorization 头");
            continue;
        }
        match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(existing) => existing.1 = value.clone(),
            None => headers.push((name.clone(), value.clone())),
        }
    }

    if let Some(token) = token {
        headers.push((AUTHORIZATION.to_string(), token.header_value()));
    }

    headers
}

fn parse_body(body: &str) -> JsonValue {
    if body.trim().is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.to_string()))
}

/// 从错误响应体中提取后端消息
fn backend_message(body: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    ["message", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
        .map(str::to_string)
}
