//! 面向调用方的请求入口
//!
//! 绑定一个后端服务，提供 get / post / put / del 四个方法，
//! 返回统一响应结构或类型化的错误。

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::clients::dispatcher::RequestDispatcher;
use crate::config::ServiceTarget;
use crate::error::AppResult;
use crate::infrastructure::SessionStore;
use crate::models::envelope::ResponseEnvelope;
use crate::models::request::{HttpMethod, RequestDescriptor};

/// 绑定到某个服务的 API 客户端
#[derive(Clone)]
pub struct ApiClient {
    dispatcher: Arc<RequestDispatcher>,
    service: ServiceTarget,
}

impl ApiClient {
    pub fn new(dispatcher: Arc<RequestDispatcher>, service: ServiceTarget) -> Self {
        Self {
            dispatcher,
            service,
        }
    }

    pub fn session(&self) -> &SessionStore {
        self.dispatcher.session()
    }

    /// 同一个分发器下的另一个服务
    pub fn for_service(&self, service: ServiceTarget) -> Self {
        Self::new(self.dispatcher.clone(), service)
    }

    pub async fn get(
        &self,
        path: &str,
        data: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> AppResult<ResponseEnvelope> {
        self.call(HttpMethod::Get, path, data, headers).await
    }

    pub async fn post(
        &self,
        path: &str,
        data: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> AppResult<ResponseEnvelope> {
        self.call(HttpMethod::Post, path, data, headers).await
    }

    pub async fn put(
        &self,
        path: &str,
        data: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> AppResult<ResponseEnvelope> {
        self.call(HttpMethod::Put, path, data, headers).await
    }

    pub async fn del(
        &self,
        path: &str,
        data: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> AppResult<ResponseEnvelope> {
        self.call(HttpMethod::Delete, path, data, headers).await
    }

    /// 直接发送一个完整的请求描述
    pub async fn request(&self, descriptor: RequestDescriptor) -> AppResult<ResponseEnvelope> {
        self.dispatcher.dispatch(descriptor).await
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        data: Option<JsonValue>,
        headers: &[(&str, &str)],
    ) -> AppResult<ResponseEnvelope> {
        let mut descriptor =
            RequestDescriptor::new(self.service, method, path).with_headers(headers.iter().copied());
        descriptor.data = data;
        self.dispatcher.dispatch(descriptor).await
    }
}
