//! 后台资源的增删改查 - 业务能力层
//!
//! 每种资源只是一个路径前缀，接口约定统一：
//! `POST {base}/page`、`GET {base}/list`、`GET {base}/{id}`、
//! `POST {base}`、`PUT {base}/{id}`、`DELETE {base}/{id}`。

use std::fmt::Display;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::clients::ApiClient;
use crate::config::ServiceTarget;
use crate::error::AppResult;
use crate::models::resource::{CarouselItem, KnowledgePoint, PageQuery, PageResult, Question, Subject, UserProfile};

/// 一种资源的增删改查
pub struct CrudResource<T> {
    client: ApiClient,
    base_path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CrudResource<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(client: ApiClient, base_path: impl Into<String>) -> Self {
        Self {
            client,
            base_path: base_path.into().trim_end_matches('/').to_string(),
            _marker: PhantomData,
        }
    }

    /// 分页查询
    pub async fn page(&self, query: &PageQuery) -> AppResult<PageResult<T>> {
        let path = format!("{}/page", self.base_path);
        debug!("分页查询 {} 第 {} 页", self.base_path, query.page);
        let envelope = self
            .client
            .post(&path, Some(serde_json::to_value(query)?), &[])
            .await?
            .ensure_success()?;
        Ok(envelope.into_data()?.unwrap_or(PageResult {
            records: Vec::new(),
            total: 0,
        }))
    }

    /// 全部列表
    pub async fn list(&self) -> AppResult<Vec<T>> {
        let path = format!("{}/list", self.base_path);
        let envelope = self.client.get(&path, None, &[]).await?.ensure_success()?;
        Ok(envelope.into_data()?.unwrap_or_default())
    }

    /// 按 ID 获取，不存在时返回 None
    pub async fn get(&self, id: impl Display) -> AppResult<Option<T>> {
        let path = format!("{}/{}", self.base_path, id);
        let envelope = self.client.get(&path, None, &[]).await?.ensure_success()?;
        envelope.into_data()
    }

    /// 新增，返回后端给出的数据（通常是新记录或其 ID）
    pub async fn create(&self, item: &T) -> AppResult<Option<JsonValue>> {
        let envelope = self
            .client
            .post(&self.base_path, Some(serde_json::to_value(item)?), &[])
            .await?
            .ensure_success()?;
        Ok(envelope.data)
    }

    /// 更新
    pub async fn update(&self, id: impl Display, item: &T) -> AppResult<()> {
        let path = format!("{}/{}", self.base_path, id);
        self.client
            .put(&path, Some(serde_json::to_value(item)?), &[])
            .await?
            .ensure_success()?;
        Ok(())
    }

    /// 删除
    pub async fn delete(&self, id: impl Display) -> AppResult<()> {
        let path = format!("{}/{}", self.base_path, id);
        self.client.del(&path, None, &[]).await?.ensure_success()?;
        Ok(())
    }
}

/// 知识点（管理后台）
pub fn knowledge_points(client: &ApiClient) -> CrudResource<KnowledgePoint> {
    CrudResource::new(client.for_service(ServiceTarget::Admin), "/api/admin/knowledge-points")
}

/// 题目（管理后台）
pub fn questions(client: &ApiClient) -> CrudResource<Question> {
    CrudResource::new(client.for_service(ServiceTarget::Admin), "/api/admin/questions")
}

/// 科目（管理后台）
pub fn subjects(client: &ApiClient) -> CrudResource<Subject> {
    CrudResource::new(client.for_service(ServiceTarget::Admin), "/api/admin/subjects")
}

/// 后台用户（管理后台）
pub fn admin_users(client: &ApiClient) -> CrudResource<UserProfile> {
    CrudResource::new(client.for_service(ServiceTarget::Admin), "/api/admin/users")
}

/// 轮播图（用户端）
pub fn carousel(client: &ApiClient) -> CrudResource<CarouselItem> {
    CrudResource::new(client.for_service(ServiceTarget::Consumer), "/api/carousel")
}
