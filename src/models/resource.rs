//! 后台资源数据模型
//!
//! 只覆盖请求层需要关心的字段，其余字段保存在 `extra` 中原样透传。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::session::deserialize_id;

/// 分页查询参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(flatten)]
    pub filters: Map<String, JsonValue>,
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            filters: Map::new(),
        }
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// 分页结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    #[serde(alias = "list", alias = "rows")]
    pub records: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

/// 知识点
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 题目
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// 题干（markdown）
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge_point_ids: Vec<i64>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 科目
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 轮播图
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default)]
    pub sort: i32,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 用户资料
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "displayName", alias = "nickName", alias = "username")]
    pub nickname: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
