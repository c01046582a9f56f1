//! 统一响应结构
//!
//! 后端各接口的返回格式并不一致（有的带 `success`，有的只有 `code`，
//! 有的直接返回数据），这里统一成 `{success, code, message, data}`。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{AppError, AppResult};

/// 统一响应结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = JsonValue> {
    pub success: bool,
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    /// 业务失败（`success: false`）转换为 [`AppError::Rejected`]
    pub fn ensure_success(self) -> AppResult<Self> {
        if self.success {
            Ok(self)
        } else {
            let message = if self.message.is_empty() {
                format!("request rejected: {}", self.code)
            } else {
                self.message
            };
            Err(AppError::Rejected {
                code: self.code,
                message,
            })
        }
    }
}

impl ResponseEnvelope<JsonValue> {
    /// 把 2xx 响应体转换为统一结构
    ///
    /// 已经是统一结构的响应原样保留，否则包装为
    /// `{success: true, code: status, message: "", data: body}`。
    pub fn from_body(status: u16, body: JsonValue) -> Self {
        if let JsonValue::Object(map) = &body {
            if let Some(envelope) = Self::from_object(map) {
                return envelope;
            }
        }

        Self {
            success: true,
            code: i64::from(status),
            message: String::new(),
            data: if body.is_null() { None } else { Some(body) },
        }
    }

    fn from_object(map: &Map<String, JsonValue>) -> Option<Self> {
        let code = map.get("code").and_then(JsonValue::as_i64);
        let success = match map.get("success").and_then(JsonValue::as_bool) {
            Some(success) => success,
            None => {
                let code = code?;
                let looks_like_envelope = ["message", "msg", "data"]
                    .iter()
                    .any(|key| map.contains_key(*key));
                if !looks_like_envelope {
                    return None;
                }
                code == 0 || code == 200
            }
        };

        let message = map
            .get("message")
            .or_else(|| map.get("msg"))
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let data = match map.get("data") {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(value.clone()),
        };

        Some(Self {
            success,
            code: code.unwrap_or(if success { 200 } else { 0 }),
            message,
            data,
        })
    }

    /// 将 `data` 反序列化为指定类型
    pub fn into_data<T: DeserializeOwned>(self) -> AppResult<Option<T>> {
        match self.data {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_existing_envelope() {
        let body = json!({"success": true, "code": 200, "message": "ok", "data": {"id": 1}});
        let envelope = ResponseEnvelope::from_body(200, body);

        assert!(envelope.success);
        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.message, "ok");
        assert_eq!(envelope.data, Some(json!({"id": 1})));
    }

    #[test]
    fn code_only_envelope_derives_success() {
        let ok = ResponseEnvelope::from_body(200, json!({"code": 0, "msg": "done", "data": [1]}));
        assert!(ok.success);
        assert_eq!(ok.message, "done");

        let failed = ResponseEnvelope::from_body(200, json!({"code": 600, "message": "请求过于频繁"}));
        assert!(!failed.success);
        assert_eq!(failed.code, 600);
        assert_eq!(failed.data, None);
    }

    #[test]
    fn wraps_plain_bodies() {
        let list = ResponseEnvelope::from_body(201, json!([{"id": 1}, {"id": 2}]));
        assert!(list.success);
        assert_eq!(list.code, 201);
        assert_eq!(list.message, "");
        assert_eq!(list.data, Some(json!([{"id": 1}, {"id": 2}])));

        // 只有 code 字段的业务对象不是统一结构
        let object = ResponseEnvelope::from_body(200, json!({"code": 7, "name": "数学"}));
        assert_eq!(object.code, 200);
        assert_eq!(object.data, Some(json!({"code": 7, "name": "数学"})));

        let empty = ResponseEnvelope::from_body(204, JsonValue::Null);
        assert_eq!(empty.data, None);
    }

    #[test]
    fn ensure_success_rejects_failed_envelopes() {
        let failed = ResponseEnvelope::from_body(200, json!({"success": false, "code": 1001, "message": "用户名或密码错误"}));
        match failed.ensure_success() {
            Err(AppError::Rejected { code, message }) => {
                assert_eq!(code, 1001);
                assert_eq!(message, "用户名或密码错误");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn into_data_deserializes_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
        }

        let envelope = ResponseEnvelope::from_body(200, json!({"id": 3}));
        assert_eq!(envelope.into_data::<Item>().unwrap(), Some(Item { id: 3 }));

        let bad = ResponseEnvelope::from_body(200, json!({"id": "x"}));
        assert!(bad.into_data::<Item>().is_err());
    }
}
