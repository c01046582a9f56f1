//! 会话数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 登录用户的身份信息
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(alias = "nickname", alias = "nickName", alias = "username")]
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

// 后端的用户 ID 有时是数字有时是字符串
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or an integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// 请求时附带的令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    /// `Authorization` 头的值：`<tokenType> <token>`
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// 完整的登录会话
///
/// 要么完整存在，要么完全不存在，不会出现只有一半字段的状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub identity: Identity,
}

impl Session {
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>, identity: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token: None,
            expires_at: None,
            identity,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn token(&self) -> Token {
        Token {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
        }
    }

    /// 本地记录的过期时间是否已到
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_accepts_numeric_id_and_nickname() {
        let identity: Identity =
            serde_json::from_value(json!({"id": 42, "nickname": "张老师", "roles": ["admin"]})).unwrap();

        assert_eq!(identity.id, "42");
        assert_eq!(identity.display_name, "张老师");
        assert!(identity.has_role("admin"));
    }

    #[test]
    fn header_value_is_type_then_token() {
        let session = Session::new("abc", "Bearer", Identity::default());
        assert_eq!(session.token().header_value(), "Bearer abc");
    }
}
