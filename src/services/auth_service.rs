//! 登录服务 - 业务能力层
//!
//! 只负责登录 / 退出，会话的保存交给 [`SessionStore`]。

use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::clients::ApiClient;
use crate::error::{AppResult, SessionError};
use crate::infrastructure::SessionStore;
use crate::models::session::{Identity, Session};

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";

/// 登录接口返回的数据
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    #[serde(default, alias = "accessToken")]
    token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// 有效期（秒）
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default, alias = "userInfo")]
    user: Option<Identity>,
}

impl LoginData {
    fn into_session(self) -> Result<Session, SessionError> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingField { field: "token" })?;
        let identity = self.user.ok_or(SessionError::MissingField { field: "user" })?;
        let token_type = self
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string());

        let mut session = Session::new(token, token_type, identity);
        if let Some(refresh_token) = self.refresh_token.filter(|t| !t.is_empty()) {
            session = session.with_refresh_token(refresh_token);
        }
        if let Some(secs) = self.expires_in.filter(|secs| *secs > 0) {
            session = session.with_expiry(Utc::now() + ChronoDuration::seconds(secs));
        }
        Ok(session)
    }
}

/// 登录服务
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn session(&self) -> &SessionStore {
        self.client.session()
    }

    /// 账号密码登录，成功后保存会话
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let envelope = self
            .client
            .post(
                LOGIN_PATH,
                Some(json!({"username": username, "password": password})),
                &[],
            )
            .await?
            .ensure_success()?;

        let data: LoginData = envelope
            .into_data()?
            .ok_or(SessionError::MissingField { field: "data" })?;
        let session = data.into_session()?;

        self.session().set_session(session.clone()).await?;
        info!("✓ 登录成功: {}", session.identity.display_name);
        Ok(session)
    }

    /// 退出登录
    ///
    /// 通知后端失败不影响本地清除。
    pub async fn logout(&self) -> AppResult<()> {
        if self.session().is_authenticated().await {
            if let Err(e) = self.client.post(LOGOUT_PATH, None, &[]).await {
                warn!("通知后端退出失败: {}", e);
            }
        }
        self.session().clear_session().await?;
        info!("已退出登录");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_data_defaults_token_type() {
        let data: LoginData = serde_json::from_value(json!({
            "accessToken": "abc",
            "expiresIn": 3600,
            "user": {"id": 1, "nickname": "王老师", "roles": ["admin"]}
        }))
        .unwrap();
        let session = data.into_session().unwrap();

        assert_eq!(session.token().header_value(), "Bearer abc");
        assert!(session.expires_at.is_some());
        assert!(!session.is_expired_at(Utc::now()));
    }

    #[test]
    fn login_data_without_token_is_rejected() {
        let data: LoginData = serde_json::from_value(json!({"user": {"id": 1, "nickname": "x"}})).unwrap();
        assert!(matches!(
            data.into_session(),
            Err(SessionError::MissingField { field: "token" })
        ));
    }
}
