//! 会话存储 - 基础设施层
//!
//! 当前登录会话的唯一来源。所有读写都经过同一把读写锁，
//! 读到的要么是完整的旧会话，要么是完整的新会话。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{AppResult, SessionError};
use crate::infrastructure::storage::{MemoryStorage, SessionStorage, StoredSession};
use crate::models::session::{Session, Token};

#[derive(Debug, Default)]
struct SessionState {
    session: Option<Session>,
    /// 每次会话被替换或清除时递增
    epoch: u64,
}

/// 发起请求时看到的会话快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub token: Option<Token>,
    pub epoch: u64,
}

/// 会话存储
///
/// 可以廉价克隆，所有克隆共享同一份状态。
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::default())),
            storage,
        }
    }

    /// 只保存在内存中的会话存储
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// 从持久化存储还原会话
    ///
    /// 字段不全或数据损坏时清空存储，保持未登录状态。
    /// 返回是否成功还原。
    pub async fn restore(&self) -> AppResult<bool> {
        let mut state = self.state.write().await;

        let stored = match self.storage.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("读取本地会话失败，已丢弃: {}", e);
                self.storage.clear().await?;
                return Ok(false);
            }
        };

        let Some(stored) = stored else {
            debug!("本地没有保存的会话");
            return Ok(false);
        };

        match stored.into_session() {
            Some(session) => {
                info!("✓ 已还原登录会话: {}", session.identity.display_name);
                state.session = Some(session);
                state.epoch += 1;
                Ok(true)
            }
            None => {
                warn!("本地会话字段不完整，已清除");
                self.storage.clear().await?;
                Ok(false)
            }
        }
    }

    /// 当前令牌，未登录时返回 None
    pub async fn get_token(&self) -> Option<Token> {
        self.state.read().await.session.as_ref().map(Session::token)
    }

    /// 令牌与会话版本号
    pub async fn snapshot(&self) -> TokenSnapshot {
        let state = self.state.read().await;
        TokenSnapshot {
            token: state.session.as_ref().map(Session::token),
            epoch: state.epoch,
        }
    }

    /// 当前完整会话
    pub async fn current(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// 登录成功后保存会话，整体覆盖旧会话
    ///
    /// 持久化成功后才替换内存中的会话。
    pub async fn set_session(&self, session: Session) -> AppResult<()> {
        validate(&session)?;
        let stored = StoredSession::from_session(&session)?;

        let mut state = self.state.write().await;
        self.storage.save(&stored).await?;

        debug!(
            "会话已更新: 用户 {} ({})",
            session.identity.display_name, session.identity.id
        );
        state.session = Some(session);
        state.epoch += 1;
        Ok(())
    }

    /// 刷新令牌，身份信息保持不变
    ///
    /// 只能在已登录状态下调用。
    pub async fn refresh_tokens(
        &self,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let current = state
            .session
            .as_ref()
            .ok_or(SessionError::NotAuthenticated)?;

        let refreshed = Session {
            access_token: access_token.into(),
            token_type: token_type.into(),
            refresh_token,
            expires_at,
            identity: current.identity.clone(),
        };
        validate(&refreshed)?;

        self.storage
            .save(&StoredSession::from_session(&refreshed)?)
            .await?;
        state.session = Some(refreshed);
        state.epoch += 1;
        Ok(())
    }

    /// 清除会话，重复调用是无操作
    ///
    /// 内存状态总是会被清除；持久化删除失败时返回错误。
    pub async fn clear_session(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.session.take().is_some() {
            state.epoch += 1;
            debug!("会话已清除");
        }
        self.storage.clear().await
    }

    /// 仅当会话仍是 `epoch` 对应的版本时清除
    ///
    /// 多个请求同时收到 401 时，只有第一个会真正清除会话。
    pub async fn invalidate_if_current(&self, epoch: u64) -> bool {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return false;
        }

        state.session = None;
        state.epoch += 1;
        if let Err(e) = self.storage.clear().await {
            error!("清除本地会话失败: {}", e);
        }
        true
    }
}

fn validate(session: &Session) -> Result<(), SessionError> {
    if session.access_token.is_empty() {
        return Err(SessionError::MissingField { field: "token" });
    }
    if session.token_type.is_empty() {
        return Err(SessionError::MissingField { field: "tokenType" });
    }
    Ok(())
}
