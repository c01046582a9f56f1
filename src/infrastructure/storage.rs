//! 会话持久化 - 基础设施层
//!
//! 相当于客户端的本地存储，会话字段保存在固定的 key 下。

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::debug;

use crate::error::{AppResult, SessionError};
use crate::models::session::{Identity, Session};

/// 持久化的会话字段
///
/// 每个字段对应本地存储里的一个固定 key，读取时可能只有部分字段存在。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_info: Option<JsonValue>,
}

impl StoredSession {
    /// 字段齐全时还原为会话，缺字段或字段损坏返回 None
    pub fn into_session(self) -> Option<Session> {
        let access_token = self.token.filter(|t| !t.is_empty())?;
        let token_type = self.token_type.filter(|t| !t.is_empty())?;
        let identity: Identity = serde_json::from_value(self.user_info?).ok()?;

        Some(Session {
            access_token,
            token_type,
            refresh_token: self.refresh_token,
            expires_at: self.expires_at,
            identity,
        })
    }

    pub fn from_session(session: &Session) -> AppResult<Self> {
        let user_info = serde_json::to_value(&session.identity).map_err(SessionError::Encode)?;
        Ok(Self {
            token: Some(session.access_token.clone()),
            token_type: Some(session.token_type.clone()),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            user_info: Some(user_info),
        })
    }
}

/// 会话存储后端
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// 读取已保存的字段，没有任何数据时返回 None
    async fn load(&self) -> AppResult<Option<StoredSession>>;

    /// 整体覆盖保存
    async fn save(&self, stored: &StoredSession) -> AppResult<()>;

    /// 删除所有字段，重复调用不报错
    async fn clear(&self) -> AppResult<()>;
}

/// 内存存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<StoredSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置数据（用于还原测试）
    pub fn with_stored(stored: StoredSession) -> Self {
        Self {
            slot: Mutex::new(Some(stored)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<StoredSession>> {
        // 锁内只有赋值操作，被污染时数据依然完整
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        Ok(self.lock().clone())
    }

    async fn save(&self, stored: &StoredSession) -> AppResult<()> {
        *self.lock() = Some(stored.clone());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        *self.lock() = None;
        Ok(())
    }
}

/// JSON 文件存储
///
/// 写入时先写临时文件再重命名，文件里不会出现写了一半的内容。
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    fn storage_failed(&self, source: std::io::Error) -> SessionError {
        SessionError::StorageFailed {
            path: self.display(),
            source,
        }
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> AppResult<Option<StoredSession>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_failed(e).into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let stored = serde_json::from_str(&content).map_err(|source| SessionError::Corrupt {
            path: self.display(),
            source,
        })?;
        Ok(Some(stored))
    }

    async fn save(&self, stored: &StoredSession) -> AppResult<()> {
        let content = serde_json::to_string_pretty(stored).map_err(SessionError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_failed(e))?;
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| self.storage_failed(e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.storage_failed(e))?;

        debug!("会话已写入 {}", self.display());
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_failed(e).into()),
        }
    }
}
