use thiserror::Error;

/// 请求层错误类型
///
/// 调用方只会看到这里的几类错误，不会看到原始的传输层响应。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（未知或未配置的服务目标），不可重试
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 网络错误（重试耗尽后仍未收到响应）
    #[error("网络错误: {0}")]
    Network(#[from] NetworkError),

    /// 登录已过期（后端返回 401），过期处理已经执行
    #[error("登录已过期，请重新登录")]
    SessionExpired,

    /// 其他非 2xx 响应
    #[error("HTTP错误 ({status}): {message}")]
    Http { status: u16, message: String },

    /// 2xx 响应但业务上失败（`success: false`）
    #[error("请求被拒绝 (code={code}): {message}")]
    Rejected { code: i64, message: String },

    /// 会话状态或持久化错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),

    /// 响应数据解析失败
    #[error("数据解析失败: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未知的服务标识
    #[error("未知的服务标识: {service}")]
    UnknownService { service: String },

    /// 服务在当前环境下没有配置地址
    #[error("服务 {service} 在 {environment} 环境下未配置地址")]
    ServiceUrlUnset {
        service: String,
        environment: String,
    },

    /// 未知的环境标识
    #[error("未知的环境标识: {value}")]
    UnknownEnvironment { value: String },

    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件解析失败
    #[error("解析配置文件失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 网络错误
#[derive(Debug, Error)]
pub enum NetworkError {
    /// 所有尝试都没有收到响应
    #[error("请求 {url} 失败，共尝试 {attempts} 次: {reason}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// 请求无法构建（URL 非法等），不会重试
    #[error("无效的请求 ({url}): {reason}")]
    InvalidRequest { url: String, reason: String },
}

/// 会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 当前没有会话，无法执行需要登录态的操作
    #[error("当前未登录")]
    NotAuthenticated,

    /// 登录响应缺少必要字段
    #[error("登录响应缺少字段: {field}")]
    MissingField { field: &'static str },

    /// 会话持久化失败
    #[error("会话存储失败 ({path}): {source}")]
    StorageFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 持久化数据损坏
    #[error("会话数据损坏 ({path}): {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// 持久化数据编码失败
    #[error("会话数据编码失败: {0}")]
    Encode(#[source] serde_json::Error),
}

impl AppError {
    /// 是否属于可以重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(NetworkError::RetriesExhausted { .. }))
    }

    /// 错误对应的 HTTP 状态码（如果有）
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Http { status, .. } => Some(*status),
            AppError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// 创建 HTTP 错误，后端没有给出消息时使用通用提示
    pub fn http(status: u16, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("request failed: {}", status));
        AppError::Http { status, message }
    }
}

// ========== Result 类型别名 ==========

/// 请求层结果类型
pub type AppResult<T> = Result<T, AppError>;
