use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppResult, ConfigError};

/// 后端服务分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTarget {
    /// 管理后台
    Admin,
    /// 商家端
    Business,
    /// 用户端（小程序）
    Consumer,
}

impl ServiceTarget {
    pub fn name(self) -> &'static str {
        match self {
            ServiceTarget::Admin => "admin",
            ServiceTarget::Business => "business",
            ServiceTarget::Consumer => "consumer",
        }
    }
}

impl FromStr for ServiceTarget {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ServiceTarget::Admin),
            "business" => Ok(ServiceTarget::Business),
            "consumer" => Ok(ServiceTarget::Consumer),
            _ => Err(ConfigError::UnknownService {
                service: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// 本地联调
    #[default]
    Local,
    /// 线上环境
    Remote,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "dev" => Ok(Environment::Local),
            "remote" | "prod" => Ok(Environment::Remote),
            _ => Err(ConfigError::UnknownEnvironment {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Local => write!(f, "local"),
            Environment::Remote => write!(f, "remote"),
        }
    }
}

/// 单个服务解析后的调用参数，运行期间不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub service: ServiceTarget,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl BackendTarget {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 第 `attempt` 次失败后的等待时间（线性退避）
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

/// 某个服务在两个环境下的地址
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUrls {
    pub local: Option<String>,
    pub remote: Option<String>,
}

impl ServiceUrls {
    fn local(url: &str) -> Self {
        Self {
            local: Some(url.to_string()),
            remote: None,
        }
    }

    fn get(&self, environment: Environment) -> Option<&str> {
        match environment {
            Environment::Local => self.local.as_deref(),
            Environment::Remote => self.remote.as_deref(),
        }
        .filter(|url| !url.trim().is_empty())
    }
}

/// 程序配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 当前环境
    pub environment: Environment,
    // --- 服务地址 ---
    pub admin: ServiceUrls,
    pub business: ServiceUrls,
    pub consumer: ServiceUrls,
    // --- 传输参数 ---
    pub timeout_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    /// 登录过期后跳转的页面
    pub reauth_route: String,
    /// 会话持久化文件，不设置时只保存在内存中
    pub session_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            admin: ServiceUrls::local("http://localhost:8081"),
            business: ServiceUrls::local("http://localhost:8082"),
            consumer: ServiceUrls::local("http://localhost:8083"),
            timeout_ms: 10_000,
            retry_count: 2,
            retry_delay_ms: 1_000,
            reauth_route: "/pages/login/login".to_string(),
            session_file: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 日志初始化之前预读 `VERBOSE_LOGGING`，无法解析时按默认值处理
    pub fn verbose_from_env() -> bool {
        env_string("VERBOSE_LOGGING")
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::default().verbose_logging)
    }

    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            environment: env_parse("TIKU_ENV").unwrap_or(default.environment),
            admin: ServiceUrls {
                local: env_string("ADMIN_BASE_URL_LOCAL").or(default.admin.local),
                remote: env_string("ADMIN_BASE_URL_REMOTE").or(default.admin.remote),
            },
            business: ServiceUrls {
                local: env_string("BUSINESS_BASE_URL_LOCAL").or(default.business.local),
                remote: env_string("BUSINESS_BASE_URL_REMOTE").or(default.business.remote),
            },
            consumer: ServiceUrls {
                local: env_string("CONSUMER_BASE_URL_LOCAL").or(default.consumer.local),
                remote: env_string("CONSUMER_BASE_URL_REMOTE").or(default.consumer.remote),
            },
            timeout_ms: env_parse("REQUEST_TIMEOUT_MS").unwrap_or(default.timeout_ms),
            retry_count: env_parse("REQUEST_RETRY_COUNT").unwrap_or(default.retry_count),
            retry_delay_ms: env_parse("REQUEST_RETRY_DELAY_MS").unwrap_or(default.retry_delay_ms),
            reauth_route: env_string("REAUTH_ROUTE").unwrap_or(default.reauth_route),
            session_file: env_string("SESSION_FILE").or(default.session_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 从 TOML 文本加载配置，缺失的字段使用默认值
    pub fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        let config = toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: display.clone(),
            source,
        })?;
        Self::from_toml_str(&content, &display)
    }

    /// 按服务标识解析调用参数
    ///
    /// 未知标识或当前环境下没有地址时返回 [`ConfigError`]，不会猜测地址。
    pub fn resolve(&self, service: &str) -> AppResult<BackendTarget> {
        let target: ServiceTarget = service.parse()?;
        self.target(target)
    }

    pub fn target(&self, service: ServiceTarget) -> AppResult<BackendTarget> {
        let urls = match service {
            ServiceTarget::Admin => &self.admin,
            ServiceTarget::Business => &self.business,
            ServiceTarget::Consumer => &self.consumer,
        };

        let base_url = urls
            .get(self.environment)
            .ok_or_else(|| ConfigError::ServiceUrlUnset {
                service: service.to_string(),
                environment: self.environment.to_string(),
            })?;

        Ok(BackendTarget {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_ms: self.timeout_ms,
            retry_count: self.retry_count,
            retry_delay_ms: self.retry_delay_ms,
        })
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var_name: &str) -> Option<T> {
    let value = env_string(var_name)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", var_name, value);
            None
        }
    }
}
