//! # Tiku Request
//!
//! 题库管理后台、商家端和小程序共用的 API 请求 / 会话层
//!
//! ## 架构设计
//!
//! 本库分为三层：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有会话状态和 HTTP 连接，只暴露能力
//! - `SessionStore` - 当前会话的唯一来源，读写原子
//! - `Transport` - 发送请求的抽象，`ReqwestTransport` 为默认实现
//!
//! ### ② 请求层（Clients）
//! - `clients/` - 一次调用的完整流程
//! - `RequestDispatcher` - 组装请求头、超时、重试、归类响应
//! - `ExpiryHandler` - 401 时清除会话、提示用户、跳转登录页
//! - `ApiClient` - 绑定某个服务的 get / post / put / del
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 登录、资源增删改查、用户资料等薄封装
//!
//! ## 模块结构

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use clients::{ApiClient, ExpiryHandler, Navigator, Notifier, RequestDispatcher};
pub use config::{BackendTarget, Config, Environment, ServiceTarget};
pub use error::{AppError, AppResult};
pub use infrastructure::{SessionStore, Transport};
pub use models::{ResponseEnvelope, Session, Token};
