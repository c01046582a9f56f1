//! 应用装配
//!
//! 负责把配置、会话存储、传输层、过期处理器组装成一个可用的客户端。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::clients::{ApiClient, ChannelNavigator, ExpiryHandler, LogNotifier, RequestDispatcher};
use crate::config::{Config, ServiceTarget};
use crate::infrastructure::{FileStorage, MemoryStorage, ReqwestTransport, SessionStorage, SessionStore, Transport};
use crate::services::{resource_service, UserService};
use crate::utils::logging::{log_startup, mask_token};

/// 应用主结构
pub struct App {
    dispatcher: Arc<RequestDispatcher>,
    navigation: mpsc::UnboundedReceiver<String>,
}

impl App {
    /// 初始化应用：还原本地会话并创建 HTTP 客户端
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => Arc::new(FileStorage::new(Path::new(path))),
            None => Arc::new(MemoryStorage::new()),
        };
        let session = SessionStore::new(storage);
        if session.restore().await.context("还原本地会话失败")? {
            if let Some(token) = session.get_token().await {
                info!("使用本地令牌: {}", mask_token(&token.access_token));
            }
        }

        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()), session))
    }

    /// 使用指定的传输层组装（测试时传入假的传输层）
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        let (navigator, navigation) = ChannelNavigator::new();
        let expiry = ExpiryHandler::new(
            session.clone(),
            Arc::new(LogNotifier),
            Arc::new(navigator),
            config.reauth_route.clone(),
        );
        let dispatcher = Arc::new(RequestDispatcher::new(config, transport, session, expiry));

        Self {
            dispatcher,
            navigation,
        }
    }

    pub fn client(&self, service: ServiceTarget) -> ApiClient {
        ApiClient::new(self.dispatcher.clone(), service)
    }

    /// 取出待处理的跳转（界面层轮询）
    pub fn take_navigation(&mut self) -> Option<String> {
        self.navigation.try_recv().ok()
    }

    /// 拉取用户资料和轮播图，检查各服务是否可用
    pub async fn run(&mut self) -> Result<()> {
        let client = self.client(ServiceTarget::Consumer);
        let users = UserService::new(&client);
        let carousel = resource_service::carousel(&client);

        let (profile, slides) = futures::join!(users.profile(), carousel.list());

        match profile {
            Ok(profile) => info!("✓ 当前用户: {}", profile.nickname),
            Err(e) => warn!("⚠️ 获取用户资料失败: {}", e),
        }
        match slides {
            Ok(slides) => info!("✓ 轮播图 {} 张", slides.len()),
            Err(e) => error!("❌ 获取轮播图失败: {}", e),
        }

        while let Some(route) = self.take_navigation() {
            info!("📋 需要重新登录，跳转到 {}", route);
        }

        Ok(())
    }
}
