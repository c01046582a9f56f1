//! 登录过期处理
//!
//! 任何请求收到 401 都交给这里：清除会话 → 提示用户 → 跳转登录页。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::infrastructure::SessionStore;

/// 过期时展示给用户的提示
pub const SESSION_EXPIRED_MESSAGE: &str = "登录已过期，请重新登录";

/// 用户提示
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// 页面跳转
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// 把提示写进日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        warn!("⚠️ {}", message);
    }
}

/// 通过通道把跳转目标交给界面层
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str) {
        if self.sender.send(route.to_string()).is_err() {
            debug!("没有界面在监听跳转: {}", route);
        }
    }
}

/// 登录过期处理器
///
/// 同一次过期只处理一次：并发收到的多个 401 只会清除、提示、跳转各一次。
pub struct ExpiryHandler {
    session: SessionStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    reauth_route: String,
    handling: AtomicBool,
}

impl ExpiryHandler {
    pub fn new(
        session: SessionStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        reauth_route: impl Into<String>,
    ) -> Self {
        Self {
            session,
            notifier,
            navigator,
            reauth_route: reauth_route.into(),
            handling: AtomicBool::new(false),
        }
    }

    /// 处理一次 401
    ///
    /// `epoch` 是发起请求时的会话版本。会话已经被别的请求清除或替换时
    /// 不再重复处理。返回本次是否真正执行了处理。
    pub async fn handle(&self, epoch: u64) -> bool {
        if self.handling.swap(true, Ordering::AcqRel) {
            debug!("登录过期正在处理中，跳过");
            return false;
        }
        let _guard = HandlingGuard(&self.handling);

        if !self.session.invalidate_if_current(epoch).await {
            debug!("会话已被处理过 (epoch {})，跳过", epoch);
            return false;
        }

        info!("登录已过期，跳转到 {}", self.reauth_route);
        self.notifier.notify(SESSION_EXPIRED_MESSAGE);
        self.navigator.navigate(&self.reauth_route);
        true
    }
}

/// 处理结束（包括 panic）时复位标记
struct HandlingGuard<'a>(&'a AtomicBool);

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{Identity, Session};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        messages: Mutex<Vec<String>>,
    }

    impl Notifier for Recorder {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn clears_notifies_and_navigates_once_per_epoch() {
        let store = SessionStore::in_memory();
        store
            .set_session(Session::new("abc", "Bearer", Identity::default()))
            .await
            .unwrap();
        let epoch = store.snapshot().await.epoch;

        let recorder = Arc::new(Recorder::default());
        let (navigator, mut routes) = ChannelNavigator::new();
        let handler = ExpiryHandler::new(store.clone(), recorder.clone(), Arc::new(navigator), "/login");

        assert!(handler.handle(epoch).await);
        assert!(!handler.handle(epoch).await);

        assert_eq!(store.get_token().await, None);
        assert_eq!(*recorder.messages.lock().unwrap(), vec![SESSION_EXPIRED_MESSAGE.to_string()]);
        assert_eq!(routes.try_recv().unwrap(), "/login");
        assert!(routes.try_recv().is_err());
    }

    #[tokio::test]
    async fn newer_session_is_not_cleared_by_stale_401() {
        let store = SessionStore::in_memory();
        store
            .set_session(Session::new("old", "Bearer", Identity::default()))
            .await
            .unwrap();
        let stale = store.snapshot().await.epoch;
        store
            .set_session(Session::new("new", "Bearer", Identity::default()))
            .await
            .unwrap();

        let (navigator, _routes) = ChannelNavigator::new();
        let handler = ExpiryHandler::new(store.clone(), Arc::new(LogNotifier), Arc::new(navigator), "/login");

        assert!(!handler.handle(stale).await);
        assert_eq!(store.get_token().await.unwrap().access_token, "new");
    }
}
