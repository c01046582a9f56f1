#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tiku_request::clients::{ApiClient, ExpiryHandler, Navigator, Notifier, RequestDispatcher};
use tiku_request::config::{Config, ServiceTarget};
use tiku_request::infrastructure::{SessionStore, Transport, TransportFailure, TransportRequest, TransportResponse};
use tokio::sync::Barrier;
use tokio::time::{Duration, Instant};

type Responder = Box<dyn Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportFailure> + Send + Sync>;

/// 按脚本返回响应的传输层，记录每次收到的请求
pub struct ScriptedTransport {
    responder: Responder,
    barrier: Option<Arc<Barrier>>,
    delay: Option<Duration>,
    requests: Mutex<Vec<(Instant, TransportRequest)>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportFailure> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            barrier: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 所有请求在返回前先一起等在屏障上
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// 每次返回前等待一段时间
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportFailure> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((Instant::now(), request.clone()));
            requests.len() - 1
        };
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&request, index)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

pub struct Harness {
    pub dispatcher: Arc<RequestDispatcher>,
    pub session: SessionStore,
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(config: Config, transport: ScriptedTransport) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: Config, transport: Arc<ScriptedTransport>) -> Self {
        let session = SessionStore::in_memory();
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let expiry = ExpiryHandler::new(
            session.clone(),
            notifier.clone(),
            navigator.clone(),
            config.reauth_route.clone(),
        );
        let dispatcher = Arc::new(RequestDispatcher::new(
            config,
            transport.clone(),
            session.clone(),
            expiry,
        ));

        Self {
            dispatcher,
            session,
            transport,
            notifier,
            navigator,
        }
    }

    pub fn client(&self, service: ServiceTarget) -> ApiClient {
        ApiClient::new(self.dispatcher.clone(), service)
    }

    pub fn notifications(&self) -> usize {
        self.notifier.messages.lock().unwrap().len()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigator.routes.lock().unwrap().clone()
    }
}

pub fn ok_json(body: serde_json::Value) -> Result<TransportResponse, TransportFailure> {
    Ok(TransportResponse::json(200, &body))
}
