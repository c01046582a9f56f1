//! 基础设施层
//!
//! 持有会话状态与 HTTP 连接，只暴露能力，不处理业务。

pub mod session_store;
pub mod storage;
pub mod transport;

pub use session_store::{SessionStore, TokenSnapshot};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StoredSession};
pub use transport::{ReqwestTransport, Transport, TransportFailure, TransportRequest, TransportResponse};
