pub mod api_client;
pub mod dispatcher;
pub mod expiry_handler;

pub use api_client::ApiClient;
pub use dispatcher::RequestDispatcher;
pub use expiry_handler::{ChannelNavigator, ExpiryHandler, LogNotifier, Navigator, Notifier, SESSION_EXPIRED_MESSAGE};
