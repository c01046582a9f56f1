//! 用户资料服务

use crate::clients::ApiClient;
use crate::config::ServiceTarget;
use crate::error::{AppError, AppResult};
use crate::models::resource::UserProfile;

const PROFILE_PATH: &str = "/api/user/profile";

pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.for_service(ServiceTarget::Consumer),
        }
    }

    /// 当前登录用户的资料
    pub async fn profile(&self) -> AppResult<UserProfile> {
        let envelope = self.client.get(PROFILE_PATH, None, &[]).await?.ensure_success()?;
        envelope.into_data()?.ok_or_else(|| AppError::Rejected {
            code: 404,
            message: "用户资料为空".to_string(),
        })
    }
}
