use std::{sync::Arc, time::Instant};

use crate::{
    auth::jwt::TokenService,
    config::AppConfig,
    users::{UserRepository, UserService},
};

/// Shared, read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub users: UserService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        tokens: Arc<TokenService>,
        repo: Arc<dyn UserRepository>,
    ) -> Self {
        let users = UserService::new(repo, config.max_page_limit);
        Self {
            config,
            tokens,
            users,
            started_at: Instant::now(),
        }
    }
}
