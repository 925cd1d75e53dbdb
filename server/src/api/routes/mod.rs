//! API route handlers

pub mod auth;
pub mod health;

use std::sync::Arc;

use crate::auth::AuthResolver;
use crate::data::UserRepository;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AuthResolver>,
    pub users: Arc<dyn UserRepository>,
}
