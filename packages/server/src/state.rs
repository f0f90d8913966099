use std::sync::Arc;

use common::ImageStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub images: Arc<dyn ImageStore>,
}
