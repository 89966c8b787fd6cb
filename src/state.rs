use sqlx::PgPool;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::payment::{MockGateway, PaymentGateway};

/// Shared application state handed to every handler and job
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: DatabaseManager, config: AppConfig) -> Self {
        let gateway = Arc::new(MockGateway::new(config.fees.payment_success_rate));
        Self {
            db,
            config: Arc::new(config),
            gateway,
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}
