use std::sync::Arc;

use crate::{
    clients::{ImageStore, PaymentGateway},
    config::AppConfig,
    db::OrmConn,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub images: Arc<dyn ImageStore>,
    pub payments: Arc<dyn PaymentGateway>,
}
