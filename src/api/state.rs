use std::sync::Arc;

use crate::dashboard::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DashboardService>,
}
