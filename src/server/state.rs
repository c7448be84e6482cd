use axum::extract::FromRef;

use crate::backend::BackendConnector;
use crate::config::AppConfig;
use std::sync::Arc;

pub type GuardedAppConfig = Arc<AppConfig>;
pub type GuardedConnector = Arc<dyn BackendConnector>;

/// Process-wide, read-only state. Nothing here is tied to a caller.
#[derive(Clone)]
pub struct ServerState {
    pub config: GuardedAppConfig,
    pub connector: GuardedConnector,
}

impl ServerState {
    pub fn new(config: AppConfig, connector: GuardedConnector) -> ServerState {
        ServerState {
            config: Arc::new(config),
            connector,
        }
    }
}

impl FromRef<ServerState> for GuardedAppConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedConnector {
    fn from_ref(input: &ServerState) -> Self {
        input.connector.clone()
    }
}
