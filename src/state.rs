use crate::auth::{JwtKeys, TokenService};
use crate::config::AppConfig;
use crate::db::{Datastore, MySqlStore};
use crate::routes;
use crate::routing::RouteTable;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    pub tokens: Arc<dyn TokenService>,
    pub config: Arc<AppConfig>,
    pub routes: Arc<RouteTable>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        // Lazy pool: a dead database shows up as 503s, not a failed boot.
        let store = Arc::new(MySqlStore::from_config(&config)?) as Arc<dyn Datastore>;
        let tokens = Arc::new(JwtKeys::new(&config.jwt)) as Arc<dyn TokenService>;

        Self::from_parts(store, tokens, config)
    }

    pub fn from_parts(
        store: Arc<dyn Datastore>,
        tokens: Arc<dyn TokenService>,
        config: Arc<AppConfig>,
    ) -> anyhow::Result<Self> {
        let routes = Arc::new(routes::table()?);
        Ok(Self {
            store,
            tokens,
            config,
            routes,
        })
    }
}
