use crate::config::Config;
use crate::observability::metrics::Metrics;
use crate::roster::RosterClient;
use crate::store::OrderStore;

pub struct AppState {
    pub store: OrderStore,
    pub roster: RosterClient,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            store: OrderStore::new(),
            roster: RosterClient::new(&config.roster_url, config.roster_timeout()),
            metrics: Metrics::new(),
        }
    }
}
