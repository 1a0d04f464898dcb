//! Wiring of the core services.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{AuthController, AuthSettings, SessionContext, SessionPersistence, SessionStore};
use crate::config::Config;
use crate::events::{UiEvent, UiEvents};

/// Everything a view layer needs, built from one `Config`.
pub struct Services {
    pub session: SessionContext,
    pub api: ApiClient,
    pub events: mpsc::UnboundedReceiver<UiEvent>,
}

impl Services {
    /// Build the services with the persistence backend named in the config.
    pub fn connect(config: &Config) -> Result<Self> {
        let persistence = config.session_persistence()?;
        Self::with_persistence(config, persistence)
    }

    pub fn with_persistence(
        config: &Config,
        persistence: Arc<dyn SessionPersistence>,
    ) -> Result<Self> {
        let (events, rx) = UiEvents::channel();

        let store = SessionStore::new(persistence);
        let restored = store.load();
        debug!(restored = restored.is_some(), "Startup session state");

        let api = ApiClient::new(
            &config.api_base_url(),
            config.request_timeout(),
            store.clone(),
            events.clone(),
        )?;
        let controller = AuthController::new(
            AuthSettings::from_config(config),
            api.clone(),
            store.clone(),
            events,
        );

        Ok(Self {
            session: SessionContext::new(controller, store),
            api,
            events: rx,
        })
    }
}
