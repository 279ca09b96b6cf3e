//! First-caller-wins client registry.
//!
//! The first successful [`ClientRegistry::get_or_create`] call establishes the
//! client; every later call returns that same instance and **ignores its own
//! configuration**. [`ClientBuilder::build`](crate::ClientBuilder::build)
//! uses the process-wide [`ClientRegistry::global`]. Create a registry with
//! [`ClientRegistry::new`] to scope a client to an owner instead.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::NhanhError;

static GLOBAL: OnceLock<ClientRegistry> = OnceLock::new();

/// Holds at most one client, created exactly once.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    slot: Mutex<Option<Arc<Client>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static ClientRegistry {
        GLOBAL.get_or_init(ClientRegistry::new)
    }

    /// Return the established client, creating it from `config` if none
    /// exists yet.
    pub fn get_or_create(&self, config: ClientConfig) -> Result<Arc<Client>, NhanhError> {
        self.get_or_create_with(config, Client::new)
    }

    /// Like [`get_or_create`](Self::get_or_create), with a custom
    /// constructor. `factory` runs at most once per registry, under the lock.
    pub fn get_or_create_with<F>(
        &self,
        config: ClientConfig,
        factory: F,
    ) -> Result<Arc<Client>, NhanhError>
    where
        F: FnOnce(ClientConfig) -> Result<Client, NhanhError>,
    {
        let mut slot = self.slot.lock();

        if let Some(existing) = slot.as_ref() {
            if existing.config() != &config {
                tracing::warn!(
                    app_id = %existing.app_id(),
                    ignored_app_id = %config.app_id(),
                    "client already initialised; ignoring new configuration"
                );
            }
            return Ok(existing.clone());
        }

        let client = Arc::new(factory(config)?);
        tracing::debug!(app_id = %client.app_id(), "client initialised");
        *slot = Some(client.clone());
        Ok(client)
    }

    /// The established client, if any.
    pub fn current(&self) -> Option<Arc<Client>> {
        self.slot.lock().clone()
    }
}
