use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::core::Client;
use super::ids::{IdGenerator, SequentialIds};
use crate::adapter::{Adapter, EnvSource, ProcessEnv};
use crate::config::{ClientConfig, LogLevel};
use crate::events::{EventBus, NoopEventBus};
use crate::transport::{HttpTransport, Transport, TransportPolicy};
use crate::{Error, ErrorContext, Result};

/// Builder for [`Client`].
///
/// Starts from [`ClientConfig::from_env`]; explicit setters win over the environment.
pub struct ClientBuilder {
    adapter: Adapter,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventBus>,
    ids: Arc<dyn IdGenerator>,
    env: Arc<dyn EnvSource>,
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            transport: Arc::new(HttpTransport::new()),
            events: Arc::new(NoopEventBus),
            ids: Arc::new(SequentialIds::new()),
            env: Arc::new(ProcessEnv),
            config: ClientConfig::from_env(),
        }
    }

    /// Replace the HTTP transport (tests use scripted transports).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Where lifecycle events go. Default drops them.
    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = bus;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Source for `${name}` placeholders. Default reads the process environment.
    pub fn env_source(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    /// Pin the verbosity used by the artifact retention policy.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = Some(level);
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.config.proxy = Some(url.into());
        self
    }

    pub fn transport_policy(mut self, policy: TransportPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.policy.retry_delay = delay;
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Client> {
        if self.adapter.url.trim().is_empty() {
            return Err(Error::validation_with_context(
                "adapter url must not be empty",
                ErrorContext::new()
                    .with_field_path("url")
                    .with_adapter(self.adapter.name.clone()),
            ));
        }
        let mut adapter = self.adapter;
        if adapter.formatted_name.is_empty() {
            adapter.formatted_name = adapter.name.clone();
        }
        Ok(Client {
            adapter: Arc::new(adapter),
            transport: self.transport,
            events: self.events,
            ids: self.ids,
            env: self.env,
            config: self.config,
        })
    }
}
