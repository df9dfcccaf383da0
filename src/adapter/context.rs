use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::env::{self, EnvSource};
use super::Adapter;

/// Per-request view of an adapter.
///
/// Created from the shared adapter at the start of every request. Handlers and
/// environment resolution only ever write here, never to the [`Adapter`] itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
    adapter: Arc<Adapter>,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub parameters: Map<String, Value>,
    pub raw: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub model: Option<String>,
    /// Scratch space shared between the hooks of one request.
    pub state: Map<String, Value>,
}

impl RequestContext {
    pub fn new(adapter: Arc<Adapter>) -> Self {
        Self {
            url: adapter.url.clone(),
            headers: adapter.headers.clone(),
            parameters: adapter.parameters.clone(),
            raw: adapter.raw.clone(),
            env: adapter.env.clone(),
            model: adapter.default_model(),
            state: Map::new(),
            adapter,
        }
    }

    /// The immutable adapter definition this request was created from.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Resolve `${name}` placeholders in url, headers, parameters and raw flags.
    ///
    /// Each field is resolved independently against the same variable table.
    pub fn resolve_env(&mut self, source: &dyn EnvSource) {
        let resolver = env::Resolver::new(&self.env, self.model.as_deref(), source);
        self.url = resolver.resolve_str(&self.url);
        for value in self.headers.values_mut() {
            *value = resolver.resolve_str(value);
        }
        for value in self.parameters.values_mut() {
            resolver.resolve_value(value);
        }
        for flag in self.raw.iter_mut() {
            *flag = resolver.resolve_str(flag);
        }
    }
}
