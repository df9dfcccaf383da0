//! # Adapter Layer
//!
//! An [`Adapter`] describes how a provider-neutral [`Payload`](crate::types::Payload)
//! becomes a provider-specific HTTP request: where it goes (`url`), what it carries
//! (`headers`, `parameters`, static `body` keys), how it is sent (`opts`, `raw`
//! transport flags), and which transformation [`Handlers`] shape the wire body.
//!
//! Adapters are immutable once handed to a [`Client`](crate::Client). Everything that
//! changes while a request is prepared (environment resolution, values set by the
//! `setup` handler) lives in a per-request [`RequestContext`] overlay, so concurrent
//! requests over the same adapter never observe each other's state.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`env`] | `${name}` placeholder resolution against an injectable environment |
//! | `handlers` | Optional capability set (`setup`, `form_messages`, ...) |
//! | `context` | Per-request overlay |
//! | `loader` | YAML / JSON adapter definitions |

mod context;
pub mod env;
mod handlers;
mod loader;

pub use context::RequestContext;
pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use handlers::{
    FormMessagesFn, FormParametersFn, FormToolsFn, Handlers, OnExitFn, SetBodyFn, SetupFn,
    TeardownFn,
};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Transport-facing switches of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterOpts {
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub compress: bool,
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "post".to_string()
}

impl Default for AdapterOpts {
    fn default() -> Self {
        Self {
            stream: false,
            compress: false,
            method: default_method(),
        }
    }
}

/// Default model of an adapter: either a fixed id or computed on demand.
#[derive(Clone)]
pub enum ModelDefault {
    Static(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl ModelDefault {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        ModelDefault::Dynamic(Arc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            ModelDefault::Static(s) => s.clone(),
            ModelDefault::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for ModelDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelDefault::Static(s) => f.debug_tuple("Static").field(s).finish(),
            ModelDefault::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

impl<'de> Deserialize<'de> for ModelDefault {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(ModelDefault::Static)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSchema {
    #[serde(default)]
    pub default: Option<ModelDefault>,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdapterSchema {
    #[serde(default)]
    pub model: ModelSchema,
}

/// Provider adapter definition.
///
/// Required fields when loaded from a file: `name`, `url`.
#[derive(Debug, Clone, Deserialize)]
pub struct Adapter {
    pub name: String,
    #[serde(default)]
    pub formatted_name: String,
    /// URL template; `${name}` placeholders are resolved per request.
    pub url: String,
    /// Placeholder table used by environment resolution.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub opts: AdapterOpts,
    /// Extra curl-style transport flags, applied after the built-in ones.
    #[serde(default)]
    pub raw: Vec<String>,
    /// Static top-level wire keys.
    #[serde(default)]
    pub body: Map<String, Value>,
    #[serde(default)]
    pub schema: AdapterSchema,
    #[serde(skip)]
    pub handlers: Handlers,
}

impl Adapter {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            formatted_name: name.clone(),
            name,
            url: url.into(),
            env: BTreeMap::new(),
            headers: BTreeMap::new(),
            parameters: Map::new(),
            opts: AdapterOpts::default(),
            raw: Vec::new(),
            body: Map::new(),
            schema: AdapterSchema::default(),
            handlers: Handlers::default(),
        }
    }

    pub fn with_formatted_name(mut self, formatted_name: impl Into<String>) -> Self {
        self.formatted_name = formatted_name.into();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_body_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.body.insert(key.into(), value);
        self
    }

    pub fn with_raw_flag(mut self, flag: impl Into<String>) -> Self {
        self.raw.push(flag.into());
        self
    }

    pub fn with_opts(mut self, opts: AdapterOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Shorthand for toggling `opts.stream`.
    pub fn streaming(mut self, stream: bool) -> Self {
        self.opts.stream = stream;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.opts.method = method.into();
        self
    }

    pub fn with_model(mut self, model: ModelDefault) -> Self {
        self.schema.model.default = Some(model);
        self
    }

    pub fn with_handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Resolve `schema.model.default`, invoking it when it is a function.
    pub fn default_model(&self) -> Option<String> {
        self.schema.model.default.as_ref().map(ModelDefault::resolve)
    }
}
