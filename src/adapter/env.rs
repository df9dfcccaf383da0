//! Environment resolution for adapter fields.
//!
//! A placeholder `${name}` is resolved in this order:
//! 1. `name` is a key of the adapter's `env` table: if the entry names a set
//!    environment variable, that variable's value is used, otherwise the entry
//!    itself is the value.
//! 2. `name` is `model`: the request's resolved model.
//! 3. Otherwise the placeholder is left in place.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("placeholder pattern is a valid regex")
});

/// Source of environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed variable table, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub(crate) struct Resolver<'a> {
    table: &'a BTreeMap<String, String>,
    model: Option<&'a str>,
    source: &'a dyn EnvSource,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        table: &'a BTreeMap<String, String>,
        model: Option<&'a str>,
        source: &'a dyn EnvSource,
    ) -> Self {
        Self {
            table,
            model,
            source,
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(entry) = self.table.get(name) {
            return Some(self.source.var(entry).unwrap_or_else(|| entry.clone()));
        }
        if name == "model" {
            return self.model.map(str::to_string);
        }
        None
    }

    pub(crate) fn resolve_str(&self, input: &str) -> String {
        if !input.contains("${") {
            return input.to_string();
        }
        PLACEHOLDER
            .replace_all(input, |caps: &Captures| match self.lookup(&caps[1]) {
                Some(v) => v,
                None => {
                    tracing::debug!(placeholder = &caps[1], "unresolved adapter placeholder");
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    pub(crate) fn resolve_value(&self, value: &mut Value) {
        match value {
            Value::String(s) => *s = self.resolve_str(s),
            Value::Array(items) => items.iter_mut().for_each(|v| self.resolve_value(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.resolve_value(v)),
            _ => {}
        }
    }
}
