//! Optional adapter capabilities.
//!
//! Every hook is an `Option` of a shared closure, so "does this adapter form tools?"
//! is a type-level question instead of a runtime lookup.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::context::RequestContext;
use crate::compose::BodyComponents;
use crate::transport::HttpResponse;
use crate::types::{Message, Payload, ToolDefinition};

/// Runs once before anything is composed. An `Err` aborts the request.
pub type SetupFn = Arc<dyn Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync>;
pub type FormMessagesFn = Arc<dyn Fn(&RequestContext, &[Message]) -> BodyComponents + Send + Sync>;
pub type FormToolsFn =
    Arc<dyn Fn(&RequestContext, Option<&[ToolDefinition]>) -> BodyComponents + Send + Sync>;
/// Receives the resolved parameters, the messages, and whatever `tools` key the body holds so far.
pub type FormParametersFn = Arc<
    dyn Fn(&RequestContext, &Map<String, Value>, &[Message], Option<&Value>) -> BodyComponents
        + Send
        + Sync,
>;
pub type SetBodyFn = Arc<dyn Fn(&RequestContext, &Payload) -> BodyComponents + Send + Sync>;
pub type OnExitFn = Arc<dyn Fn(&RequestContext, &HttpResponse) + Send + Sync>;
pub type TeardownFn = Arc<dyn Fn(&RequestContext) + Send + Sync>;

/// The capability set of an adapter. Absent hooks are skipped.
#[derive(Clone, Default)]
pub struct Handlers {
    pub setup: Option<SetupFn>,
    pub form_messages: Option<FormMessagesFn>,
    pub form_tools: Option<FormToolsFn>,
    pub form_parameters: Option<FormParametersFn>,
    pub set_body: Option<SetBodyFn>,
    pub on_exit: Option<OnExitFn>,
    pub teardown: Option<TeardownFn>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generic handlers that place the payload on the wire unchanged:
    /// `messages` as given, `tools` when present, parameters plus `model` and `stream`.
    pub fn passthrough() -> Self {
        Self::new()
            .with_form_messages(|_, messages| {
                let mut out = Map::new();
                out.insert(
                    "messages".to_string(),
                    serde_json::to_value(messages).unwrap_or(Value::Null),
                );
                out
            })
            .with_form_tools(|_, tools| {
                let mut out = Map::new();
                if let Some(tools) = tools.filter(|t| !t.is_empty()) {
                    out.insert(
                        "tools".to_string(),
                        serde_json::to_value(tools).unwrap_or(Value::Null),
                    );
                }
                out
            })
            .with_form_parameters(|ctx, params, _, _| {
                let mut out = params.clone();
                if let Some(model) = &ctx.model {
                    out.entry("model")
                        .or_insert_with(|| Value::String(model.clone()));
                }
                if ctx.adapter().opts.stream {
                    out.insert("stream".to_string(), Value::Bool(true));
                }
                out
            })
    }

    pub fn with_setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(f));
        self
    }

    pub fn with_form_messages<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &[Message]) -> BodyComponents + Send + Sync + 'static,
    {
        self.form_messages = Some(Arc::new(f));
        self
    }

    pub fn with_form_tools<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, Option<&[ToolDefinition]>) -> BodyComponents + Send + Sync + 'static,
    {
        self.form_tools = Some(Arc::new(f));
        self
    }

    pub fn with_form_parameters<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Map<String, Value>, &[Message], Option<&Value>) -> BodyComponents
            + Send
            + Sync
            + 'static,
    {
        self.form_parameters = Some(Arc::new(f));
        self
    }

    pub fn with_set_body<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Payload) -> BodyComponents + Send + Sync + 'static,
    {
        self.set_body = Some(Arc::new(f));
        self
    }

    pub fn with_on_exit<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &HttpResponse) + Send + Sync + 'static,
    {
        self.on_exit = Some(Arc::new(f));
        self
    }

    pub fn with_teardown<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(f));
        self
    }

    /// Names of the hooks this set declares, in pipeline order.
    pub fn declared(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.setup.is_some() {
            out.push("setup");
        }
        if self.form_messages.is_some() {
            out.push("form_messages");
        }
        if self.form_tools.is_some() {
            out.push("form_tools");
        }
        if self.form_parameters.is_some() {
            out.push("form_parameters");
        }
        if self.set_body.is_some() {
            out.push("set_body");
        }
        if self.on_exit.is_some() {
            out.push("on_exit");
        }
        if self.teardown.is_some() {
            out.push("teardown");
        }
        out
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("declared", &self.declared())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_lists_hooks_in_pipeline_order() {
        let h = Handlers::new()
            .with_teardown(|_| {})
            .with_form_messages(|_, _| Map::new())
            .with_setup(|_| Ok(()));
        assert_eq!(h.declared(), vec!["setup", "form_messages", "teardown"]);
        assert_eq!(
            format!("{:?}", h),
            "Handlers { declared: [\"setup\", \"form_messages\", \"teardown\"] }"
        );
    }

    #[test]
    fn passthrough_declares_only_body_hooks() {
        assert_eq!(
            Handlers::passthrough().declared(),
            vec!["form_messages", "form_tools", "form_parameters"]
        );
    }
}
