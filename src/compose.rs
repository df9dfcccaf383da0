//! Body composition: merges the outputs of an adapter's handlers into one wire body.
//!
//! Steps run in a fixed order and each is skipped when its hook is absent:
//!
//! 1. `form_messages`
//! 2. `form_tools`
//! 3. `form_parameters` (sees whatever `tools` key steps 1-2 produced)
//! 4. the adapter's static `body` keys
//! 5. `set_body`
//!
//! Merging is a shallow union where a later step replaces a key from an earlier one.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::adapter::RequestContext;
use crate::types::Payload;

/// The merged mapping that becomes the serialized request body.
pub type BodyComponents = Map<String, Value>;

/// Compose the wire body for `payload` from the handlers of `ctx`'s adapter.
///
/// `ctx` must already be set up and environment-resolved; its `parameters` are the
/// base parameters handed to `form_parameters`.
pub fn compose(ctx: &RequestContext, payload: &Payload) -> BodyComponents {
    let handlers = &ctx.adapter().handlers;
    let mut body = BodyComponents::new();

    if let Some(form_messages) = &handlers.form_messages {
        merge(&mut body, form_messages(ctx, &payload.messages));
    }

    if let Some(form_tools) = &handlers.form_tools {
        merge(&mut body, form_tools(ctx, payload.tools.as_deref()));
    }

    if let Some(form_parameters) = &handlers.form_parameters {
        let params = form_parameters(ctx, &ctx.parameters, &payload.messages, body.get("tools"));
        merge(&mut body, params);
    }

    merge(&mut body, ctx.adapter().body.clone());

    if let Some(set_body) = &handlers.set_body {
        merge(&mut body, set_body(ctx, payload));
    }

    if !body.contains_key("messages") {
        warn!(
            adapter = ctx.adapter().name.as_str(),
            "composed body has no `messages` key"
        );
    }
    debug!(
        adapter = ctx.adapter().name.as_str(),
        keys = ?body.keys().collect::<Vec<_>>(),
        "composed request body"
    );

    body
}

/// Shallow union; keys from `from` replace keys already in `into`.
pub fn merge(into: &mut BodyComponents, from: BodyComponents) {
    for (k, v) in from {
        into.insert(k, v);
    }
}
