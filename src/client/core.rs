use bytes::Bytes;
use reqwest::Method;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::driver::RequestDriver;
use super::handle::RequestHandle;
use super::ids::IdGenerator;
use super::types::{Actions, AdapterSummary, Completed, RequestOptions, ResponseValue};
use crate::adapter::{Adapter, EnvSource, RequestContext};
use crate::artifact::Artifact;
use crate::compose::compose;
use crate::config::ClientConfig;
use crate::events::{self, EventBus, LifecycleEvent};
use crate::transport::{Transport, TransportConfig, WireRequest};
use crate::types::Payload;
use crate::{Error, ErrorContext, Result};

/// Dispatches requests for one adapter.
///
/// A client is cheap to share behind an `Arc`; every request gets its own
/// context, artifact, transport task and state machine.
pub struct Client {
    pub(crate) adapter: Arc<Adapter>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) events: Arc<dyn EventBus>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) env: Arc<dyn EnvSource>,
    pub(crate) config: ClientConfig,
}

impl Client {
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a request and return once it is on its way.
    ///
    /// Fails without contacting the network when the adapter's setup hook fails,
    /// when the resolved URL is invalid, or when the body cannot be persisted.
    /// Everything after that (chunks, the response, transport failures) is
    /// reported through `actions` and lifecycle events.
    pub async fn request(
        &self,
        payload: Payload,
        actions: Actions,
        mut options: RequestOptions,
    ) -> Result<RequestHandle> {
        let started = Instant::now();
        let mut ctx = RequestContext::new(self.adapter.clone());

        if let Some(setup) = self.adapter.handlers.setup.clone() {
            if let Err(e) = setup(&mut ctx) {
                warn!(
                    adapter = self.adapter.name.as_str(),
                    error = %e,
                    "adapter setup failed; request not sent"
                );
                return Err(Error::Setup {
                    adapter: self.adapter.name.clone(),
                    message: format!("{:#}", e),
                });
            }
        }

        ctx.resolve_env(self.env.as_ref());
        if let Err(e) = url::Url::parse(&ctx.url) {
            self.teardown(&ctx);
            return Err(Error::configuration_with_context(
                format!("invalid request url: {}", e),
                ErrorContext::new()
                    .with_field_path("url")
                    .with_details(ctx.url.clone())
                    .with_adapter(self.adapter.name.clone()),
            ));
        }

        let (artifact, body) = match self.prepare_body(&ctx, &payload).await {
            Ok(prepared) => prepared,
            Err(e) => {
                self.teardown(&ctx);
                return Err(e);
            }
        };

        let opts = &self.adapter.opts;
        let mut config = TransportConfig::new(self.config.policy, opts.stream, opts.compress);
        config.proxy = self.config.proxy.clone();
        config.apply_raw(&ctx.raw);

        let id = self.ids.next_id();
        let mut headers = ctx.headers.clone();
        if !headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("content-type"))
        {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        let wire = WireRequest {
            request_id: id,
            method: parse_method(&opts.method),
            url: ctx.url.clone(),
            headers,
            body,
            config,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let transport = self.transport.clone();
        let transport_cancel = cancel.clone();
        tokio::spawn(async move { transport.execute(wire, tx, transport_cancel).await });

        options.id = Some(id);
        options.status = None;
        options.adapter = Some(AdapterSummary {
            name: self.adapter.name.clone(),
            formatted_name: self.adapter.formatted_name.clone(),
            model: ctx.model.clone(),
        });
        events::emit(self.events.as_ref(), LifecycleEvent::RequestStarted, &options);
        info!(
            request_id = id,
            adapter = self.adapter.name.as_str(),
            stream = opts.stream,
            "request started"
        );

        let driver = RequestDriver {
            ctx,
            actions,
            options,
            events: self.events.clone(),
            artifact,
            config: self.config.clone(),
            rx,
            cancel: cancel.clone(),
            started,
        };
        let task = tokio::spawn(driver.run());
        Ok(RequestHandle::new(id, cancel, task))
    }

    /// Run a request to completion and collect what its callback received.
    ///
    /// A transport failure is returned as `Err`; HTTP error statuses are not.
    pub async fn send(&self, payload: Payload, options: RequestOptions) -> Result<Completed> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let actions = Actions::new(move |value| {
            let _ = tx.send(value);
        });
        let handle = self.request(payload, actions, options).await?;
        let status = handle.wait().await?;

        let mut chunks = Vec::new();
        let mut response = None;
        while let Ok(value) = rx.try_recv() {
            match value? {
                ResponseValue::Chunk(chunk) => chunks.push(chunk),
                ResponseValue::Complete(r) => response = Some(r),
            }
        }
        Ok(Completed {
            status,
            chunks,
            response,
        })
    }

    async fn prepare_body(
        &self,
        ctx: &RequestContext,
        payload: &Payload,
    ) -> Result<(Artifact, Bytes)> {
        let body = compose(ctx, payload);
        let serialized = serde_json::to_string(&body)?;
        let artifact = Artifact::persist(&self.config.artifact_dir, &serialized).await?;
        match artifact.read().await {
            Ok(bytes) => Ok((artifact, Bytes::from(bytes))),
            Err(e) => {
                let _ = artifact.remove().await;
                Err(e)
            }
        }
    }

    fn teardown(&self, ctx: &RequestContext) {
        if let Some(teardown) = &self.adapter.handlers.teardown {
            teardown(ctx);
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("adapter", &self.adapter.name)
            .field("config", &self.config)
            .finish()
    }
}

/// Case-insensitive method selection; empty or unsupported values fall back to POST.
pub(crate) fn parse_method(raw: &str) -> Method {
    match raw.trim().to_ascii_uppercase().as_str() {
        "" | "POST" => Method::POST,
        "GET" => Method::GET,
        "PUT" => Method::PUT,
        "PATCH" => Method::PATCH,
        "DELETE" => Method::DELETE,
        other => {
            warn!(method = other, "unsupported adapter method; using POST");
            Method::POST
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_selection() {
        assert_eq!(parse_method("get"), Method::GET);
        assert_eq!(parse_method(" Post "), Method::POST);
        assert_eq!(parse_method(""), Method::POST);
        assert_eq!(parse_method("fetch"), Method::POST);
    }

    #[test]
    fn debug_names_the_adapter() {
        let client = crate::client::ClientBuilder::new(Adapter::new("demo", "http://localhost"))
            .build()
            .unwrap();
        let rendered = format!("{:?}", client);
        assert!(rendered.contains("demo"));
    }
}
