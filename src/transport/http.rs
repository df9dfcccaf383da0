use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::{Method, Proxy};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{HttpResponse, Transport, TransportConfig, TransportError, TransportEvent, WireRequest};

/// reqwest-backed transport.
///
/// A client is built per request from that request's [`TransportConfig`], since
/// adapters may change proxy, TLS and timeout settings independently.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_client(config: &TransportConfig) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.policy.connect_timeout)
            .tcp_keepalive(Some(config.policy.keepalive))
            .pool_idle_timeout(Some(config.policy.keepalive))
            .tcp_nodelay(config.tcp_nodelay)
            .danger_accept_invalid_certs(config.insecure);

        if !config.compressed {
            builder = builder.no_gzip();
        }
        if config.http1_only {
            builder = builder.http1_only();
        }
        if let Some(t) = config.max_time {
            builder = builder.timeout(t);
        }
        if let Some(proxy_url) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        Ok(builder.build()?)
    }

    fn build_request(client: &reqwest::Client, request: &WireRequest) -> reqwest::RequestBuilder {
        let mut req = client.request(request.method.clone(), &request.url);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }
        for (k, v) in &request.config.headers {
            req = req.header(k, v);
        }
        if request.method != Method::GET {
            req = req.body(request.body.clone());
        }
        req
    }

    /// Send with retries on connection-level failures. `None` means cancelled.
    async fn send(
        client: &reqwest::Client,
        request: &WireRequest,
        cancel: &CancellationToken,
    ) -> Option<Result<reqwest::Response, TransportError>> {
        let policy = request.config.policy;
        let mut attempt = 0u32;
        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => return None,
                r = Self::build_request(client, request).send() => r,
            };
            let err = match result {
                Ok(resp) => return Some(Ok(resp)),
                Err(e) => TransportError::Http(e),
            };
            if !err.is_retryable() || attempt >= policy.retries {
                return Some(Err(err));
            }
            attempt += 1;
            warn!(
                request_id = request.request_id,
                attempt,
                max_retries = policy.retries,
                error = %err,
                "transport attempt failed; retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(policy.retry_delay) => {}
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: WireRequest,
        events: mpsc::UnboundedSender<TransportEvent>,
        cancel: CancellationToken,
    ) {
        let start = Instant::now();
        debug!(
            request_id = request.request_id,
            method = %request.method,
            url = request.url.as_str(),
            flags = ?request.config.flags(),
            "dispatching request"
        );

        let client = match Self::build_client(&request.config) {
            Ok(c) => c,
            Err(e) => {
                let _ = events.send(TransportEvent::Failed(e));
                return;
            }
        };

        let response = match Self::send(&client, &request, &cancel).await {
            None => return,
            Some(Ok(resp)) => resp,
            Some(Err(e)) => {
                let _ = events.send(TransportEvent::Failed(e));
                return;
            }
        };

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());

        let body = if request.config.stream {
            let mut chunker = Utf8Chunker::default();
            let mut stream = response.bytes_stream();
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return,
                    n = stream.next() => n,
                };
                match next {
                    Some(Ok(bytes)) => {
                        if let Some(text) = chunker.push(&bytes) {
                            if events.send(TransportEvent::Chunk(text)).is_err() {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        let _ = events.send(TransportEvent::Failed(TransportError::Http(e)));
                        return;
                    }
                    None => break,
                }
            }
            if let Some(rest) = chunker.finish() {
                let _ = events.send(TransportEvent::Chunk(rest));
            }
            String::new()
        } else {
            let bytes = tokio::select! {
                _ = cancel.cancelled() => return,
                b = response.bytes() => b,
            };
            match bytes {
                Ok(b) => String::from_utf8_lossy(&b).into_owned(),
                Err(e) => {
                    let _ = events.send(TransportEvent::Failed(TransportError::Http(e)));
                    return;
                }
            }
        };

        info!(
            request_id = request.request_id,
            http_status = status,
            stream = request.config.stream,
            duration_ms = start.elapsed().as_millis(),
            "request completed"
        );
        let _ = events.send(TransportEvent::Complete(HttpResponse {
            status,
            headers,
            body,
        }));
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect()
}

/// Turns arbitrary byte frames into text chunks without splitting a UTF-8 sequence.
#[derive(Debug, Default)]
struct Utf8Chunker {
    pending: Vec<u8>,
}

impl Utf8Chunker {
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // truncated sequence at the end: hold it back for the next frame
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.pending.len(),
        };
        if complete == 0 {
            return None;
        }
        let rest = self.pending.split_off(complete);
        let head = std::mem::replace(&mut self.pending, rest);
        Some(String::from_utf8_lossy(&head).into_owned())
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunker_holds_back_split_code_points() {
        let mut c = Utf8Chunker::default();
        let bytes = "héllo".as_bytes();
        // split inside the two-byte 'é'
        assert_eq!(c.push(&bytes[..2]).as_deref(), Some("h"));
        assert_eq!(c.push(&bytes[2..]).as_deref(), Some("éllo"));
        assert_eq!(c.finish(), None);
    }

    #[test]
    fn chunker_flushes_trailing_garbage_lossily() {
        let mut c = Utf8Chunker::default();
        assert_eq!(c.push(&[0xE2, 0x82]), None);
        assert_eq!(c.finish().as_deref(), Some("\u{FFFD}"));
    }

    #[test]
    fn get_requests_carry_no_body() {
        let client = reqwest::Client::new();
        let mut request = WireRequest {
            request_id: 1,
            method: Method::GET,
            url: "http://localhost/x".to_string(),
            headers: BTreeMap::new(),
            body: bytes::Bytes::from_static(b"{}"),
            config: TransportConfig::new(Default::default(), false, false),
        };
        let built = HttpTransport::build_request(&client, &request).build().unwrap();
        assert!(built.body().is_none());

        request.method = Method::POST;
        let built = HttpTransport::build_request(&client, &request).build().unwrap();
        assert_eq!(built.body().and_then(|b| b.as_bytes()), Some(&b"{}"[..]));
    }
}
