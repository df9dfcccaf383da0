//! ai-dispatch: send one payload through an adapter definition.
//!
//! Usage:
//!   ai-dispatch <adapter.yaml|adapter.json> <payload.json> [--silent] [--event <suffix>]

use std::io::Write;
use std::sync::Arc;

use ai_lib_dispatch::adapter::{Adapter, Handlers};
use ai_lib_dispatch::events::{self, BroadcastEventBus};
use ai_lib_dispatch::types::Payload;
use ai_lib_dispatch::{Actions, ClientBuilder, RequestOptions, RequestStatus, ResponseValue};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

struct Args {
    adapter: String,
    payload: String,
    silent: bool,
    event: Option<String>,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut silent = false;
    let mut event = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--silent" => silent = true,
            "--event" => {
                event = Some(iter.next().context("--event needs a suffix")?.clone());
            }
            "help" | "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other if other.starts_with("--") => anyhow::bail!("unknown option: {other}"),
            other => positional.push(other.to_string()),
        }
    }
    match positional.as_slice() {
        [adapter, payload] => Ok(Args {
            adapter: adapter.clone(),
            payload: payload.clone(),
            silent,
            event,
        }),
        _ => anyhow::bail!("expected <adapter> and <payload> arguments"),
    }
}

fn print_usage() {
    println!(
        r#"ai-dispatch: send one request through an adapter

USAGE:
    ai-dispatch <ADAPTER> <PAYLOAD> [--silent] [--event <SUFFIX>]

ARGS:
    <ADAPTER>    Adapter definition (.yaml, .yml or .json)
    <PAYLOAD>    JSON payload: {{"messages": [...], "tools": [...]}}

ENVIRONMENT:
    RUST_LOG               Log filter (default: info)
    AI_LIB_ARTIFACT_DIR    Directory for request body artifacts
    AI_LIB_LOG_LEVEL       Level used by the artifact retention policy
    AI_PROXY_URL           Proxy for all requests"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e:#}\n");
            print_usage();
            std::process::exit(2);
        }
    };

    let mut adapter = Adapter::from_file(&args.adapter)
        .await
        .with_context(|| format!("loading adapter {}", args.adapter))?;
    if adapter.handlers.declared().is_empty() {
        adapter.handlers = Handlers::passthrough();
    }

    let raw = tokio::fs::read_to_string(&args.payload)
        .await
        .with_context(|| format!("reading payload {}", args.payload))?;
    let payload: Payload = serde_json::from_str(&raw).context("parsing payload")?;

    let bus = Arc::new(BroadcastEventBus::default());
    tokio::spawn(events::consume(bus.subscribe(), |fired| {
        tracing::debug!(event = fired.name.as_str(), id = ?fired.options.id, "lifecycle");
    }));

    let client = ClientBuilder::new(adapter).event_bus(bus).build()?;

    let actions = Actions::new(|value| match value {
        Ok(ResponseValue::Chunk(chunk)) => {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(chunk.as_bytes());
            let _ = out.flush();
        }
        Ok(ResponseValue::Complete(response)) => {
            if response.is_error() {
                eprintln!("HTTP {}", response.status);
            }
            println!("{}", response.body);
        }
        Err(e) => eprintln!("request failed: {e}"),
    });

    let mut options = RequestOptions::new().silent(args.silent);
    if let Some(suffix) = args.event {
        options = options.event(suffix);
    }

    let handle = client.request(payload, actions, options).await?;
    let canceller = handle.cancel_handle();
    let mut finished = Box::pin(handle.wait());
    let status = tokio::select! {
        status = &mut finished => status?,
        _ = tokio::signal::ctrl_c() => {
            canceller.cancel();
            finished.await?
        }
    };
    println!();

    if status != RequestStatus::Success {
        anyhow::bail!("request finished with status {status}");
    }
    Ok(())
}
