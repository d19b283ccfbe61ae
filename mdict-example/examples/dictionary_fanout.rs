//! Dictionary Fan-out Example
//!
//! This example runs a dictionary manager as a single reactor in front of a
//! simulated upstream provider:
//! - Several sessions ask for the same dictionary and share one FULL fetch
//! - A completion-only consumer loads every dictionary another service uses
//! - A late session is answered straight from the cache
//!
//! Requests travel to the provider task over one channel and its answers
//! come back over another; only the reactor loop touches the manager.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep, timeout};
use tracing::{info, warn};

use mdict::prelude::*;

mod common;
use common::{ExampleConfig, init_logging};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request sent to the simulated provider.
#[derive(Debug)]
enum UpstreamRequest {
    Info {
        stream: StreamId,
        service: String,
        dictionary: String,
    },
    Full {
        stream: StreamId,
        service: String,
        dictionary: String,
    },
    Cancel(StreamId),
}

/// Gateway forwarding requests to the provider task.
struct ChannelGateway {
    tx: mpsc::Sender<UpstreamRequest>,
}

impl ChannelGateway {
    fn send(&self, request: UpstreamRequest) -> std::result::Result<(), GatewayError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                GatewayError::Rejected("request queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => GatewayError::Disconnected,
        })
    }
}

impl UpstreamGateway for ChannelGateway {
    fn send_info_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> std::result::Result<(), GatewayError> {
        self.send(UpstreamRequest::Info {
            stream,
            service: service.to_string(),
            dictionary: dictionary.to_string(),
        })
    }

    fn send_full_request(
        &self,
        stream: StreamId,
        service: &str,
        dictionary: &str,
    ) -> std::result::Result<(), GatewayError> {
        self.send(UpstreamRequest::Full {
            stream,
            service: service.to_string(),
            dictionary: dictionary.to_string(),
        })
    }

    fn cancel(&self, stream: StreamId) {
        if self.send(UpstreamRequest::Cancel(stream)).is_err() {
            warn!(%stream, "could not forward cancel");
        }
    }
}

/// Upstream service publishing RWFFld and RWFEnum.
struct SimulatedProvider {
    service: String,
    dictionaries: HashMap<String, (DictionaryIdentity, Bytes)>,
    latency: Duration,
    full_fetches: Arc<AtomicUsize>,
}

impl SimulatedProvider {
    fn new(cfg: &ExampleConfig, full_fetches: Arc<AtomicUsize>) -> anyhow::Result<Self> {
        let fields: Vec<FieldDef> = (1..=cfg.field_count)
            .map(|fid| {
                let rwf_type = if fid % 2 == 0 { RwfType::Real } else { RwfType::Enum };
                FieldDef::new(
                    i16::try_from(fid).unwrap_or(i16::MAX),
                    format!("FIELD_{fid}"),
                    rwf_type,
                )
            })
            .collect();
        let tables = [EnumTable::new()
            .with_fid(4)
            .with_value(0, " ")
            .with_value(1, "ASE")
            .with_value(2, "NYS")];

        let mut dictionaries = HashMap::new();
        dictionaries.insert(
            "RWFFld".to_string(),
            (
                DictionaryIdentity::new("RWFFld", "4.20", DictionaryType::FieldDefinitions, 1),
                encode_field_definitions("RWFFld", "4.20", &fields)?,
            ),
        );
        dictionaries.insert(
            "RWFEnum".to_string(),
            (
                DictionaryIdentity::new("RWFEnum", "17.11", DictionaryType::EnumTables, 1),
                encode_enum_tables("RWFEnum", "17.11", &tables)?,
            ),
        );

        Ok(Self {
            service: cfg.provider.clone(),
            dictionaries,
            latency: cfg.latency,
            full_fetches,
        })
    }

    async fn run(
        self,
        mut requests: mpsc::Receiver<UpstreamRequest>,
        events: mpsc::Sender<UpstreamEvent>,
    ) {
        while let Some(request) = requests.recv().await {
            sleep(self.latency).await;
            for event in self.answer(request) {
                if events.send(event).await.is_err() {
                    return;
                }
            }
        }
    }

    fn answer(&self, request: UpstreamRequest) -> Vec<UpstreamEvent> {
        match request {
            UpstreamRequest::Info {
                stream,
                service,
                dictionary,
            } => match self.lookup(&service, &dictionary) {
                Some((identity, _)) => {
                    info!(%stream, %service, %dictionary, "provider: INFO");
                    vec![UpstreamEvent::info(stream, identity.clone())]
                }
                None => vec![not_found(stream, &dictionary)],
            },
            UpstreamRequest::Full {
                stream,
                service,
                dictionary,
            } => match self.lookup(&service, &dictionary) {
                Some((identity, payload)) => {
                    self.full_fetches.fetch_add(1, Ordering::Relaxed);
                    info!(%stream, %service, %dictionary, bytes = payload.len(), "provider: FULL in two parts");
                    let mid = payload.len() / 2;
                    vec![
                        UpstreamEvent::Refresh {
                            stream,
                            identity: identity.clone(),
                            complete: false,
                            payload: payload.slice(..mid),
                        },
                        UpstreamEvent::full(stream, identity.clone(), payload.slice(mid..)),
                    ]
                }
                None => vec![not_found(stream, &dictionary)],
            },
            UpstreamRequest::Cancel(stream) => {
                info!(%stream, "provider: stream cancelled");
                Vec::new()
            }
        }
    }

    fn lookup(&self, service: &str, dictionary: &str) -> Option<&(DictionaryIdentity, Bytes)> {
        if service != self.service {
            return None;
        }
        self.dictionaries.get(dictionary)
    }
}

fn not_found(stream: StreamId, dictionary: &str) -> UpstreamEvent {
    UpstreamEvent::status(
        stream,
        Status::closed_recover(format!("{dictionary} not found")).with_code(2),
    )
}

/// Consumer that logs and counts what it receives.
#[derive(Debug)]
struct LoggingConsumer {
    name: &'static str,
    responses: AtomicUsize,
    completions: AtomicUsize,
    failures: AtomicUsize,
}

impl LoggingConsumer {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            responses: AtomicUsize::new(0),
            completions: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }
}

impl DictionaryConsumer for LoggingConsumer {
    fn on_response(&self, handle: SessionHandle, response: &EncodedResponse) {
        self.responses.fetch_add(1, Ordering::Relaxed);
        info!(
            consumer = self.name,
            %handle,
            kind = ?response.kind(),
            bytes = response.bytes().len(),
            attempts = response.attempts(),
            "response"
        );
    }

    fn on_complete(&self, service: &str, schema: &Schema) {
        self.completions.fetch_add(1, Ordering::Relaxed);
        info!(
            consumer = self.name,
            service,
            fields = schema.field_count(),
            enum_tables = schema.enum_table_count(),
            "schema complete"
        );
    }

    fn on_failure(&self, handle: SessionHandle, error: &RequestError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(consumer = self.name, %handle, %error, "request failed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cfg = ExampleConfig::from_env();
    info!(?cfg, "starting dictionary fan-out demo");

    let (request_tx, request_rx) = mpsc::channel(cfg.channel_size);
    let (event_tx, mut event_rx) = mpsc::channel(cfg.channel_size);
    let full_fetches = Arc::new(AtomicUsize::new(0));
    let provider = SimulatedProvider::new(&cfg, Arc::clone(&full_fetches))?;
    tokio::spawn(provider.run(request_rx, event_tx));

    let mut manager = ManagerBuilder::new()
        .provides(&cfg.provider, "RWFFld")
        .provides(&cfg.provider, "RWFEnum")
        .uses(&cfg.consumer_service, "RWFFld")
        .uses(&cfg.consumer_service, "RWFEnum")
        .uses(&cfg.consumer_service, "RWFExtra")
        .build(ChannelGateway { tx: request_tx });

    let forwarder = Arc::new(LoggingConsumer::new("forwarder"));
    for _ in 0..cfg.sessions {
        manager.open(
            DictionaryRequest::new(&cfg.provider, "RWFFld").with_attrib_echo(true),
            forwarder.clone(),
        )?;
    }

    let loader = Arc::new(LoggingConsumer::new("loader"));
    for (dictionary, opened) in manager.open_used(&cfg.consumer_service, loader.clone()) {
        if let Err(e) = opened {
            warn!(%dictionary, error = %e, "dictionary unavailable");
        }
    }

    while manager.open_sessions() > 0 {
        let event = timeout(EVENT_TIMEOUT, event_rx.recv())
            .await
            .context("timed out waiting for upstream")?
            .context("upstream provider stopped")?;
        manager.handle_event(event)?;
    }

    let late = Arc::new(LoggingConsumer::new("late"));
    manager.open(
        DictionaryRequest::new(&cfg.provider, "RWFFld").with_filter(Filter::Info),
        late.clone(),
    )?;

    info!(
        sessions = cfg.sessions,
        full_fetches = full_fetches.load(Ordering::Relaxed),
        cached = manager.store().len(),
        forwarded = forwarder.responses.load(Ordering::Relaxed),
        completions = loader.completions.load(Ordering::Relaxed),
        late = late.responses.load(Ordering::Relaxed),
        "demo finished"
    );
    Ok(())
}
