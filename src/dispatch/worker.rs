// src/dispatch/worker.rs
//
// Fire-and-forget delivery. The monitoring loop enqueues events without
// waiting; the worker fans each event out to every sink and interested
// notifier as independent tasks, in the order events arrive. Failures are
// logged and counted, never retried.

use super::notifier::Notifier;
use super::sink::EventSink;
use crate::pipeline::PipelineMetrics;
use crate::types::{EmittedEvent, EventCategory};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of one delivery attempt on one channel
struct Delivery {
    channel: String,
    category: EventCategory,
    result: Result<()>,
}

/// Loop-side handle. Cheap to clone, never blocks.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<EmittedEvent>,
}

impl Dispatcher {
    pub fn enqueue(&self, event: EmittedEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Dispatch queue closed, dropping {} event", e.0.category);
        }
    }
}

pub struct DispatchWorker {
    rx: mpsc::UnboundedReceiver<EmittedEvent>,
    sinks: Vec<Arc<dyn EventSink>>,
    notifiers: Vec<Arc<dyn Notifier>>,
    metrics: PipelineMetrics,
    shutdown_grace: Duration,
}

/// Build the queue. Dropping every `Dispatcher` lets the worker finish.
pub fn dispatch_channel(
    sinks: Vec<Arc<dyn EventSink>>,
    notifiers: Vec<Arc<dyn Notifier>>,
    metrics: PipelineMetrics,
    shutdown_grace: Duration,
) -> (Dispatcher, DispatchWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Dispatcher { tx },
        DispatchWorker {
            rx,
            sinks,
            notifiers,
            metrics,
            shutdown_grace,
        },
    )
}

impl DispatchWorker {
    pub async fn run(mut self) {
        info!(
            "📨 Dispatch worker started ({} sink(s), {} notifier(s))",
            self.sinks.len(),
            self.notifiers.len()
        );
        let mut in_flight: JoinSet<Delivery> = JoinSet::new();

        while let Some(event) = self.rx.recv().await {
            self.fan_out(&event, &mut in_flight);
            while let Some(joined) = in_flight.try_join_next() {
                self.settle(joined);
            }
        }

        self.drain(in_flight).await;
    }

    fn fan_out(&self, event: &EmittedEvent, in_flight: &mut JoinSet<Delivery>) {
        debug!("Dispatching {} ({})", event.category, event.id);

        for sink in &self.sinks {
            let sink = Arc::clone(sink);
            let event = event.clone();
            in_flight.spawn_blocking(move || Delivery {
                channel: sink.name().to_string(),
                category: event.category,
                result: sink.record(&event),
            });
        }

        for notifier in self.notifiers.iter().filter(|n| n.wants(event.category)) {
            let notifier = Arc::clone(notifier);
            let event = event.clone();
            in_flight.spawn(async move {
                let result = notifier.notify(&event).await;
                Delivery {
                    channel: notifier.name().to_string(),
                    category: event.category,
                    result,
                }
            });
        }
    }

    fn settle(&self, joined: Result<Delivery, tokio::task::JoinError>) {
        match joined {
            Ok(Delivery {
                result: Ok(()), ..
            }) => self.metrics.inc(&self.metrics.dispatch_successes),
            Ok(Delivery {
                channel,
                category,
                result: Err(e),
            }) => {
                error!("❌ {} delivery of '{}' failed: {:#}", channel, category, e);
                self.metrics.inc(&self.metrics.dispatch_failures);
            }
            Err(e) => {
                error!("❌ Delivery task aborted: {}", e);
                self.metrics.inc(&self.metrics.dispatch_failures);
            }
        }
    }

    /// Wait for in-flight deliveries, up to the grace period
    async fn drain(&self, mut in_flight: JoinSet<Delivery>) {
        if in_flight.is_empty() {
            return;
        }
        info!("⏳ Waiting for {} in-flight deliveries", in_flight.len());

        let wait = async {
            while let Some(joined) = in_flight.join_next().await {
                self.settle(joined);
            }
        };
        if tokio::time::timeout(self.shutdown_grace, wait).await.is_err() {
            warn!(
                "Shutdown grace of {:?} elapsed, leaving {} deliveries behind",
                self.shutdown_grace,
                in_flight.len()
            );
            in_flight.detach_all();
        }
    }
}
