pub mod accessor;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod memory;
pub mod opener;
pub mod ports;
pub mod retry;
pub mod send_intent;

use std::sync::Arc;

use opush_core::Event;
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, error, info};

pub use dispatcher::{Collaborators, Dispatcher, Disposition};
pub use error::{DispatchError, OpenError};
pub use send_intent::{PendingDevicePicker, SendIntent, send_intent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
    pub handled: usize,
    pub ignored: usize,
    pub aborted: usize,
    pub panicked: usize,
}

impl ServiceReport {
    fn record(&mut self, joined: Result<Disposition, tokio::task::JoinError>) {
        match joined {
            Ok(Disposition::Handled) => self.handled += 1,
            Ok(Disposition::Ignored) => self.ignored += 1,
            Ok(Disposition::Aborted(_)) => self.aborted += 1,
            Err(err) => {
                error!("event task failed: {}", err);
                self.panicked += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) -> Result<(), String> {
        self.tx
            .send(event)
            .map_err(|err| format!("dispatch service stopped, dropped {}", err.0.name()))
    }
}

/// Feeds events to a [`Dispatcher`], each on its own blocking task.
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
    rx: mpsc::UnboundedReceiver<Event>,
}

pub fn channel(dispatcher: Dispatcher) -> (EventSender, DispatchService) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender { tx },
        DispatchService {
            dispatcher: Arc::new(dispatcher),
            rx,
        },
    )
}

impl DispatchService {
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Runs until every [`EventSender`] is dropped and all started events finished.
    pub async fn run(mut self) -> ServiceReport {
        let mut report = ServiceReport::default();
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                next = self.rx.recv() => {
                    match next {
                        Some(event) => {
                            debug!("event received: {}", event.name());
                            let dispatcher = Arc::clone(&self.dispatcher);
                            in_flight.spawn_blocking(move || dispatcher.dispatch(event));
                        }
                        None => break,
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    report.record(joined);
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            report.record(joined);
        }

        info!(
            handled = report.handled,
            ignored = report.ignored,
            aborted = report.aborted,
            panicked = report.panicked,
            "dispatch service stopped"
        );
        report
    }
}
