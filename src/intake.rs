//! Intake controller. Runs one message through validate → extract →
//! normalize → relay → decide and returns accept or reject to the transport.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::config::RelayConfig;
use crate::error::{ConfigError, IntakeError};
use crate::extract::{ContentExtractor, ExtractedContent};
use crate::message::InboundMessage;
use crate::normalize::{NormalizedRecord, normalize};
use crate::relay::{RelayClient, RelayOutcome};
use crate::telemetry::{CycleEvents, IntakeEvent, IntakeObserver, TracingObserver};

/// What the transport is told at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(String),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Accept => None,
            Self::Reject(reason) => Some(reason),
        }
    }
}

/// Cycle state. `Decide` is terminal.
#[derive(Debug)]
enum Stage {
    ValidateConfig,
    Extract,
    Normalize(ExtractedContent),
    Relay(NormalizedRecord),
    Decide(RelayOutcome),
}

pub struct IntakeController {
    extractor: ContentExtractor,
    relay: RelayClient,
    observer: Arc<dyn IntakeObserver>,
}

impl IntakeController {
    pub fn new(relay: RelayClient) -> Self {
        Self::with_observer(relay, Arc::new(TracingObserver))
    }

    pub fn with_observer(relay: RelayClient, observer: Arc<dyn IntakeObserver>) -> Self {
        Self {
            extractor: ContentExtractor::new(),
            relay,
            observer,
        }
    }

    /// Process one message. Never panics and never returns an error: every
    /// failure ends as `Decision::Reject` with a reason.
    pub async fn process(&self, message: &dyn InboundMessage, config: &RelayConfig) -> Decision {
        let events = CycleEvents::new(Arc::clone(&self.observer));

        let result = AssertUnwindSafe(self.run(message, config, &events))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(IntakeError::Internal(panic_message(panic.as_ref()))));

        let decision = match result {
            Ok(()) => Decision::Accept,
            Err(e) => Decision::Reject(e.to_string()),
        };

        let observer = Arc::clone(&self.observer);
        let cycle = events.cycle();
        let decided = IntakeEvent::Decided {
            accepted: decision.is_accept(),
            reason: decision.reason().map(str::to_string),
        };
        // A faulty observer must not turn a decision into a panic.
        let _ = std::panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(cycle, decided)));

        decision
    }

    async fn run(
        &self,
        message: &dyn InboundMessage,
        config: &RelayConfig,
        events: &CycleEvents,
    ) -> Result<(), IntakeError> {
        let mut stage = Stage::ValidateConfig;

        loop {
            stage = match stage {
                Stage::ValidateConfig => {
                    config.require().map_err(config_reason)?;
                    events.emit(IntakeEvent::CycleStarted {
                        from: message.envelope_from().to_string(),
                        to: message.envelope_to().to_string(),
                    });
                    Stage::Extract
                }
                Stage::Extract => Stage::Normalize(self.extractor.extract(message, events).await),
                Stage::Normalize(extracted) => Stage::Relay(normalize(message, extracted)),
                Stage::Relay(record) => {
                    if let Some(endpoint) = config.endpoint() {
                        events.emit(IntakeEvent::RelayAttempted {
                            url: RelayClient::emails_url(endpoint),
                        });
                    }
                    let outcome = self.relay.deliver(&record, config).await;
                    events.emit(IntakeEvent::RelayFinished {
                        outcome: outcome.to_string(),
                    });
                    Stage::Decide(outcome)
                }
                Stage::Decide(outcome) => {
                    return outcome.into_result().map(|_| ()).map_err(IntakeError::from);
                }
            };
        }
    }
}

fn config_reason(err: ConfigError) -> IntakeError {
    match err {
        ConfigError::MissingRequired { hint, .. } => IntakeError::Configuration(hint),
        other => IntakeError::Configuration(other.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
