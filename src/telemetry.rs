//! Structured intake events and the observer capability that receives them.
//!
//! Components never log through a global; they are handed an
//! `Arc<dyn IntakeObserver>` and emit `IntakeEvent`s through it.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extract::BodySource;

/// Which content source an extraction event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    RawStream,
    TextAccessor,
    HtmlAccessor,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RawStream => "raw-stream",
            Self::TextAccessor => "text-accessor",
            Self::HtmlAccessor => "html-accessor",
        }
    }
}

/// One step of an intake cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    CycleStarted { from: String, to: String },
    SourceRead { source: SourceKind, len: usize },
    SourceFailed { source: SourceKind, error: String },
    BodyExtracted { source: BodySource, len: usize },
    RelayAttempted { url: String },
    RelayFinished { outcome: String },
    Decided { accepted: bool, reason: Option<String> },
}

/// Receives intake events. Implementations must be cheap and non-blocking.
pub trait IntakeObserver: Send + Sync {
    fn on_event(&self, cycle: Uuid, event: IntakeEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl IntakeObserver for TracingObserver {
    fn on_event(&self, cycle: Uuid, event: IntakeEvent) {
        match event {
            IntakeEvent::CycleStarted { from, to } => {
                info!(%cycle, %from, %to, "Intake cycle started");
            }
            IntakeEvent::SourceRead { source, len } => {
                debug!(%cycle, source = source.label(), len, "Content source read");
            }
            IntakeEvent::SourceFailed { source, error } => {
                warn!(%cycle, source = source.label(), %error, "Content source failed");
            }
            IntakeEvent::BodyExtracted { source, len } => {
                debug!(%cycle, source = source.label(), len, "Body extracted");
            }
            IntakeEvent::RelayAttempted { url } => {
                debug!(%cycle, %url, "Relaying message");
            }
            IntakeEvent::RelayFinished { outcome } => {
                info!(%cycle, %outcome, "Relay finished");
            }
            IntakeEvent::Decided { accepted: true, .. } => {
                info!(%cycle, "Message accepted");
            }
            IntakeEvent::Decided { accepted: false, reason } => {
                warn!(%cycle, reason = reason.as_deref().unwrap_or(""), "Message rejected");
            }
        }
    }
}

/// Keeps every event in memory. Used by tests to assert on the cycle trace.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<IntakeEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<IntakeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl IntakeObserver for RecordingObserver {
    fn on_event(&self, _cycle: Uuid, event: IntakeEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Observer bound to a single cycle id.
#[derive(Clone)]
pub struct CycleEvents {
    cycle: Uuid,
    observer: Arc<dyn IntakeObserver>,
}

impl CycleEvents {
    pub fn new(observer: Arc<dyn IntakeObserver>) -> Self {
        Self {
            cycle: Uuid::new_v4(),
            observer,
        }
    }

    pub fn cycle(&self) -> Uuid {
        self.cycle
    }

    pub fn emit(&self, event: IntakeEvent) {
        self.observer.on_event(self.cycle, event);
    }
}
