//! Synthesis events and their delivery
//!
//! A synthesizer reports progress through four phases. Handlers are registered
//! per phase on an [`EventDispatcher`]; each speak call then emits its events
//! through an [`EventSequence`], which enforces the ordering rules:
//!
//! - `Started` comes first, anything emitted before it is dropped
//! - `Completed` and `Canceled` are terminal and mutually exclusive
//! - nothing is delivered once the owning client has been closed
//!
//! Handlers are invoked on the synthesis task, not on the caller awaiting the
//! outcome, so they must be `Send + Sync` and must not block.

use log::{debug, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Phase of a synthesis that an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisPhase {
    Started,
    Progress,
    Completed,
    Canceled,
}

impl SynthesisPhase {
    pub const ALL: [SynthesisPhase; 4] = [
        SynthesisPhase::Started,
        SynthesisPhase::Progress,
        SynthesisPhase::Completed,
        SynthesisPhase::Canceled,
    ];

    fn index(self) -> usize {
        match self {
            Self::Started => 0,
            Self::Progress => 1,
            Self::Completed => 2,
            Self::Canceled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

impl fmt::Display for SynthesisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "started",
            Self::Progress => "progress",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// One event of a running synthesis
///
/// `audio_len` is the size of the chunk just received for `Progress`, and the
/// total audio produced so far for every other phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisEvent {
    pub phase: SynthesisPhase,
    pub result_id: String,
    pub audio_len: usize,
}

/// Receives synthesis events for the phase it was subscribed to
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SynthesisEvent);
}

impl<F: Fn(&SynthesisEvent) + Send + Sync> EventHandler for F {
    fn on_event(&self, event: &SynthesisEvent) {
        self(event)
    }
}

/// Per-phase handler table shared between a client and its synthesis tasks
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<[Option<Arc<dyn EventHandler>>; 4]>,
    closed: AtomicBool,
}

impl EventDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the handler for a phase, replacing any previous one
    pub fn subscribe(&self, phase: SynthesisPhase, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        if handlers[phase.index()].replace(handler).is_some() {
            debug!("Replaced {} handler", phase);
        }
    }

    pub fn is_subscribed(&self, phase: SynthesisPhase) -> bool {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers[phase.index()].is_some()
    }

    /// Stop delivering events and release all handlers
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        *handlers = Default::default();
        debug!("Event dispatcher closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start the event sequence of one speak call
    pub fn sequence(self: &Arc<Self>, result_id: impl Into<String>) -> EventSequence {
        EventSequence {
            dispatcher: Arc::clone(self),
            result_id: result_id.into(),
            started: false,
            finished: false,
        }
    }

    fn deliver(&self, event: &SynthesisEvent) {
        // Clone the handler out so it runs without the table locked
        let handler = {
            let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
            handlers[event.phase.index()].clone()
        };
        if let Some(handler) = handler {
            // close() may have run while the table was unlocked
            if self.is_closed() {
                debug!("Dropping {} event for {}: client closed", event.phase, event.result_id);
                return;
            }
            handler.on_event(event);
        }
    }
}

/// Ordered emitter for the events of a single speak call
pub struct EventSequence {
    dispatcher: Arc<EventDispatcher>,
    result_id: String,
    started: bool,
    finished: bool,
}

impl EventSequence {
    pub fn result_id(&self) -> &str {
        &self.result_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Emit an event; returns whether it was delivered to the dispatcher
    pub fn emit(&mut self, phase: SynthesisPhase, audio_len: usize) -> bool {
        if self.dispatcher.is_closed() {
            debug!("Dropping {} event for {}: client closed", phase, self.result_id);
            return false;
        }
        if self.finished {
            warn!("Dropping {} event for {}: synthesis already finished", phase, self.result_id);
            return false;
        }
        match phase {
            SynthesisPhase::Started if self.started => {
                warn!("Dropping duplicate started event for {}", self.result_id);
                return false;
            }
            SynthesisPhase::Started => self.started = true,
            _ if !self.started => {
                warn!("Dropping {} event for {}: synthesis not started", phase, self.result_id);
                return false;
            }
            _ => {}
        }
        if phase.is_terminal() {
            self.finished = true;
        }

        let event = SynthesisEvent {
            phase,
            result_id: self.result_id.clone(),
            audio_len,
        };
        self.dispatcher.deliver(&event);
        true
    }
}
