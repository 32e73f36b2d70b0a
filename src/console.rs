//! Console status output
//!
//! Status lines are the program's output, so they go to stdout rather than
//! the log. Each line is mirrored to the log at info level. A capturing
//! console keeps the lines in memory instead, which is what tests inspect.

use crate::speech::{EventHandler, SynthesisEvent, SynthesisPhase};
use log::info;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub enum Console {
    Stdout,
    Capture(Arc<Mutex<Vec<String>>>),
}

impl Console {
    pub fn stdout() -> Self {
        Console::Stdout
    }

    pub fn capture() -> Self {
        Console::Capture(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn println(&self, line: &str) {
        info!("{}", line);
        match self {
            Console::Stdout => println!("{}", line),
            Console::Capture(lines) => lines
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(line.to_string()),
        }
    }

    /// Lines captured so far; always empty for stdout
    pub fn lines(&self) -> Vec<String> {
        match self {
            Console::Stdout => Vec::new(),
            Console::Capture(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

/// Status line for one synthesis event
pub fn event_line(event: &SynthesisEvent) -> String {
    match event.phase {
        SynthesisPhase::Started => "Synthesis started.".to_string(),
        SynthesisPhase::Progress => {
            format!("Synthesizing, audio chunk size {}.", event.audio_len)
        }
        SynthesisPhase::Completed => format!("Synthesized, audio length {}.", event.audio_len),
        SynthesisPhase::Canceled => "Received a cancellation.".to_string(),
    }
}

/// Event handler that prints a status line per event
pub struct ConsoleReporter {
    console: Console,
}

impl ConsoleReporter {
    pub fn new(console: Console) -> Arc<Self> {
        Arc::new(Self { console })
    }
}

impl EventHandler for ConsoleReporter {
    fn on_event(&self, event: &SynthesisEvent) {
        self.console.println(&event_line(event));
    }
}
