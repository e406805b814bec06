use std::fmt;
use std::time::{Duration, Instant};

/// Single-shot stopwatch for one handled event.
///
/// A second `start` before `stop` silently replaces the first.
#[derive(Debug, Default)]
pub struct Latch {
    started: Option<Instant>,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Returns `None` when nothing was started.
    pub fn stop(&mut self, label: &'static str) -> Option<Measurement> {
        let started = self.started.take()?;
        Some(Measurement {
            label,
            elapsed: started.elapsed(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub label: &'static str,
    pub elapsed: Duration,
}

impl Measurement {
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.3} ms", self.label, self.millis())
    }
}
