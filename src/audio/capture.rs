use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use super::AudioSink;
use crate::synth::SampleBuffer;
use crate::{Result, TonegridError};

#[derive(Debug, Clone)]
pub struct Submission {
    pub at: Instant,
    pub buffer: SampleBuffer,
}

#[derive(Debug, Default)]
struct Log {
    submissions: Vec<Submission>,
    stops: usize,
}

/// Headless sink that records what would have been played.
#[derive(Debug)]
pub struct CaptureSink {
    available: bool,
    latency: Duration,
    log: Mutex<Log>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            available: true,
            latency: Duration::ZERO,
            log: Mutex::new(Log::default()),
        }
    }

    /// Behaves like a device that failed to open.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Takes `latency` inside every `submit`, like a slow device driver.
    /// The recorded timestamp is taken on entry.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::new()
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.log().submissions.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.log().submissions.len()
    }

    pub fn stop_count(&self) -> usize {
        self.log().stops
    }

    fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CaptureSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for CaptureSink {
    fn submit(&self, buffer: SampleBuffer) -> Result<()> {
        if !self.available {
            return Err(TonegridError::SinkUnavailable("capture sink disabled".into()));
        }
        let at = Instant::now();
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        self.log().submissions.push(Submission { at, buffer });
        Ok(())
    }

    fn stop_all(&self) {
        self.log().stops += 1;
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
