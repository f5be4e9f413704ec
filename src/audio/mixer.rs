use std::sync::{Arc, Mutex, PoisonError};

use super::AudioSink;
use crate::synth::SampleBuffer;
use crate::{Result, TonegridError};

/// Single entry point to the output sink for manual triggers and the
/// sequencer alike. Writers are serialized so a stop cannot interleave with
/// a half-finished submission.
pub struct Mixer {
    sink: Arc<dyn AudioSink>,
    writer: Mutex<()>,
}

impl Mixer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            writer: Mutex::new(()),
        }
    }

    /// Starts playing `buffer`, cutting off anything still sounding.
    pub fn submit(&self, mut buffer: SampleBuffer) -> Result<()> {
        if buffer.sample_rate == 0 {
            return Err(TonegridError::invalid("sample_rate", 0));
        }
        clamp(&mut buffer.samples);
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.sink.is_available() {
            return Err(TonegridError::SinkUnavailable("output device not open".into()));
        }
        self.sink.submit(buffer)
    }

    /// Sums sounds that start on the same instant and plays them as one.
    pub fn submit_mix(&self, buffers: Vec<SampleBuffer>) -> Result<()> {
        match mix_down(buffers)? {
            Some(mixed) => self.submit(mixed),
            None => Ok(()),
        }
    }

    pub fn stop_all(&self) {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.sink.stop_all();
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_available()
    }
}

/// Additive mix, clamped to `[-1, 1]`. The result is as long as the longest
/// input. All inputs must share one sample rate.
pub fn mix_down(buffers: Vec<SampleBuffer>) -> Result<Option<SampleBuffer>> {
    let mut iter = buffers.into_iter();
    let Some(mut mixed) = iter.next() else {
        return Ok(None);
    };
    for buffer in iter {
        if buffer.sample_rate != mixed.sample_rate {
            return Err(TonegridError::invalid("sample_rate", buffer.sample_rate));
        }
        if buffer.samples.len() > mixed.samples.len() {
            mixed.samples.resize(buffer.samples.len(), 0.0);
        }
        for (out, s) in mixed.samples.iter_mut().zip(buffer.samples) {
            *out += s;
        }
    }
    clamp(&mut mixed.samples);
    Ok(Some(mixed))
}

fn clamp(samples: &mut [f32]) {
    for s in samples {
        *s = s.clamp(-1.0, 1.0);
    }
}
