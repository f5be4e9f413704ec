/// Audio output: the sink abstraction, the cpal device sink and the mixer
/// that every trigger goes through.
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use crate::synth::SampleBuffer;
use crate::{Result, TonegridError};

mod capture;
mod mixer;

pub use capture::{CaptureSink, Submission};
pub use mixer::{mix_down, Mixer};

/// Somewhere to play finished buffers. A new submission replaces whatever
/// is still sounding.
pub trait AudioSink: Send + Sync {
    fn submit(&self, buffer: SampleBuffer) -> Result<()>;
    fn stop_all(&self);
    fn is_available(&self) -> bool;
}

struct Voice {
    samples: Vec<f32>,
    position: f64,
    /// Source samples consumed per device frame.
    step: f64,
}

impl Voice {
    fn next_sample(&mut self) -> Option<f32> {
        let sample = *self.samples.get(self.position as usize)?;
        self.position += self.step;
        Some(sample)
    }
}

type VoiceSlot = Arc<Mutex<Option<Voice>>>;

/// Default output device via cpal.
///
/// `cpal::Stream` cannot cross threads, so it lives on its own thread for as
/// long as this value does; the callback and `submit` meet at the voice slot.
pub struct AudioOutput {
    voice: VoiceSlot,
    device_rate: Option<u32>,
    _shutdown: Option<mpsc::Sender<()>>,
}

impl AudioOutput {
    pub fn new() -> Result<Self> {
        let voice: VoiceSlot = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let stream_voice = Arc::clone(&voice);
        thread::Builder::new()
            .name("tonegrid-audio".into())
            .spawn(move || match Self::setup_audio_stream(stream_voice) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    // Returns once the AudioOutput drops its sender.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(reason) => {
                    let _ = ready_tx.send(Err(reason));
                }
            })
            .map_err(|e| TonegridError::SinkUnavailable(e.to_string()))?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| TonegridError::SinkUnavailable("audio thread exited".into()))?
            .map_err(TonegridError::SinkUnavailable)?;

        tracing::info!(device_rate, "audio output opened");
        Ok(Self {
            voice,
            device_rate: Some(device_rate),
            _shutdown: Some(shutdown_tx),
        })
    }

    /// A sink with no device behind it; every submission reports
    /// `SinkUnavailable`.
    pub fn disconnected() -> Self {
        Self {
            voice: Arc::new(Mutex::new(None)),
            device_rate: None,
            _shutdown: None,
        }
    }

    fn setup_audio_stream(voice: VoiceSlot) -> std::result::Result<(cpal::Stream, u32), String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no default output device".to_string())?;
        let supported = device
            .default_output_config()
            .map_err(|e| e.to_string())?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let rate = config.sample_rate.0;

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, voice),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, voice),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, voice),
            other => return Err(format!("unsupported sample format {other:?}")),
        }
        .map_err(|e| e.to_string())?;

        stream.play().map_err(|e| e.to_string())?;
        Ok((stream, rate))
    }

    fn lock_voice(&self) -> std::sync::MutexGuard<'_, Option<Voice>> {
        self.voice.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AudioSink for AudioOutput {
    fn submit(&self, buffer: SampleBuffer) -> Result<()> {
        let device_rate = self
            .device_rate
            .ok_or_else(|| TonegridError::SinkUnavailable("no output device".into()))?;
        if buffer.sample_rate == 0 {
            return Err(TonegridError::invalid("sample_rate", 0));
        }
        let step = buffer.sample_rate as f64 / device_rate as f64;
        *self.lock_voice() = Some(Voice {
            samples: buffer.samples,
            position: 0.0,
            step,
        });
        Ok(())
    }

    fn stop_all(&self) {
        *self.lock_voice() = None;
    }

    fn is_available(&self) -> bool {
        self.device_rate.is_some()
    }
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self::new().unwrap_or_else(|err| {
            tracing::warn!(%err, "continuing without audio output");
            Self::disconnected()
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice: VoiceSlot,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            write_frames(data, channels, &voice);
        },
        |err| tracing::warn!(%err, "audio stream error"),
        None,
    )
}

fn write_frames<T>(data: &mut [T], channels: usize, voice: &Mutex<Option<Voice>>)
where
    T: SizedSample + FromSample<f32>,
{
    let mut slot = voice.lock().unwrap_or_else(PoisonError::into_inner);
    for frame in data.chunks_mut(channels.max(1)) {
        let value = slot.as_mut().and_then(Voice::next_sample);
        if value.is_none() {
            *slot = None;
        }
        let value = T::from_sample(value.unwrap_or(0.0).clamp(-1.0, 1.0));
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}
