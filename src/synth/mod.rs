/// Waveform synthesis: stateless functions from a sound description to samples.
use std::f32::consts::TAU;

use rand::Rng;

use crate::instrument::{InstrumentKind, Source};
use crate::{Result, TonegridError};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |acc, s| acc.max(s.abs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundDescriptor {
    Tone(f32),
    Percussion(InstrumentKind),
}

pub fn synthesize(
    sound: SoundDescriptor,
    duration_secs: f32,
    sample_rate: u32,
    volume: f32,
) -> Result<SampleBuffer> {
    match sound {
        SoundDescriptor::Tone(freq) => synthesize_tone(freq, duration_secs, sample_rate, volume),
        SoundDescriptor::Percussion(kind) => {
            synthesize_percussion(kind, duration_secs, sample_rate, volume)
        }
    }
}

/// `volume * sin(2π f t)` over `round(duration * rate)` samples.
pub fn synthesize_tone(
    frequency_hz: f32,
    duration_secs: f32,
    sample_rate: u32,
    volume: f32,
) -> Result<SampleBuffer> {
    if !frequency_hz.is_finite() {
        return Err(TonegridError::invalid("frequency_hz", frequency_hz));
    }
    let grid = time_grid(duration_secs, sample_rate)?;
    let samples = grid
        .map(|t| volume * (TAU * frequency_hz * t).sin())
        .collect();
    Ok(SampleBuffer::new(samples, sample_rate))
}

/// Evaluates the instrument's recipe sample by sample. Noise partials draw
/// fresh values on every call.
pub fn synthesize_percussion(
    kind: InstrumentKind,
    duration_secs: f32,
    sample_rate: u32,
    volume: f32,
) -> Result<SampleBuffer> {
    let grid = time_grid(duration_secs, sample_rate)?;
    let partials = kind.recipe().partials();
    let mut rng = rand::thread_rng();

    let samples = grid
        .map(|t| {
            partials
                .iter()
                .map(|p| {
                    let raw = match p.source {
                        Source::Sine(freq) => (TAU * freq * t).sin(),
                        Source::Noise => rng.gen_range(-1.0..1.0),
                    };
                    volume * p.gain * raw * (-p.decay * t).exp()
                })
                .sum::<f32>()
        })
        .collect();
    Ok(SampleBuffer::new(samples, sample_rate))
}

pub fn sample_count(duration_secs: f32, sample_rate: u32) -> usize {
    (duration_secs as f64 * sample_rate as f64).round() as usize
}

/// `n` instants evenly spaced over `[0, duration)`.
fn time_grid(duration_secs: f32, sample_rate: u32) -> Result<impl Iterator<Item = f32>> {
    if sample_rate == 0 {
        return Err(TonegridError::invalid("sample_rate", sample_rate));
    }
    if !(duration_secs > 0.0) || !duration_secs.is_finite() {
        return Err(TonegridError::invalid("duration_secs", duration_secs));
    }
    let n = sample_count(duration_secs, sample_rate);
    let step = duration_secs as f64 / n.max(1) as f64;
    Ok((0..n).map(move |i| (i as f64 * step) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const RATE: u32 = 44_100;

    #[test]
    fn tone_length_is_rounded_product() {
        assert_eq!(synthesize_tone(440.0, 0.4, RATE, 0.15).unwrap().len(), 17_640);
        assert_eq!(synthesize_tone(440.0, 0.15, RATE, 0.15).unwrap().len(), 6_615);
        assert_eq!(synthesize_tone(440.0, 1.0, 8_000, 0.15).unwrap().len(), 8_000);
        // 0.00001 s at 44.1 kHz is 0.441 samples
        assert_eq!(synthesize_tone(440.0, 0.00001, RATE, 0.15).unwrap().len(), 0);
    }

    #[test]
    fn tone_follows_sine() {
        let buf = synthesize_tone(1_000.0, 0.01, RATE, 0.5).unwrap();
        assert_abs_diff_eq!(buf.samples[0], 0.0);
        for (i, s) in buf.samples.iter().enumerate() {
            let t = i as f32 / RATE as f32;
            assert_abs_diff_eq!(*s, 0.5 * (TAU * 1_000.0 * t).sin(), epsilon = 1e-3);
        }
        assert!(buf.peak() <= 0.5 + 1e-6);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            synthesize_tone(440.0, 0.4, 0, 0.15),
            Err(TonegridError::InvalidParameter { name: "sample_rate", .. })
        ));
        assert!(matches!(
            synthesize_tone(440.0, 0.0, RATE, 0.15),
            Err(TonegridError::InvalidParameter { name: "duration_secs", .. })
        ));
        assert!(matches!(
            synthesize_percussion(InstrumentKind::Snare, -0.1, RATE, 0.18),
            Err(TonegridError::InvalidParameter { name: "duration_secs", .. })
        ));
    }

    fn assert_within_decaying_bound(kind: InstrumentKind) {
        let volume = 0.18;
        let buf = synthesize_percussion(kind, 0.15, RATE, volume).unwrap();
        let recipe = kind.recipe();
        let n = buf.len();
        let t = |i: usize| i as f32 * 0.15 / n as f32;

        for (i, s) in buf.samples.iter().enumerate() {
            assert!(
                s.abs() <= recipe.envelope_bound(t(i), volume) + 1e-6,
                "{kind} sample {i} escapes its envelope"
            );
        }

        let first = recipe.envelope_bound(t(0), volume);
        let middle = recipe.envelope_bound(t(n / 2), volume);
        let last = recipe.envelope_bound(t(n - 1), volume);
        assert!(first > middle && middle > last, "{kind} envelope must decay");
    }

    #[test]
    fn percussion_stays_inside_decaying_envelope() {
        for kind in [
            InstrumentKind::BassDrum,
            InstrumentKind::Snare,
            InstrumentKind::HiHat,
            InstrumentKind::Shaker,
            InstrumentKind::Djembe,
            InstrumentKind::Fallback,
        ] {
            assert_within_decaying_bound(kind);
        }
    }

    #[test]
    fn bass_drum_matches_formula() {
        let buf = synthesize_percussion(InstrumentKind::BassDrum, 0.15, RATE, 0.18).unwrap();
        let i = 300;
        let t = i as f32 * 0.15 / buf.len() as f32;
        let expected = 0.18 * (TAU * 60.0 * t).sin() * (-20.0 * t).exp();
        assert_abs_diff_eq!(buf.samples[i], expected, epsilon = 1e-6);
    }

    #[test]
    fn noise_is_drawn_fresh_each_call() {
        let a = synthesize_percussion(InstrumentKind::Snare, 0.05, RATE, 0.18).unwrap();
        let b = synthesize_percussion(InstrumentKind::Snare, 0.05, RATE, 0.18).unwrap();
        assert_eq!(a.len(), b.len());
        assert_ne!(a.samples, b.samples);
    }

    #[test]
    fn descriptor_dispatch() {
        let tone = synthesize(SoundDescriptor::Tone(220.0), 0.1, RATE, 0.15).unwrap();
        let drum = synthesize(
            SoundDescriptor::Percussion(InstrumentKind::Djembe),
            0.1,
            RATE,
            0.18,
        )
        .unwrap();
        assert_eq!(tone.len(), 4_410);
        assert_eq!(drum.len(), 4_410);
        assert_eq!(tone.sample_rate, RATE);
    }
}
