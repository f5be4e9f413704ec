/// Instrument catalog: percussion recipes and equal-tempered key tuning.
use std::fmt;
use std::str::FromStr;

use crate::{Result, TonegridError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    BassDrum,
    Snare,
    HiHat,
    Shaker,
    Djembe,
    /// Plain decaying 220 Hz blip. Only used when asked for by name.
    Fallback,
}

impl InstrumentKind {
    /// Kinds offered to a user picking a layer instrument.
    pub const SELECTABLE: [InstrumentKind; 5] = [
        InstrumentKind::BassDrum,
        InstrumentKind::Snare,
        InstrumentKind::HiHat,
        InstrumentKind::Shaker,
        InstrumentKind::Djembe,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InstrumentKind::BassDrum => "Bass Drum",
            InstrumentKind::Snare => "Snare",
            InstrumentKind::HiHat => "HiHat",
            InstrumentKind::Shaker => "Shaker",
            InstrumentKind::Djembe => "Djembe",
            InstrumentKind::Fallback => "Fallback",
        }
    }

    pub fn recipe(&self) -> Recipe {
        match self {
            InstrumentKind::BassDrum => Recipe(&BASS_DRUM),
            InstrumentKind::Snare => Recipe(&SNARE),
            InstrumentKind::HiHat => Recipe(&HI_HAT),
            InstrumentKind::Shaker => Recipe(&SHAKER),
            InstrumentKind::Djembe => Recipe(&DJEMBE),
            InstrumentKind::Fallback => Recipe(&FALLBACK),
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstrumentKind {
    type Err = TonegridError;

    fn from_str(s: &str) -> Result<Self> {
        SELECTABLE_AND_FALLBACK
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| TonegridError::UnknownInstrument(s.to_string()))
    }
}

const SELECTABLE_AND_FALLBACK: [InstrumentKind; 6] = [
    InstrumentKind::BassDrum,
    InstrumentKind::Snare,
    InstrumentKind::HiHat,
    InstrumentKind::Shaker,
    InstrumentKind::Djembe,
    InstrumentKind::Fallback,
];

/// Display names of the selectable instruments, in menu order.
pub fn instrument_kinds() -> Vec<&'static str> {
    InstrumentKind::SELECTABLE.iter().map(|k| k.name()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Source {
    Sine(f32),
    /// Uniform white noise in [-1, 1).
    Noise,
}

/// One exponentially decaying component: `gain * source(t) * e^(-decay * t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub source: Source,
    pub gain: f32,
    pub decay: f32,
}

const fn partial(source: Source, gain: f32, decay: f32) -> Partial {
    Partial {
        source,
        gain,
        decay,
    }
}

static BASS_DRUM: [Partial; 1] = [partial(Source::Sine(60.0), 1.0, 20.0)];
static SNARE: [Partial; 1] = [partial(Source::Noise, 1.0, 12.0)];
static HI_HAT: [Partial; 1] = [partial(Source::Noise, 1.0, 45.0)];
static SHAKER: [Partial; 1] = [partial(Source::Noise, 0.5, 30.0)];
static DJEMBE: [Partial; 2] = [
    partial(Source::Sine(100.0), 1.0, 16.0),
    partial(Source::Sine(330.0), 0.3, 30.0),
];
static FALLBACK: [Partial; 1] = [partial(Source::Sine(220.0), 1.0, 13.0)];

/// Sum of partials that makes up a percussion sound.
#[derive(Debug, Clone, Copy)]
pub struct Recipe(&'static [Partial]);

impl Recipe {
    pub fn partials(&self) -> &'static [Partial] {
        self.0
    }

    /// Upper bound of `|sample|` at time `t` for the given volume.
    pub fn envelope_bound(&self, t: f32, volume: f32) -> f32 {
        self.0
            .iter()
            .map(|p| volume * p.gain * (-p.decay * t).exp())
            .sum()
    }
}

/// Frequencies of `key_count` keys tuned upward from `base_hz` in 12-TET.
pub fn tonal_key_frequencies(base_hz: f64, key_count: usize) -> Result<Vec<f64>> {
    if !(base_hz > 0.0) || !base_hz.is_finite() {
        return Err(TonegridError::invalid("base_frequency_hz", base_hz));
    }
    let freqs: Vec<f64> = (0..key_count)
        .map(|i| base_hz * 2f64.powf(i as f64 / 12.0))
        .collect();
    // Keys past f64::MAX would collapse to inf and stop increasing.
    if freqs.last().is_some_and(|top| !top.is_finite()) {
        return Err(TonegridError::invalid("base_frequency_hz", base_hz));
    }
    Ok(freqs)
}

/// Button caption for a tonal key.
pub fn key_label(frequency_hz: f64) -> String {
    format!("{:.5} Hz", frequency_hz)
}
