/// Core sequencer logic - layer editing and the per-session snapshot the
/// playback worker steps through.
use std::time::Duration;

use crate::config::{validate_bpm, STEPS_PER_MEASURE};
use crate::instrument::InstrumentKind;
use crate::pattern::{Pattern, PatternBank};
use crate::{Result, TonegridError};

pub mod playback;

/// One rhythm track as the user edits it: which drum plays which pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub instrument: InstrumentKind,
    pub pattern: String,
}

impl Layer {
    pub fn new(instrument: InstrumentKind, pattern: impl Into<String>) -> Self {
        Self {
            instrument,
            pattern: pattern.into(),
        }
    }

    /// `"<first 8 chars of instrument> (<pattern>)"`, used as a preview row label.
    pub fn label(&self) -> String {
        let short: String = self.instrument.name().chars().take(8).collect();
        format!("{} ({})", short, self.pattern)
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::new(InstrumentKind::BassDrum, "Four-on-the-Floor")
    }
}

/// The live, user-facing layer list. Always holds between 1 and `max` layers.
#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    max: usize,
}

impl LayerStack {
    pub fn new(max: usize) -> Self {
        Self {
            layers: vec![Layer::default()],
            max: max.max(1),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.layers.len() >= self.max
    }

    /// Appends the default new layer (snare on a backbeat) and returns its index.
    pub fn add(&mut self) -> Result<usize> {
        self.push(Layer::new(InstrumentKind::Snare, "Backbeat"))
    }

    pub fn push(&mut self, layer: Layer) -> Result<usize> {
        if self.is_full() {
            return Err(TonegridError::LayerLimit { max: self.max });
        }
        self.layers.push(layer);
        Ok(self.layers.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Result<Layer> {
        if index >= self.layers.len() {
            return Err(TonegridError::LayerIndex(index));
        }
        if self.layers.len() == 1 {
            return Err(TonegridError::LastLayer);
        }
        Ok(self.layers.remove(index))
    }

    pub fn set_instrument(&mut self, index: usize, instrument: InstrumentKind) -> Result<()> {
        self.layer_mut(index)?.instrument = instrument;
        Ok(())
    }

    /// Points a layer at another pattern; the name must exist in `bank`.
    pub fn set_pattern(&mut self, index: usize, name: &str, bank: &PatternBank) -> Result<()> {
        let pattern = bank.resolve(name)?.name().to_string();
        self.layer_mut(index)?.pattern = pattern;
        Ok(())
    }

    /// Label and step-grid row for every layer.
    pub fn preview(&self, bank: &PatternBank) -> Result<Vec<(String, String)>> {
        self.layers
            .iter()
            .map(|layer| Ok((layer.label(), bank.resolve(&layer.pattern)?.render())))
            .collect()
    }

    fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        self.layers
            .get_mut(index)
            .ok_or(TonegridError::LayerIndex(index))
    }
}

/// A layer with its pattern already resolved, frozen for one playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub instrument: InstrumentKind,
    pub pattern: Pattern,
}

/// Everything a running sequencer needs, copied out of the live layer list
/// at start so later edits cannot reach it.
#[derive(Debug, Clone)]
pub struct SequencerSession {
    tracks: Vec<Track>,
    bpm: u32,
    current_step: usize,
}

impl SequencerSession {
    pub fn new(layers: &[Layer], bpm: u32, bank: &PatternBank) -> Result<Self> {
        validate_bpm(bpm)?;
        let tracks = layers
            .iter()
            .map(|layer| {
                Ok(Track {
                    instrument: layer.instrument,
                    pattern: bank.resolve(&layer.pattern)?.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tracks,
            bpm,
            current_step: 0,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_interval(&self) -> Duration {
        step_interval(self.bpm)
    }

    pub fn advance_step(&mut self) -> usize {
        self.current_step = (self.current_step + 1) % STEPS_PER_MEASURE;
        self.current_step
    }

    /// Instruments whose pattern has a hit on `step`, in layer order.
    pub fn active_instruments(&self, step: usize) -> Vec<InstrumentKind> {
        self.tracks
            .iter()
            .filter(|track| track.pattern.is_active(step))
            .map(|track| track.instrument)
            .collect()
    }
}

/// Eighth-note length at `bpm`: eight steps per measure.
pub fn step_interval(bpm: u32) -> Duration {
    Duration::from_secs_f64(60.0 / bpm.max(1) as f64 / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_interval_is_an_eighth_note() {
        assert_eq!(step_interval(120), Duration::from_millis(250));
        assert_eq!(step_interval(60), Duration::from_millis(500));
        assert_eq!(step_interval(300), Duration::from_millis(100));
    }

    #[test]
    fn starts_with_one_default_layer() {
        let stack = LayerStack::new(5);
        assert_eq!(stack.layers(), &[Layer::new(InstrumentKind::BassDrum, "Four-on-the-Floor")]);
    }

    #[test]
    fn refuses_to_remove_last_layer() {
        let mut stack = LayerStack::new(5);
        assert!(matches!(stack.remove(0), Err(TonegridError::LastLayer)));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn refuses_sixth_layer() {
        let mut stack = LayerStack::new(5);
        for _ in 0..4 {
            stack.add().unwrap();
        }
        assert!(stack.is_full());
        assert!(matches!(stack.add(), Err(TonegridError::LayerLimit { max: 5 })));
        assert_eq!(stack.len(), 5);
        assert_eq!(stack.layers()[4], Layer::new(InstrumentKind::Snare, "Backbeat"));
    }

    #[test]
    fn remove_by_index() {
        let mut stack = LayerStack::new(5);
        stack.add().unwrap();
        let removed = stack.remove(0).unwrap();
        assert_eq!(removed.instrument, InstrumentKind::BassDrum);
        assert_eq!(stack.layers()[0].instrument, InstrumentKind::Snare);
        assert!(matches!(stack.remove(3), Err(TonegridError::LayerIndex(3))));
    }

    #[test]
    fn set_pattern_validates_name() {
        let bank = PatternBank::builtin();
        let mut stack = LayerStack::new(5);
        stack.set_pattern(0, "Shuffle", &bank).unwrap();
        assert_eq!(stack.layers()[0].pattern, "Shuffle");
        assert!(matches!(
            stack.set_pattern(0, "Waltz", &bank),
            Err(TonegridError::UnknownPattern(_))
        ));
        assert_eq!(stack.layers()[0].pattern, "Shuffle");
    }

    #[test]
    fn preview_rows() {
        let bank = PatternBank::builtin();
        let mut stack = LayerStack::new(5);
        stack.add().unwrap();
        stack.set_instrument(1, InstrumentKind::Djembe).unwrap();
        let rows = stack.preview(&bank).unwrap();
        assert_eq!(rows[0].0, "Bass Dru (Four-on-the-Floor)");
        assert_eq!(rows[0].1, "█   █   █   █  ");
        assert_eq!(rows[1].0, "Djembe (Backbeat)");
    }

    #[test]
    fn session_snapshot_ignores_later_edits() {
        let bank = PatternBank::builtin();
        let mut stack = LayerStack::new(5);
        let session = SequencerSession::new(stack.layers(), 120, &bank).unwrap();

        stack.set_instrument(0, InstrumentKind::HiHat).unwrap();
        stack.set_pattern(0, "Shuffle", &bank).unwrap();
        stack.add().unwrap();

        assert_eq!(session.tracks().len(), 1);
        assert_eq!(session.tracks()[0].instrument, InstrumentKind::BassDrum);
        assert_eq!(session.tracks()[0].pattern.name(), "Four-on-the-Floor");
    }

    #[test]
    fn session_rejects_bad_input() {
        let bank = PatternBank::builtin();
        let layers = [Layer::default()];
        assert!(matches!(
            SequencerSession::new(&layers, 29, &bank),
            Err(TonegridError::InvalidParameter { name: "bpm", .. })
        ));
        let layers = [Layer::new(InstrumentKind::Snare, "Polka")];
        assert!(matches!(
            SequencerSession::new(&layers, 120, &bank),
            Err(TonegridError::UnknownPattern(_))
        ));
    }

    #[test]
    fn session_steps_wrap_and_report_hits() {
        let bank = PatternBank::builtin();
        let layers = [
            Layer::default(),
            Layer::new(InstrumentKind::Snare, "Backbeat"),
        ];
        let mut session = SequencerSession::new(&layers, 120, &bank).unwrap();
        assert_eq!(
            session.active_instruments(0),
            vec![InstrumentKind::BassDrum, InstrumentKind::Snare]
        );
        assert!(session.active_instruments(1).is_empty());
        assert_eq!(session.active_instruments(3), vec![InstrumentKind::Snare]);

        for _ in 0..7 {
            session.advance_step();
        }
        assert_eq!(session.current_step(), 7);
        assert_eq!(session.advance_step(), 0);
    }
}
