/// UI-facing entry point: tonal keys, manual triggers, layer editing and
/// sequencer transport, all sharing one mixer.
use std::sync::Arc;

use crate::audio::{AudioOutput, AudioSink, Mixer};
use crate::config::EngineConfig;
use crate::instrument::{self, InstrumentKind};
use crate::pattern::PatternBank;
use crate::sequencer::playback::{PlaybackEngine, PlaybackEvent, PlaybackState};
use crate::sequencer::LayerStack;
use crate::synth::{synthesize, SoundDescriptor};
use crate::Result;

pub struct Engine {
    config: EngineConfig,
    bank: PatternBank,
    mixer: Arc<Mixer>,
    layers: LayerStack,
    playback: PlaybackEngine,
}

impl Engine {
    /// Opens the default audio device. A missing device is logged and the
    /// engine runs muted.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_sink(config, Arc::new(AudioOutput::default()))
    }

    pub fn with_sink(config: EngineConfig, sink: Arc<dyn AudioSink>) -> Result<Self> {
        Self::with_patterns(config, sink, PatternBank::builtin())
    }

    pub fn with_patterns(
        config: EngineConfig,
        sink: Arc<dyn AudioSink>,
        bank: PatternBank,
    ) -> Result<Self> {
        config.validate()?;
        let mixer = Arc::new(Mixer::new(sink));
        Ok(Self {
            layers: LayerStack::new(config.max_layers),
            playback: PlaybackEngine::new(Arc::clone(&mixer), config.clone()),
            config,
            bank,
            mixer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tonal_frequencies(&self, base_hz: f64) -> Result<Vec<f64>> {
        instrument::tonal_key_frequencies(base_hz, self.config.key_count)
    }

    pub fn trigger_tone(&self, frequency_hz: f32) -> Result<()> {
        self.play(SoundDescriptor::Tone(frequency_hz))
    }

    pub fn trigger_drum(&self, kind: InstrumentKind) -> Result<()> {
        self.play(SoundDescriptor::Percussion(kind))
    }

    /// Renders `sound` with the configured length and level for its kind and
    /// replaces whatever is playing.
    pub fn play(&self, sound: SoundDescriptor) -> Result<()> {
        let (duration, volume) = match sound {
            SoundDescriptor::Tone(_) => (self.config.tone_duration_secs, self.config.tone_volume),
            SoundDescriptor::Percussion(_) => {
                (self.config.drum_duration_secs, self.config.drum_volume)
            }
        };
        let buffer = synthesize(sound, duration, self.config.sample_rate, volume)?;
        self.mixer.submit(buffer)
    }

    /// Looks the instrument up by display name first, so a typo is an error
    /// rather than the fallback sound.
    pub fn trigger_drum_named(&self, name: &str) -> Result<()> {
        self.trigger_drum(name.parse()?)
    }

    /// Plays the current layer list at `bpm`. The layers are copied; editing
    /// them afterwards does not touch the running session.
    pub fn start_sequencer(&mut self, bpm: u32) -> Result<()> {
        self.playback.start(self.layers.layers(), bpm, &self.bank)
    }

    pub fn stop_sequencer(&mut self) {
        self.playback.stop();
    }

    pub fn sequencer_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn current_step(&self) -> usize {
        self.playback.current_step()
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.playback.poll_events()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn set_layer_pattern(&mut self, index: usize, name: &str) -> Result<()> {
        self.layers.set_pattern(index, name, &self.bank)
    }

    pub fn layer_preview(&self) -> Result<Vec<(String, String)>> {
        self.layers.preview(&self.bank)
    }

    pub fn pattern_names(&self) -> Vec<&str> {
        self.bank.names()
    }

    pub fn instrument_kinds(&self) -> Vec<&'static str> {
        instrument::instrument_kinds()
    }

    pub fn is_audio_available(&self) -> bool {
        self.mixer.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CaptureSink;
    use crate::{synth, TonegridError};

    fn engine() -> (Engine, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::new());
        let engine = Engine::with_sink(EngineConfig::default(), sink.clone()).unwrap();
        (engine, sink)
    }

    #[test]
    fn tone_trigger_submits_default_length() {
        let (engine, sink) = engine();
        engine.trigger_tone(440.0).unwrap();
        let subs = sink.submissions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].buffer.len(), synth::sample_count(0.4, 44_100));
        assert!(subs[0].buffer.peak() <= 0.15 + 1e-6);
    }

    #[test]
    fn drum_trigger_by_name() {
        let (engine, sink) = engine();
        engine.trigger_drum_named("Snare").unwrap();
        assert_eq!(sink.submissions()[0].buffer.len(), 6_615);
        assert!(matches!(
            engine.trigger_drum_named("Gong"),
            Err(TonegridError::UnknownInstrument(_))
        ));
        assert_eq!(sink.submission_count(), 1);
    }

    #[test]
    fn play_picks_length_and_level_per_sound_kind() {
        let (engine, sink) = engine();
        engine.play(SoundDescriptor::Tone(220.0)).unwrap();
        engine
            .play(SoundDescriptor::Percussion(InstrumentKind::BassDrum))
            .unwrap();
        let subs = sink.submissions();
        assert_eq!(subs[0].buffer.len(), 17_640);
        assert_eq!(subs[1].buffer.len(), 6_615);
        assert!(subs[1].buffer.peak() <= 0.18 + 1e-6);
    }

    #[test]
    fn catalogs_for_the_ui() {
        let (engine, _) = engine();
        assert_eq!(engine.pattern_names().len(), 5);
        assert_eq!(engine.instrument_kinds().len(), 5);
        assert_eq!(engine.tonal_frequencies(261.63).unwrap().len(), 24);
        assert!(engine.tonal_frequencies(0.0).is_err());
    }

    #[test]
    fn sequencer_transport_through_engine() {
        let (mut engine, sink) = engine();
        engine.layers_mut().add().unwrap();
        engine.set_layer_pattern(1, "Sparse").unwrap();

        engine.start_sequencer(300).unwrap();
        assert_eq!(engine.sequencer_state(), PlaybackState::Running);
        assert!(matches!(
            engine.start_sequencer(300),
            Err(TonegridError::AlreadyRunning)
        ));

        // Manual triggers share the mixer with the running sequencer.
        engine.trigger_drum(InstrumentKind::Fallback).unwrap();

        engine.stop_sequencer();
        assert_eq!(engine.sequencer_state(), PlaybackState::Idle);
        assert!(sink.submission_count() >= 1);
        assert_eq!(sink.stop_count(), 1);
    }

    #[test]
    fn muted_engine_reports_sink_failures() {
        let sink = Arc::new(CaptureSink::unavailable());
        let engine = Engine::with_sink(EngineConfig::default(), sink).unwrap();
        assert!(!engine.is_audio_available());
        assert!(matches!(
            engine.trigger_tone(440.0),
            Err(TonegridError::SinkUnavailable(_))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            max_layers: 0,
            ..EngineConfig::default()
        };
        assert!(Engine::with_sink(config, Arc::new(CaptureSink::new())).is_err());
    }
}
