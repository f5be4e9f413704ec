/// Tonegrid - tunable tone synthesis and a layered drum step sequencer
///
/// This library provides the core components:
/// - Deterministic tone and percussion synthesis
/// - A fixed instrument catalog and 12-TET key tuning
/// - Named eight-step rhythm patterns
/// - A mixer in front of a cpal audio output
/// - A threaded playback engine that steps every layer on one clock

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod instrument;
pub mod pattern;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types
pub use audio::{AudioOutput, AudioSink, CaptureSink, Mixer};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Result, TonegridError};
pub use instrument::{tonal_key_frequencies, InstrumentKind};
pub use pattern::{Pattern, PatternBank};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent, PlaybackState};
pub use sequencer::{Layer, LayerStack, SequencerSession};
pub use synth::{SampleBuffer, SoundDescriptor};
