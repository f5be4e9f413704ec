#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use tonegrid::{
    instrument::key_label, Engine, EngineConfig, InstrumentKind, PlaybackEvent, PlaybackState,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    init_tracing();

    let engine = Engine::new(EngineConfig::default()).unwrap_or_else(|err| {
        tracing::error!(%err, "cannot start engine");
        std::process::exit(1);
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 800.0])
            .with_title("Tonegrid - Tunable Synth & Rhythm Sequencer"),
        ..Default::default()
    };

    eframe::run_native(
        "Tonegrid",
        options,
        Box::new(|_cc| Ok(Box::new(TonegridApp::new(engine)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(feature = "gui")]
enum LayerEdit {
    Instrument(usize, InstrumentKind),
    Pattern(usize, String),
    Remove(usize),
    Add,
}

#[cfg(feature = "gui")]
struct TonegridApp {
    engine: Engine,

    // UI state
    base_freq: f64,
    bpm: u32,
    current_visual_step: usize,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl TonegridApp {
    fn new(engine: Engine) -> Self {
        let bpm = engine.config().default_bpm;
        Self {
            engine,
            base_freq: 440.0,
            bpm,
            current_visual_step: 0,
            status: None,
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.engine.poll_events() {
            match event {
                PlaybackEvent::StepAdvanced(step) => self.current_visual_step = step,
                PlaybackEvent::Stopped => self.current_visual_step = 0,
                PlaybackEvent::Triggered { .. } => {}
            }
        }
    }

    fn report(&mut self, result: tonegrid::Result<()>) {
        if let Err(err) = result {
            tracing::warn!(%err, "ui action failed");
            self.status = Some(err.to_string());
        }
    }

    fn piano(&mut self, ui: &mut egui::Ui) {
        ui.heading("Piano");
        ui.horizontal(|ui| {
            ui.label("Base frequency (Hz):");
            ui.add(
                egui::Slider::new(&mut self.base_freq, 0.0..=2000.0)
                    .fixed_decimals(5)
                    .step_by(0.00001),
            );
        });
        ui.small("All keys tune up from this base using the equal-tempered formula.");

        let freqs = match self.engine.tonal_frequencies(self.base_freq) {
            Ok(freqs) => freqs,
            Err(err) => {
                ui.colored_label(egui::Color32::YELLOW, err.to_string());
                return;
            }
        };

        let mut pressed = None;
        for row in freqs.chunks(12) {
            ui.horizontal(|ui| {
                for &freq in row {
                    let button = egui::Button::new(key_label(freq)).min_size(egui::vec2(60.0, 48.0));
                    if ui.add(button).clicked() {
                        pressed = Some(freq);
                    }
                }
            });
        }
        if let Some(freq) = pressed {
            let result = self.engine.trigger_tone(freq as f32);
            self.report(result);
        }
    }

    fn layer_editor(&mut self, ui: &mut egui::Ui) {
        ui.heading("Rhythm Tracks & Sequencer");

        let patterns: Vec<String> = self
            .engine
            .pattern_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let layer_count = self.engine.layers().len();
        let mut edits = Vec::new();

        for (idx, layer) in self.engine.layers().layers().iter().enumerate() {
            ui.horizontal(|ui| {
                let mut instrument = layer.instrument;
                egui::ComboBox::from_id_source(("instrument", idx))
                    .selected_text(instrument.name())
                    .show_ui(ui, |ui| {
                        for kind in InstrumentKind::SELECTABLE {
                            ui.selectable_value(&mut instrument, kind, kind.name());
                        }
                    });
                if instrument != layer.instrument {
                    edits.push(LayerEdit::Instrument(idx, instrument));
                }

                let mut pattern = layer.pattern.clone();
                egui::ComboBox::from_id_source(("pattern", idx))
                    .selected_text(pattern.as_str())
                    .show_ui(ui, |ui| {
                        for name in &patterns {
                            ui.selectable_value(&mut pattern, name.clone(), name.as_str());
                        }
                    });
                if pattern != layer.pattern {
                    edits.push(LayerEdit::Pattern(idx, pattern));
                }

                if ui
                    .add_enabled(layer_count > 1, egui::Button::new("Remove"))
                    .clicked()
                {
                    edits.push(LayerEdit::Remove(idx));
                }
            });
        }

        if ui
            .add_enabled(!self.engine.layers().is_full(), egui::Button::new("Add Layer"))
            .clicked()
        {
            edits.push(LayerEdit::Add);
        }

        for edit in edits {
            let result = match edit {
                LayerEdit::Instrument(idx, kind) => {
                    self.engine.layers_mut().set_instrument(idx, kind)
                }
                LayerEdit::Pattern(idx, name) => self.engine.set_layer_pattern(idx, &name),
                LayerEdit::Remove(idx) => self.engine.layers_mut().remove(idx).map(|_| ()),
                LayerEdit::Add => self.engine.layers_mut().add().map(|_| ()),
            };
            self.report(result);
        }
    }

    fn preview(&mut self, ui: &mut egui::Ui) {
        ui.label("Rhythm Layer Preview");
        let is_playing = self.engine.sequencer_state() == PlaybackState::Running;

        match self.engine.layer_preview() {
            Ok(rows) => {
                for (label, row) in rows {
                    ui.monospace(format!("{label}: {row}"));
                }
            }
            Err(err) => {
                ui.colored_label(egui::Color32::YELLOW, err.to_string());
            }
        }

        ui.horizontal(|ui| {
            for step in 0..8 {
                let is_current = is_playing && self.current_visual_step == step;
                let text = if is_current {
                    format!("● {}", step + 1)
                } else {
                    format!("{}", step + 1)
                };
                ui.monospace(text);
            }
        });
    }

    fn transport(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let is_playing = self.engine.sequencer_state() == PlaybackState::Running;

            if is_playing {
                if ui.button("⏸ Stop").clicked() {
                    self.engine.stop_sequencer();
                    self.status = Some("Rhythm stopped.".into());
                }
            } else if ui.button("▶ Play Rhythm").clicked() {
                let result = self.engine.start_sequencer(self.bpm);
                if result.is_ok() {
                    self.status = Some("Playing rhythm! Click Stop to end.".into());
                }
                self.report(result);
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            ui.add_enabled(
                !is_playing,
                egui::Slider::new(&mut self.bpm, 30..=300).step_by(1.0),
            );
        });
    }
}

#[cfg(feature = "gui")]
impl eframe::App for TonegridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Tunable Piano Synth & Rhythm Sequencer");
            ui.add_space(10.0);

            self.piano(ui);
            ui.separator();
            self.layer_editor(ui);
            ui.add_space(10.0);
            self.preview(ui);
            ui.add_space(10.0);
            self.transport(ui);

            // Info
            ui.separator();
            if let Some(status) = &self.status {
                ui.label(status);
            }
            if !self.engine.is_audio_available() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No audio output device - playback is muted",
                );
            }
        });
    }
}
