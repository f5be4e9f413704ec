/// Playback engine - runs the step clock on its own thread and fires the
/// drums of every layer that has a hit on the current step.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::audio::Mixer;
use crate::config::EngineConfig;
use crate::instrument::InstrumentKind;
use crate::pattern::PatternBank;
use crate::synth::{synthesize_percussion, SampleBuffer};
use crate::{Result, TonegridError};

use super::{Layer, SequencerSession};

/// Events buffered for the UI before new ones are dropped.
const EVENT_BACKLOG: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    Triggered {
        step: usize,
        instruments: Vec<InstrumentKind>,
    },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct PlaybackEngine {
    mixer: Arc<Mixer>,
    config: EngineConfig,
    sender: SyncSender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    current_step: Arc<AtomicUsize>,
    worker: Option<Worker>,
}

impl PlaybackEngine {
    pub fn new(mixer: Arc<Mixer>, config: EngineConfig) -> Self {
        let (sender, receiver) = mpsc::sync_channel(EVENT_BACKLOG);

        Self {
            mixer,
            config,
            sender,
            receiver,
            current_step: Arc::new(AtomicUsize::new(0)),
            worker: None,
        }
    }

    /// Snapshots `layers` and starts stepping at `bpm`.
    ///
    /// Only one session runs at a time; a second start is refused with
    /// [`TonegridError::AlreadyRunning`] rather than replacing the first.
    pub fn start(&mut self, layers: &[Layer], bpm: u32, bank: &PatternBank) -> Result<()> {
        if self.worker.is_some() {
            return Err(TonegridError::AlreadyRunning);
        }

        let session = SequencerSession::new(layers, bpm, bank)?;
        let (stop, stop_rx) = mpsc::channel();
        let mut step_loop = StepLoop {
            session,
            mixer: Arc::clone(&self.mixer),
            config: self.config.clone(),
            events: self.sender.clone(),
            current_step: Arc::clone(&self.current_step),
            stop: stop_rx,
        };

        self.current_step.store(0, Ordering::Relaxed);
        let handle = thread::Builder::new()
            .name("tonegrid-sequencer".into())
            .spawn(move || step_loop.run())?;

        tracing::info!(bpm, layers = layers.len(), "sequencer started");
        self.worker = Some(Worker { stop, handle });
        Ok(())
    }

    /// Stops the running session and silences the output. Does nothing when idle.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let _ = worker.stop.send(());
        if worker.handle.join().is_err() {
            tracing::warn!("sequencer thread panicked");
        }
        self.mixer.stop_all();
        self.current_step.store(0, Ordering::Relaxed);
        let _ = self.sender.try_send(PlaybackEvent::Stopped);
        tracing::info!("sequencer stopped");
    }

    pub fn state(&self) -> PlaybackState {
        if self.worker.is_some() {
            PlaybackState::Running
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == PlaybackState::Running
    }

    /// Step the running session is on (or about to play).
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Relaxed)
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct StepLoop {
    session: SequencerSession,
    mixer: Arc<Mixer>,
    config: EngineConfig,
    events: SyncSender<PlaybackEvent>,
    current_step: Arc<AtomicUsize>,
    stop: Receiver<()>,
}

impl StepLoop {
    fn run(&mut self) {
        let interval = self.session.step_interval();
        // Deadlines accumulate from the session start so that trigger cost
        // does not stretch the tempo.
        let mut deadline = Instant::now();
        let mut sink_warned = false;

        loop {
            let step = self.session.current_step();
            self.current_step.store(step, Ordering::Relaxed);
            self.emit(PlaybackEvent::StepAdvanced(step));

            let instruments = self.session.active_instruments(step);
            if !instruments.is_empty() {
                tracing::debug!(step, ?instruments, "trigger");
                match self.trigger(&instruments) {
                    Ok(()) => self.emit(PlaybackEvent::Triggered { step, instruments }),
                    Err(err) if !sink_warned => {
                        tracing::warn!(%err, "step trigger failed, sequencer continues muted");
                        sink_warned = true;
                    }
                    Err(_) => {}
                }
            }

            self.session.advance_step();
            deadline += interval;
            let now = Instant::now();
            if deadline < now {
                // Overran the step; play the next one right away but do not
                // try to make up the lost time.
                deadline = now;
            }

            match self.stop.recv_timeout(deadline - now) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    /// Synthesizes every hit of the step on its own thread, then plays the
    /// sum as a single buffer so the hits cannot cut each other off.
    fn trigger(&self, instruments: &[InstrumentKind]) -> Result<()> {
        let duration = self.config.drum_duration_secs;
        let rate = self.config.sample_rate;
        let volume = self.config.drum_volume;

        let buffers = thread::scope(|scope| {
            let handles: Vec<_> = instruments
                .iter()
                .map(|&kind| {
                    scope.spawn(move || synthesize_percussion(kind, duration, rate, volume))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect::<Result<Vec<SampleBuffer>>>()
        })?;

        self.mixer.submit_mix(buffers)
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Err(TrySendError::Full(_)) = self.events.try_send(event) {
            tracing::trace!("playback event backlog full, dropping event");
        }
    }
}
