use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use es_core::config::{GestureStrategyKind, SensingConfig};
use es_core::traits::GestureObserver;
use triple_buffer::TripleBuffer;

use crate::capture::AudioCapture;
use crate::oscillator::ToneControl;
use crate::pipeline::{AnalysisPipeline, AnalysisSnapshot};
use crate::playback::TonePlayback;
use crate::ring::RingBuffer;

/// Sample rate assumed when no input device could be opened.
pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;

/// Commandes envoyées au thread d'analyse.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Retune the probe tone, Hz.
    SetFrequency(f32),
    /// Swap the gesture strategy.
    SetStrategy(GestureStrategyKind),
    /// Apply a reloaded configuration.
    Reconfigure(Box<SensingConfig>),
    /// Stop the analysis thread.
    Quit,
}

/// Thread d'analyse en cours : sortie des snapshots + canal de commandes.
pub struct AnalysisWorker {
    snapshots: triple_buffer::Output<AnalysisSnapshot>,
    commands: flume::Sender<SessionCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Latest published snapshot.
    pub fn latest(&mut self) -> &AnalysisSnapshot {
        self.snapshots.read()
    }

    /// Queue a command for the next tick.
    ///
    /// Returns `false` if the queue is full or the thread has stopped.
    pub fn send(&self, command: SessionCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Commande de session perdue : {e}");
                false
            }
        }
    }

    /// Stop the thread and wait for it.
    pub fn stop(&mut self) {
        let _ = self.commands.send(SessionCommand::Quit);
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            log::error!("Le thread d'analyse a paniqué");
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the analysis thread over an existing ring.
///
/// Each tick reads the freshest window, runs the [`AnalysisPipeline`],
/// hands the label to `observer` and publishes the snapshot.
///
/// # Errors
/// Returns an error if the thread cannot be spawned.
pub fn spawn_analysis<O>(
    ring: Arc<RingBuffer>,
    control: Arc<ToneControl>,
    config: &SensingConfig,
    sample_rate: u32,
    mut observer: O,
) -> anyhow::Result<AnalysisWorker>
where
    O: GestureObserver + 'static,
{
    let (mut buf_input, buf_output) = TripleBuffer::new(&AnalysisSnapshot::default()).split();
    let (cmd_tx, cmd_rx) = flume::bounded(32);

    let mut pipeline = AnalysisPipeline::new(config, sample_rate);
    let fps = config.analysis.fps;

    let handle = thread::Builder::new()
        .name("es-analysis".to_string())
        .spawn(move || {
            run_analysis_loop(
                &mut pipeline,
                &ring,
                &control,
                &mut buf_input,
                &mut observer,
                &cmd_rx,
                fps,
            );
        })?;

    Ok(AnalysisWorker {
        snapshots: buf_output,
        commands: cmd_tx,
        thread: Some(handle),
    })
}

/// Core analysis loop.
fn run_analysis_loop(
    pipeline: &mut AnalysisPipeline,
    ring: &RingBuffer,
    control: &ToneControl,
    buf_input: &mut triple_buffer::Input<AnalysisSnapshot>,
    observer: &mut dyn GestureObserver,
    cmd_rx: &flume::Receiver<SessionCommand>,
    fps: u32,
) {
    let start = Instant::now();
    let mut frame_period = period(fps);

    loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(SessionCommand::SetFrequency(f)) => {
                    let applied = control.set_frequency(f);
                    log::info!("Sonde accordée à {applied:.0}Hz");
                }
                Ok(SessionCommand::SetStrategy(kind)) => pipeline.set_strategy(kind),
                Ok(SessionCommand::Reconfigure(config)) => {
                    pipeline.reconfigure(&config);
                    control.set_frequency(config.tone.frequency);
                    frame_period = period(config.analysis.fps);
                }
                Ok(SessionCommand::Quit) | Err(flume::TryRecvError::Disconnected) => return,
                Err(flume::TryRecvError::Empty) => break,
            }
        }

        let tick_start = Instant::now();
        let snapshot = pipeline.tick(ring, control.frequency(), start.elapsed().as_secs_f64());
        observer.on_gesture(snapshot.label);
        buf_input.write(snapshot);

        thread::sleep(frame_period.saturating_sub(tick_start.elapsed()));
    }
}

fn period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(fps.max(1)))
}

/// Session de détection : capture, émission de la sonde, analyse.
///
/// Owns the cpal streams, so it must stay on the thread that created it.
/// Dropping the handle stops the analysis thread and closes the streams.
pub struct SessionHandle {
    worker: AnalysisWorker,
    control: Arc<ToneControl>,
    capture: Option<AudioCapture>,
    playback: Option<TonePlayback>,
    sample_rate: u32,
}

/// Start a full session from `config`.
///
/// A missing or failing input device leaves the session passive: the ring
/// stays silent and every spectrum sits at the floor. A failing output device
/// only disables the probe tone. Neither is fatal.
///
/// # Errors
/// Returns an error only if the analysis thread cannot be spawned.
pub fn spawn_session<O>(config: &SensingConfig, observer: O) -> anyhow::Result<SessionHandle>
where
    O: GestureObserver + 'static,
{
    let buffer_size = config.analysis.buffer_size;

    let capture = match AudioCapture::start_default(buffer_size) {
        Ok(capture) => Some(capture),
        Err(e) => {
            log::error!("Capture indisponible, session passive : {e:#}");
            None
        }
    };
    let (ring, sample_rate) = match &capture {
        Some(c) => (c.ring(), c.sample_rate()),
        None => (Arc::new(RingBuffer::new(1, buffer_size)), FALLBACK_SAMPLE_RATE),
    };

    let control = Arc::new(ToneControl::new(&config.tone));
    let playback = if config.tone.enabled {
        match TonePlayback::start_default(Arc::clone(&control)) {
            Ok(playback) => Some(playback),
            Err(e) => {
                log::error!("Sortie audio indisponible, sonde désactivée : {e:#}");
                None
            }
        }
    } else {
        None
    };

    let worker = spawn_analysis(ring, Arc::clone(&control), config, sample_rate, observer)?;

    Ok(SessionHandle {
        worker,
        control,
        capture,
        playback,
        sample_rate,
    })
}

impl SessionHandle {
    /// Latest published snapshot.
    pub fn latest(&mut self) -> &AnalysisSnapshot {
        self.worker.latest()
    }

    /// Retune the probe tone. Clamped to the configured range.
    pub fn set_frequency(&self, frequency: f32) -> bool {
        self.worker.send(SessionCommand::SetFrequency(frequency))
    }

    /// Swap the gesture strategy.
    pub fn set_strategy(&self, strategy: GestureStrategyKind) -> bool {
        self.worker.send(SessionCommand::SetStrategy(strategy))
    }

    /// Apply new thresholds and probe settings.
    ///
    /// The tone range is fixed at session start: a changed
    /// `min_frequency`/`max_frequency` is logged and ignored.
    pub fn reconfigure(&self, config: &SensingConfig) -> bool {
        if !self.control.range_matches(&config.tone) {
            let (min, max) = self.control.range();
            log::warn!(
                "Plage de sonde {:.0}–{:.0}Hz ignorée à chaud, conservée : {min:.0}–{max:.0}Hz",
                config.tone.min_frequency,
                config.tone.max_frequency
            );
        }
        self.control.set_amplitude(config.tone.amplitude);
        self.control.set_muted(!config.tone.enabled);
        self.worker
            .send(SessionCommand::Reconfigure(Box::new(config.clone())))
    }

    /// Shared probe controls.
    #[must_use]
    pub fn control(&self) -> &Arc<ToneControl> {
        &self.control
    }

    /// `true` when no input device is feeding the analysis.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.capture.is_none()
    }

    /// `true` while the probe tone is being played.
    #[must_use]
    pub fn is_emitting(&self) -> bool {
        self.playback.is_some() && !self.control.is_muted()
    }

    /// Sample rate of the analysed input.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stop analysis, then release the audio devices.
    pub fn shutdown(mut self) {
        self.worker.stop();
        log::info!("Session arrêtée");
    }
}
