use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use es_audio::state::SessionHandle;
use es_core::config::SensingConfig;
use es_core::gesture::{GestureLabel, PeakPair};

use crate::cli::{Cli, Mode};

/// Poll period of the foreground loop.
const POLL: Duration = Duration::from_millis(20);

/// Boucle de premier plan : affiche les gestes, applique les rechargements.
pub struct App {
    session: SessionHandle,
    config: Arc<ArcSwap<SensingConfig>>,
    /// File version last pushed to the session.
    applied: Arc<SensingConfig>,
    labels: flume::Receiver<GestureLabel>,
    mode: Mode,
    last_peaks: Option<PeakPair>,
}

impl App {
    /// Wrap a running session.
    #[must_use]
    pub fn new(
        session: SessionHandle,
        config: Arc<ArcSwap<SensingConfig>>,
        labels: flume::Receiver<GestureLabel>,
        mode: Mode,
    ) -> Self {
        let applied = config.load_full();
        Self {
            session,
            config,
            applied,
            labels,
            mode,
            last_peaks: None,
        }
    }

    /// Run until `running` is cleared or `duration` elapses, then stop the session.
    pub fn run(mut self, cli: &Cli, running: &AtomicBool, duration: Option<Duration>) {
        let start = Instant::now();

        if self.session.is_passive() {
            println!("Aucun micro disponible : spectres au plancher.");
        }

        while running.load(Ordering::SeqCst) {
            if duration.is_some_and(|d| start.elapsed() >= d) {
                break;
            }

            // === Gestes ===
            while let Ok(label) = self.labels.try_recv() {
                println!("{label}");
            }

            // === Rechargement config ===
            self.check_reload(cli);

            // === Paire stable (mode passif) ===
            if self.mode == Mode::Passive {
                self.report_peaks();
            }

            std::thread::sleep(POLL);
        }

        self.session.shutdown();
    }

    fn check_reload(&mut self, cli: &Cli) {
        let current = self.config.load_full();
        if Arc::ptr_eq(&current, &self.applied) {
            return;
        }
        let mut next = (*current).clone();
        cli.apply(&mut next);
        if self.session.reconfigure(&next) {
            self.applied = current;
        }
    }

    fn report_peaks(&mut self) {
        let peaks = self.session.latest().peaks;
        if peaks != self.last_peaks
            && let Some(pair) = peaks
        {
            println!(
                "Pics stables : {:.1} Hz / {:.1} Hz",
                pair.first_hz, pair.second_hz
            );
        }
        self.last_peaks = peaks;
    }
}

/// Observer forwarding label changes to the foreground loop.
///
/// Never blocks: a full queue drops the label.
pub fn label_forwarder(tx: flume::Sender<GestureLabel>) -> impl FnMut(GestureLabel) + Send {
    let mut last = None;
    move |label| {
        if last != Some(label) {
            last = Some(label);
            let _ = tx.try_send(label);
        }
    }
}
