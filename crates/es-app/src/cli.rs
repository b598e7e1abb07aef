use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use es_core::config::{GestureStrategyKind, SensingConfig};

/// echosense : détection de gestes par effet Doppler ultrasonore.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Mode de détection : active (sonde émise) ou passive (écoute seule).
    #[arg(long, value_enum, default_value_t = Mode::Active)]
    pub mode: Mode,

    /// Fréquence de la sonde en Hz (17000–20000).
    #[arg(long)]
    pub tone: Option<f32>,

    /// Ticks d'analyse par seconde.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Arrêt automatique après N secondes. Défaut : jusqu'à Ctrl-C.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Sensing mode.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Emit the probe tone and classify its echo.
    Active,
    /// Listen only and report the stable two-peak pair.
    Passive,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    ///
    /// Passive mode silences the probe and switches to the peak-shift
    /// strategy, which does not depend on an emitted tone.
    pub fn apply(&self, config: &mut SensingConfig) {
        match self.mode {
            Mode::Active => config.tone.enabled = true,
            Mode::Passive => {
                config.tone.enabled = false;
                config.gesture.strategy = GestureStrategyKind::PeakShift;
            }
        }
        if let Some(tone) = self.tone {
            config.tone.frequency = tone;
        }
        if let Some(fps) = self.fps {
            config.analysis.fps = fps;
        }
        config.clamp_all();
    }

    /// Validate option values clap cannot check on its own.
    ///
    /// # Errors
    /// Returns an error for a non-positive or non-finite `--duration` and
    /// a non-finite `--tone`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(tone) = self.tone
            && !tone.is_finite()
        {
            anyhow::bail!("--tone doit être une fréquence finie en Hz (reçu {tone})");
        }
        if let Some(d) = self.duration
            && !(d.is_finite() && d > 0.0)
        {
            anyhow::bail!("--duration doit être un nombre de secondes positif (reçu {d})");
        }
        Ok(())
    }
}
