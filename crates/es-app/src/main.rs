use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use clap::Parser;
use es_core::config::SensingConfig;

pub mod app;
pub mod cli;
pub mod hotreload;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    cli.validate()?;

    // 3. Charger la config et appliquer les overrides CLI
    let config = resolve_config(&cli)?;
    let mut effective = config.clone();
    cli.apply(&mut effective);

    let config = Arc::new(ArcSwap::from_pointee(config));

    // 4. Hot-reload (seulement si le fichier existe)
    let _watcher = if cli.config.exists() {
        Some(hotreload::spawn_config_watcher(&cli.config, &config)?)
    } else {
        None
    };

    // 5. Ctrl-C → arrêt propre
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    // 6. Démarrer la session
    let (label_tx, label_rx) = flume::bounded(64);
    let session = es_audio::state::spawn_session(&effective, app::label_forwarder(label_tx))?;
    log::info!(
        "Session {:?} @ {}Hz, sonde {:.0}Hz",
        cli.mode,
        session.sample_rate(),
        session.control().frequency()
    );

    // 7. Boucle principale
    let app_instance = app::App::new(session, config, label_rx, cli.mode);
    app_instance.run(&cli, &running, cli.duration.map(Duration::from_secs_f64));

    Ok(())
}

/// Resolve config: defaults when the file is missing.
fn resolve_config(cli: &cli::Cli) -> Result<SensingConfig> {
    if cli.config.exists() {
        es_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(SensingConfig::default())
    }
}
