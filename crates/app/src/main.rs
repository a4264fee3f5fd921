//! LayerExport - export every layer of a document to its own image file

mod cli;
mod report;
mod settings;
mod state;

use crate::cli::Cli;
use crate::report::Timings;
use crate::settings::Settings;
use crate::state::{SessionState, StateMachine};
use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use document::{Manifest, MemoryDocument};
use export::{
    collect, export, CancelToken, CollectedLayers, ExportConfig, ExportOutcome,
    Progress, ProgressCallback,
};
use parking_lot::Mutex;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Export worker commands
enum WorkerCommand {
    Collect,
    Export {
        config: ExportConfig,
        stop_after: Option<usize>,
    },
    Shutdown,
}

/// Export worker results
enum WorkerResult {
    Progress(Progress),
    Collected {
        layers: usize,
        visible: usize,
        elapsed: Duration,
    },
    Finished {
        outcome: ExportOutcome,
        cancel_requested: bool,
        elapsed: Duration,
    },
    Error(String),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    env_logger::builder()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let document = Manifest::load(&cli.manifest)
        .with_context(|| format!("Failed to load document {}", cli.manifest.display()))?;
    let config = cli.export_config(&settings, document.location())?;
    log::debug!("Export configuration: {:?}", config);

    let state = Arc::new(Mutex::new(StateMachine::new()));
    let cancel = CancelToken::new();

    // Create export worker channels
    let (cmd_tx, cmd_rx): (Sender<WorkerCommand>, Receiver<WorkerCommand>) = bounded(4);
    let (result_tx, result_rx): (Sender<WorkerResult>, Receiver<WorkerResult>) = bounded(16);

    // Start export worker thread
    let worker_state = state.clone();
    let worker_cancel = cancel.clone();
    let worker = thread::spawn(move || {
        export_worker(document, worker_state, worker_cancel, cmd_rx, result_tx);
    });

    {
        let mut machine = state.lock();
        machine.start_collecting();
        println!("{}", machine.state().display_text());
    }
    cmd_tx.send(WorkerCommand::Collect)?;

    let mut export_config = Some(config);
    let mut collection_time = Duration::ZERO;
    let mut exit = ExitCode::SUCCESS;

    for result in result_rx.iter() {
        match result {
            WorkerResult::Progress(Progress::Collecting { scanned, total }) => {
                log::trace!("Scanned {} of {} indexed layers", scanned, total);
            }
            WorkerResult::Collected { layers, visible, elapsed } => {
                collection_time = elapsed;
                let mut machine = state.lock();
                machine.collected(layers, visible);
                let counts = machine.counts();
                println!("{}", report::summary(counts.layers, counts.visible));
                if cli.profile {
                    println!("Layers collected in {}", report::format_duration(elapsed));
                }
                if let Some(config) = export_config.take() {
                    let total = if config.visible_only() { counts.visible } else { counts.layers };
                    machine.start_exporting(total);
                    cmd_tx.send(WorkerCommand::Export {
                        config,
                        stop_after: cli.stop_after,
                    })?;
                }
            }
            WorkerResult::Progress(Progress::Exporting { completed, .. }) => {
                let mut machine = state.lock();
                machine.progress(completed);
                let counts = machine.counts();
                println!("Exporting {} of {}...", counts.exported, counts.total);
            }
            WorkerResult::Finished { outcome, cancel_requested, elapsed } => {
                let mut machine = state.lock();
                machine.finish_exporting(cancel_requested);
                let cancelled = machine.state() == SessionState::Cancelled;
                let timings = Timings {
                    collection: collection_time,
                    export: elapsed,
                };
                println!();
                println!(
                    "{}",
                    report::final_message(&outcome, cancelled, cli.profile.then_some(&timings))
                );
                if outcome.any_failure {
                    exit = ExitCode::from(2);
                }
            }
            WorkerResult::Error(message) => {
                state.lock().reset();
                eprintln!("Error: {}", message);
                exit = ExitCode::FAILURE;
                break;
            }
        }

        if state.lock().state().is_done() {
            break;
        }
    }

    // Cleanup
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    if worker.join().is_err() {
        log::error!("Export worker panicked");
        exit = ExitCode::FAILURE;
    }

    Ok(exit)
}

fn export_worker(
    mut document: MemoryDocument,
    state: Arc<Mutex<StateMachine>>,
    cancel: CancelToken,
    cmd_rx: Receiver<WorkerCommand>,
    result_tx: Sender<WorkerResult>,
) {
    let mut layers: Option<CollectedLayers> = None;

    loop {
        match cmd_rx.recv() {
            Ok(WorkerCommand::Collect) => {
                if state.lock().state() != SessionState::Collecting {
                    let _ = result_tx.send(WorkerResult::Error("Collection was not requested".to_string()));
                    continue;
                }
                let started = Instant::now();
                let progress = progress_sender(result_tx.clone(), None, cancel.clone());
                match collect(&mut document, &cancel, Some(&progress)) {
                    Ok(collected) => {
                        let _ = result_tx.send(WorkerResult::Collected {
                            layers: collected.all().len(),
                            visible: collected.visible().len(),
                            elapsed: started.elapsed(),
                        });
                        layers = Some(collected);
                    }
                    Err(e) => {
                        let _ = result_tx.send(WorkerResult::Error(e.to_string()));
                    }
                }
            }
            Ok(WorkerCommand::Export { config, stop_after }) => {
                let Some(collected) = layers.as_ref() else {
                    let _ = result_tx.send(WorkerResult::Error("No layers collected".to_string()));
                    continue;
                };
                if state.lock().state() != SessionState::Exporting {
                    let _ = result_tx.send(WorkerResult::Error("Export was not started".to_string()));
                    continue;
                }

                let started = Instant::now();
                let progress = progress_sender(result_tx.clone(), stop_after, cancel.clone());
                let result = export(&mut document, collected, &config, &cancel, Some(&progress));
                let elapsed = started.elapsed();
                match result {
                    Ok(outcome) => {
                        let _ = result_tx.send(WorkerResult::Finished {
                            outcome,
                            cancel_requested: cancel.is_cancelled(),
                            elapsed,
                        });
                    }
                    Err(e) => {
                        let _ = result_tx.send(WorkerResult::Error(e.to_string()));
                    }
                }
            }
            Ok(WorkerCommand::Shutdown) | Err(_) => break,
        }
    }
}

/// Forward progress to the main thread, cancelling once `stop_after` layers are done
fn progress_sender(
    result_tx: Sender<WorkerResult>,
    stop_after: Option<usize>,
    cancel: CancelToken,
) -> ProgressCallback {
    Box::new(move |progress| {
        if let (Progress::Exporting { completed, .. }, Some(limit)) = (progress, stop_after) {
            if completed >= limit {
                cancel.cancel();
            }
        }
        let _ = result_tx.send(WorkerResult::Progress(progress));
    })
}
