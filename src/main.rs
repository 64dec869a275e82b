use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
};

use clap::{Parser, Subcommand, arg};
use log::{error, info, warn};
use pitlane_penalty::{
    CalendarDay, FileSpeedStore, Notification, PenaltyConfig, PenaltyEngine, PenaltyError,
    ReplayTelemetryProducer, TelemetryProducer, runner, speed_store, writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recorded telemetry file through the penalty engine
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        /// Configuration file, defaults to the day's file in the config directory
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the notifications to this JSON Lines file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Max speed store, defaults to the one in the data directory
        #[arg(long)]
        store: Option<PathBuf>,

        /// Override the server name from the recording
        #[arg(long)]
        server: Option<String>,
    },
    /// Write the default configuration
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn replay(
    input: &Path,
    config: Option<&Path>,
    output: Option<PathBuf>,
    store: Option<PathBuf>,
    server: Option<String>,
) -> Result<(), PenaltyError> {
    let mut producer = ReplayTelemetryProducer::from_file(input)?;
    producer.start()?;
    let mut session_info = producer.session_info()?;
    if let Some(server) = server {
        session_info.server_name = server;
    }

    let mut store = match store {
        Some(path) => FileSpeedStore::new(path),
        None => FileSpeedStore::new_default()?,
    };
    let max_speed = speed_store::load_or_zero(&store, &session_info.max_speed_key());

    let day = CalendarDay::today();
    let mut engine = match PenaltyConfig::load(config, day, &session_info.server_name) {
        Ok(config) => PenaltyEngine::new(config, session_info, day, max_speed),
        Err(e) => PenaltyEngine::disabled(&e, session_info),
    };

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        handler_flag.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    // if we need to write an output file the engine sends every notification to a writer thread
    let (sender, writer_handle) = match output {
        Some(output_file) => {
            let (tx, rx) = mpsc::channel::<Notification>();
            let handle = thread::spawn(move || writer::write_notifications(&output_file, rx));
            (Some(tx), Some(handle))
        }
        None => (None, None),
    };

    // the writer is joined and the max speed saved even when the run stops on an error
    let result = runner::run_engine(&mut producer, &mut engine, sender, &running);
    match &result {
        Ok(summary) => info!(
            "Replayed {} samples: {} notifications, {} counted cuts, {} warnings, penalty pending: {}",
            summary.ticks,
            summary.notifications,
            summary.counted_cuts,
            summary.warning_count,
            summary.penalty_pending
        ),
        Err(e) => error!("Replay stopped: {}", e),
    }

    if let Some(handle) = writer_handle {
        match handle.join() {
            Ok(Ok(written)) => info!("Wrote {} notifications", written),
            Ok(Err(e)) => error!("Could not write notifications: {}", e),
            Err(_) => error!("Notification writer thread panicked"),
        }
    }

    if engine.is_enabled() {
        if let Err(e) = engine.persist_max_speed(&mut store) {
            warn!("Could not save max speed: {}", e);
        }
    }
    result.map(|_| ())
}

fn write_default_config(output: Option<PathBuf>) -> Result<(), PenaltyError> {
    let path = match output {
        Some(path) => path,
        None => PenaltyConfig::default_config_dir()?.join("plp.json"),
    };
    PenaltyConfig::default().save(&path)?;
    info!("Default configuration written to {:?}", path);
    Ok(())
}

fn main() {
    colog::init();

    let cli = Args::parse();
    let result = match cli.command {
        Commands::Replay {
            input,
            config,
            output,
            store,
            server,
        } => replay(&input, config.as_deref(), output, store, server),
        Commands::Config { output } => write_default_config(output),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
