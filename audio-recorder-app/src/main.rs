mod config;
mod logging;
mod status;

use std::io::{self, BufRead};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use audio_recorder_core::{resolve_input_device, AudioFileWriter, LoggingListener, Recorder};
use audio_recorder_cpal::{list_input_devices, CpalBackend};

use crate::config::{AppConfig, CONFIG_FILE_NAME};
use crate::status::{StatusServer, StatusState};

#[derive(Parser)]
#[command(name = "audio-recorder")]
#[command(about = "Records an audio input device to WAV files, optionally on a schedule")]
#[command(version)]
struct Cli {
    /// Configuration file (default: recorder.json in the home directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Home directory for the configuration and relative recordings paths
    #[arg(long, env = "AUDIO_RECORDER_HOME")]
    home: Option<PathBuf>,

    /// List audio input devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        logging::init_console();
        return list_devices();
    }

    let home = match cli.home {
        Some(home) => home,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    logging::init_with_file(&home);

    let config = match cli.config {
        Some(path) => AppConfig::load(&path)?,
        None => {
            let path = home.join(CONFIG_FILE_NAME);
            if path.exists() {
                AppConfig::load(&path)?
            } else {
                log::warn!("no configuration at {}; using defaults", path.display());
                AppConfig::default()
            }
        }
    };

    run(&config, &home)
}

fn list_devices() -> Result<()> {
    let devices = list_input_devices().context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("No input devices found.");
        return Ok(());
    }

    println!("Input devices:");
    for device in &devices {
        let latency = match (device.low_latency_secs, device.high_latency_secs) {
            (Some(low), Some(high)) => format!(", latency {:.3}-{:.3} s", low, high),
            _ => String::new(),
        };
        println!(
            "{:>3}{} {} ({}, {} ch, {} Hz{})",
            device.index,
            if device.is_default { "*" } else { " " },
            device.name,
            device.host_api,
            device.channels,
            device.sample_rate,
            latency
        );
    }
    Ok(())
}

fn run(config: &AppConfig, home: &Path) -> Result<()> {
    let devices = list_input_devices().context("failed to enumerate input devices")?;
    let selector = config.input_device.as_ref().map(|d| d.as_selector());
    let device = resolve_input_device(&devices, selector.as_deref())?;
    log::info!(
        "station {} recording from input device {} ({})",
        config.station_name,
        device.index,
        device.name
    );

    let recorder_config = config.recorder_config(device.index);
    let recordings_dir = config.recordings_dir(home);
    let writer = AudioFileWriter::new(
        config.station_name.clone(),
        &recordings_dir,
        config.max_audio_file_size,
        &recorder_config,
    )
    .with_context(|| format!("failed to set up recordings directory {}", recordings_dir.display()))?;

    let recorder = Arc::new(Recorder::create(recorder_config, CpalBackend::new()).context("failed to create recorder")?);
    recorder.add_listener(Arc::new(LoggingListener::new()));
    recorder.add_listener(Arc::new(writer));

    let status_server = match config.port_num {
        Some(port) => {
            let state = StatusState {
                station_name: config.station_name.clone(),
                recordings_dir: recordings_dir.clone(),
                max_audio_file_size: config.max_audio_file_size,
                buffer_size_secs: config.buffer_size,
                recorder: Arc::clone(&recorder),
                devices: Arc::new(list_input_devices),
            };
            let server = StatusServer::spawn(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), state)?;
            log::info!("status page on port {}", server.local_addr().port());
            Some(server)
        }
        None => None,
    };

    recorder.start().context("failed to start recording")?;

    if recorder.has_schedule() {
        log::info!("following recording schedule");
        recorder.wait();
    } else {
        println!("Recording to {}. Press Enter to stop.", recordings_dir.display());
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).context("failed to read from stdin")?;
        recorder.stop()?;
    }

    // The server holds a recorder handle; stop it first so dropping the
    // recorder closes any stream still open.
    drop(status_server);
    drop(recorder);
    Ok(())
}
