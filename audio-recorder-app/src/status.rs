//! HTTP status page.
//!
//! `GET /` renders an HTML page describing the station, the input devices,
//! the recorder's settings and its schedule. Every other path is a 404.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use audio_recorder_core::{DeviceDescriptor, Interval, Recorder, RecorderError};

/// Enumerates input devices for the devices table.
pub type DeviceLister = Arc<dyn Fn() -> Result<Vec<DeviceDescriptor>, RecorderError> + Send + Sync>;

/// Shared state accessible by the status handler.
#[derive(Clone)]
pub struct StatusState {
    pub station_name: String,
    pub recordings_dir: PathBuf,
    pub max_audio_file_size: u64,
    /// Capture buffer length in seconds, as configured.
    pub buffer_size_secs: f64,
    pub recorder: Arc<Recorder>,
    pub devices: DeviceLister,
}

pub fn router(state: StatusState) -> Router {
    Router::new().route("/", get(status_page)).with_state(state)
}

async fn status_page(State(state): State<StatusState>) -> Result<Html<String>, (StatusCode, String)> {
    // Device enumeration talks to the audio host and may block.
    tokio::task::spawn_blocking(move || {
        let devices = (state.devices)();
        Html(render_status_page(&state, devices, Utc::now()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// A running status server. Dropping it shuts the server down.
pub struct StatusServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StatusServer {
    /// Bind `addr` and serve the status page from a background thread.
    pub fn spawn(addr: SocketAddr, state: StatusState) -> Result<Self> {
        let listener = std::net::TcpListener::bind(addr).with_context(|| format!("failed to bind status server to {}", addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to configure status server socket")?;
        let addr = listener.local_addr().context("failed to read status server address")?;
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let handle = thread::Builder::new()
            .name("status-server".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        log::error!("failed to start status server runtime: {}", e);
                        return;
                    }
                };
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(listener) => listener,
                        Err(e) => {
                            log::error!("failed to register status server socket: {}", e);
                            return;
                        }
                    };
                    let served = axum::serve(listener, router(state))
                        .with_graceful_shutdown(async {
                            let _ = shutdown_rx.await;
                        })
                        .await;
                    if let Err(e) = served {
                        log::error!("status server failed: {}", e);
                    }
                });
            })
            .context("failed to spawn status server thread")?;

        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("status server thread panicked");
            }
        }
    }
}

/// Render the status page as of `now`.
pub fn render_status_page(
    state: &StatusState,
    devices: Result<Vec<DeviceDescriptor>, RecorderError>,
    now: DateTime<Utc>,
) -> String {
    let recorder = &state.recorder;
    let intervals = recorder
        .config()
        .schedule
        .as_ref()
        .map(|s| s.intervals().to_vec())
        .unwrap_or_default();
    let current = intervals.iter().find(|i| i.contains(now));
    let next = intervals.iter().find(|i| i.start > now);

    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n  <meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "  <title>{} Recorder Status</title>", escape(&state.station_name));
    page.push_str("</head>\n<body>\n");
    let _ = writeln!(page, "<h1>{} Recorder Status</h1>", escape(&state.station_name));

    page.push_str("<h2>Status</h2>\n");
    page.push_str(&table(
        None,
        &[
            row("Time", format_time(now)),
            row("Recording", if recorder.is_recording() { "Yes" } else { "No" }),
            row("Current Recording Start Time", current.map(|i| format_time(i.start)).unwrap_or_default()),
            row("Current Recording End Time", current.map(|i| format_time(i.end)).unwrap_or_default()),
            row("Next Recording Start Time", next.map(|i| format_time(i.start)).unwrap_or_default()),
            row("Next Recording End Time", next.map(|i| format_time(i.end)).unwrap_or_default()),
        ],
    ));

    page.push_str("<h2>Station</h2>\n");
    page.push_str(&table(None, &[row("Name", &state.station_name)]));

    page.push_str("<h2>Devices</h2>\n");
    match devices {
        Ok(devices) => {
            let rows: Vec<Vec<String>> = devices
                .iter()
                .map(|d| {
                    let marker = if d.index == recorder.device_index() { " *" } else { "" };
                    vec![format!("{}{}", d.index, marker), d.name.clone(), d.channels.to_string()]
                })
                .collect();
            page.push_str(&table(Some(&["Index", "Name", "Number of Channels"]), &rows));
        }
        Err(e) => {
            let _ = writeln!(page, "<p>Could not list input devices: {}</p>", escape(&e.to_string()));
        }
    }

    page.push_str("<h2>Input</h2>\n");
    page.push_str(&table(
        None,
        &[
            row("Device Index", recorder.device_index()),
            row("Number of Channels", recorder.channels()),
            row("Sample Rate (Hz)", recorder.sample_rate()),
            row("Buffer Size (seconds)", state.buffer_size_secs),
        ],
    ));

    page.push_str("<h2>Output</h2>\n");
    page.push_str(&table(
        None,
        &[
            row("Recordings Directory", state.recordings_dir.display()),
            row("Max Audio File Size (bytes)", state.max_audio_file_size),
        ],
    ));

    let diagnostics = recorder.diagnostics();
    page.push_str("<h2>Diagnostics</h2>\n");
    page.push_str(&table(
        None,
        &[
            row("Stream Opens", diagnostics.stream_opens),
            row("Buffers Delivered", diagnostics.buffers_delivered),
            row("Overflows", diagnostics.overflow_count),
            row("Underflows", diagnostics.underflow_count),
            row("Stream Faults", diagnostics.stream_faults),
        ],
    ));

    page.push_str("<h2>Recordings</h2>\n");
    if intervals.is_empty() {
        page.push_str("<p>No recording schedule.</p>\n");
    } else {
        let rows: Vec<Vec<String>> = intervals
            .iter()
            .enumerate()
            .map(|(index, interval)| {
                vec![
                    index.to_string(),
                    format_time(interval.start),
                    format_time(interval.end),
                    interval_status(interval, now).to_string(),
                ]
            })
            .collect();
        page.push_str(&table(Some(&["Index", "Start Time", "End Time", "Status"]), &rows));
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn interval_status(interval: &Interval, now: DateTime<Utc>) -> &'static str {
    if interval.end <= now {
        "Past"
    } else if interval.start > now {
        "Future"
    } else {
        "Current"
    }
}

fn row(name: &str, value: impl ToString) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

fn table(header: Option<&[&str]>, rows: &[Vec<String>]) -> String {
    let mut html = String::from("<table>\n");
    if let Some(header) = header {
        html.push_str("  <tr>\n");
        for cell in header {
            let _ = writeln!(html, "    <th>{}</th>", escape(cell));
        }
        html.push_str("  </tr>\n");
    }
    for cells in rows {
        html.push_str("  <tr>\n");
        for cell in cells {
            let _ = writeln!(html, "    <td>{}</td>", escape(cell));
        }
        html.push_str("  </tr>\n");
    }
    html.push_str("</table>\n");
    html
}

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
