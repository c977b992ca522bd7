use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use chrono::Utc;
use parking_lot::Mutex;

use crate::engine::buffer_pool::BufferPool;
use crate::engine::capture_sink::CaptureSink;
use crate::engine::command_queue::{CommandQueue, CommandSender};
use crate::engine::notifier::Notifier;
use crate::models::command::{Command, InputBuffer, StartReply, StreamId};
use crate::models::config::RecorderConfiguration;
use crate::models::diagnostics::RecorderDiagnostics;
use crate::models::error::RecorderError;
use crate::models::state::RecorderState;
use crate::schedule::bridge::ScheduleBridge;
use crate::schedule::runner::ScheduleRunner;
use crate::traits::input_backend::{InputBackend, InputStream};
use crate::traits::recorder_listener::RecorderListener;
use crate::traits::scheduler::Scheduler;

/// Buffers kept in the capture pool per recorder.
const POOLED_BUFFERS: usize = 16;

/// Records audio asynchronously.
///
/// Each recorder owns one consumer thread that runs for the recorder's
/// lifetime and processes start, stop, and input commands in FIFO order.
/// All recorder state and the hardware stream live on that thread; callers
/// and the driver's callback thread only ever enqueue commands.
///
/// ```text
/// [driver thread] → CaptureSink ─┐
/// [callers] ─────────────────────┼→ CommandQueue → [consumer thread] → listeners
/// [schedule] → ScheduleBridge ───┘
/// ```
pub struct Recorder {
    config: RecorderConfiguration,
    commands: CommandSender,
    recording: Arc<AtomicBool>,
    notifier: Arc<Notifier<dyn RecorderListener>>,
    diagnostics: Arc<Mutex<RecorderDiagnostics>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    consumer_id: ThreadId,
    consumer_handle: Option<JoinHandle<()>>,
}

impl Recorder {
    /// Create a recorder and start its consumer thread.
    ///
    /// If the configuration has a schedule, `start`/`stop` run that schedule
    /// and the schedule decides when the stream is open.
    pub fn create<B: InputBackend>(config: RecorderConfiguration, backend: B) -> Result<Self, RecorderError> {
        let scheduler = config
            .schedule
            .clone()
            .map(|schedule| Arc::new(ScheduleRunner::new(schedule)) as Arc<dyn Scheduler>);
        Self::build(config, backend, scheduler)
    }

    /// Create a recorder driven by an externally supplied scheduler.
    pub fn with_scheduler<B: InputBackend>(
        config: RecorderConfiguration,
        backend: B,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, RecorderError> {
        Self::build(config, backend, Some(scheduler))
    }

    fn build<B: InputBackend>(
        config: RecorderConfiguration,
        backend: B,
        scheduler: Option<Arc<dyn Scheduler>>,
    ) -> Result<Self, RecorderError> {
        config.validate().map_err(RecorderError::ConfigurationFailed)?;

        let queue = CommandQueue::new();
        let commands = queue.sender();
        let recording = Arc::new(AtomicBool::new(false));
        let notifier: Arc<Notifier<dyn RecorderListener>> = Arc::new(Notifier::new());
        let diagnostics = Arc::new(Mutex::new(RecorderDiagnostics::default()));

        // The engine holds the stream, which need not be `Send`, so it is
        // assembled on the consumer thread itself.
        let engine_config = config.clone();
        let engine_commands = commands.clone();
        let engine_recording = Arc::clone(&recording);
        let engine_notifier = Arc::clone(&notifier);
        let engine_diagnostics = Arc::clone(&diagnostics);
        let pool = BufferPool::new(POOLED_BUFFERS, config.samples_per_buffer());

        let handle = thread::Builder::new()
            .name("audio-recorder".into())
            .spawn(move || {
                let engine = RecorderEngine {
                    config: engine_config,
                    backend,
                    commands: engine_commands,
                    pool,
                    stream: None,
                    stream_id: 0,
                    state: RecorderState::Idle,
                    accepting: Arc::new(AtomicBool::new(false)),
                    recording: engine_recording,
                    notifier: engine_notifier,
                    diagnostics: engine_diagnostics,
                };
                engine.run(queue)
            })
            .map_err(|e| RecorderError::ConfigurationFailed(format!("failed to spawn recorder thread: {}", e)))?;
        let consumer_id = handle.thread().id();

        if let Some(ref scheduler) = scheduler {
            scheduler.add_listener(Arc::new(ScheduleBridge::new(commands.clone())));
        }

        Ok(Self {
            config,
            commands,
            recording,
            notifier,
            diagnostics,
            scheduler,
            consumer_id,
            consumer_handle: Some(handle),
        })
    }

    pub fn config(&self) -> &RecorderConfiguration {
        &self.config
    }

    pub fn device_index(&self) -> usize {
        self.config.device_index
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn sample_width(&self) -> u16 {
        self.config.sample_width()
    }

    pub fn buffer_size(&self) -> u32 {
        self.config.buffer_size
    }

    pub fn has_schedule(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Whether a stream is open (including while a stop is pending).
    ///
    /// Only becomes true once the backend has opened the stream, so a start
    /// that fails never reports recording. Read without synchronizing with the consumer thread, so it may lag
    /// the most recently enqueued command.
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    pub fn diagnostics(&self) -> RecorderDiagnostics {
        self.diagnostics.lock().clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn RecorderListener>) {
        self.notifier.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn RecorderListener>) -> bool {
        self.notifier.remove_listener(listener)
    }

    pub fn clear_listeners(&self) {
        self.notifier.clear_listeners();
    }

    /// Start recording, or start the schedule if there is one.
    ///
    /// Without a schedule this waits for the consumer thread to open the
    /// stream and returns `DeviceUnavailable` if that fails. A start issued
    /// from a listener callback cannot wait on its own thread, so it is only
    /// enqueued.
    pub fn start(&self) -> Result<(), RecorderError> {
        match self.scheduler {
            Some(ref scheduler) => scheduler.start(),
            None => self.start_stream(),
        }
    }

    /// Stop recording, or stop the schedule if there is one.
    ///
    /// Takes effect at the next buffer boundary: the buffer after the stop is
    /// still delivered before the stream closes.
    pub fn stop(&self) -> Result<(), RecorderError> {
        match self.scheduler {
            Some(ref scheduler) => {
                scheduler.stop();
                Ok(())
            }
            None => self.commands.push(Command::Stop),
        }
    }

    /// Block until the schedule run finishes. Returns at once without a schedule.
    pub fn wait(&self) {
        if let Some(ref scheduler) = self.scheduler {
            scheduler.wait();
        }
    }

    fn start_stream(&self) -> Result<(), RecorderError> {
        if thread::current().id() == self.consumer_id {
            return self.commands.push(Command::Start { reply: None });
        }

        let (reply, outcome) = crossbeam_channel::bounded(1);
        self.commands.push(Command::Start { reply: Some(reply) })?;
        outcome.recv().map_err(|_| RecorderError::EngineStopped)?
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(ref scheduler) = self.scheduler {
            scheduler.stop();
        }
        let _ = self.commands.push(Command::Shutdown);
        if let Some(handle) = self.consumer_handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// State owned by the consumer thread.
struct RecorderEngine<B: InputBackend> {
    config: RecorderConfiguration,
    backend: B,
    commands: CommandSender,
    pool: BufferPool,
    stream: Option<Box<dyn InputStream>>,
    stream_id: StreamId,
    state: RecorderState,
    /// Shared with the open stream's sink; gates whether callbacks enqueue.
    accepting: Arc<AtomicBool>,
    /// Published through `Recorder::is_recording`.
    recording: Arc<AtomicBool>,
    notifier: Arc<Notifier<dyn RecorderListener>>,
    diagnostics: Arc<Mutex<RecorderDiagnostics>>,
}

impl<B: InputBackend> RecorderEngine<B> {
    fn run(mut self, queue: CommandQueue) {
        log::debug!("recorder thread started for device {}", self.config.device_index);

        while let Some(command) = queue.pop() {
            log::trace!("processing {} command", command.name());
            match command {
                Command::Start { reply } => self.on_start(reply),
                Command::Stop => self.on_stop(),
                Command::Input { stream, buffer } => self.on_input(stream, buffer),
                Command::Fault { stream, error } => self.on_fault(stream, error),
                Command::Shutdown => {
                    self.on_shutdown();
                    break;
                }
            }
        }

        log::debug!("recorder thread exiting");
    }

    fn on_start(&mut self, reply: Option<StartReply>) {
        let result = self.open_stream();
        match reply {
            Some(reply) => {
                let _ = reply.send(result);
            }
            None => {
                if let Err(e) = result {
                    log::error!("could not start recording: {}", e);
                }
            }
        }
    }

    fn open_stream(&mut self) -> Result<(), RecorderError> {
        if self.state.is_recording() {
            log::debug!("start ignored: already recording");
            return Ok(());
        }

        self.stream_id += 1;
        let sink = CaptureSink::new(
            self.stream_id,
            self.commands.clone(),
            Arc::clone(&self.accepting),
            self.pool.clone(),
            self.config.channels,
            self.config.sample_rate,
        );

        // Accept callbacks before opening so the very first one is kept.
        self.accepting.store(true, Ordering::Release);
        let stream = match self.backend.open(&self.config, sink) {
            Ok(stream) => stream,
            Err(e) => {
                self.accepting.store(false, Ordering::Release);
                let e = match e {
                    RecorderError::DeviceUnavailable(_) => e,
                    other => RecorderError::DeviceUnavailable(other.to_string()),
                };
                return Err(e);
            }
        };

        self.stream = Some(stream);
        self.state = RecorderState::Recording;
        self.recording.store(true, Ordering::Release);
        self.diagnostics.lock().stream_opens += 1;
        log::info!(
            "opened input stream on device {} ({} ch, {} Hz, {} frames/buffer)",
            self.config.device_index,
            self.config.channels,
            self.config.sample_rate,
            self.config.buffer_size
        );

        self.notify("recording_starting", |l| l.recording_starting(Utc::now()));
        self.notify("recording_started", |l| l.recording_started(Utc::now()));
        Ok(())
    }

    fn on_stop(&mut self) {
        match self.state {
            RecorderState::Recording => {
                // Closing here would lose the buffer already in flight; the
                // stream closes after the next input instead.
                self.state = RecorderState::StopPending;
            }
            RecorderState::StopPending => log::debug!("stop ignored: stop already pending"),
            RecorderState::Idle => log::debug!("stop ignored: not recording"),
        }
    }

    fn on_input(&mut self, stream: StreamId, buffer: InputBuffer) {
        if !self.state.is_recording() || stream != self.stream_id {
            log::debug!("discarding buffer from closed stream {}", stream);
            self.diagnostics.lock().buffers_discarded += 1;
            self.pool.recycle(buffer.samples);
            return;
        }

        self.deliver(buffer);

        if self.state.is_stop_pending() {
            self.close_stream(None);
        }
    }

    fn deliver(&mut self, buffer: InputBuffer) {
        {
            let mut d = self.diagnostics.lock();
            d.buffers_delivered += 1;
            d.frames_delivered += buffer.frame_count as u64;
            d.overflow_count += buffer.overflow as u64;
            d.underflow_count += buffer.underflow as u64;
        }

        self.notify("samples_arrived", |l| {
            l.samples_arrived(
                buffer.start_time,
                &buffer.samples,
                buffer.frame_count,
                buffer.overflow,
                buffer.underflow,
            )
        });

        self.pool.recycle(buffer.samples);
    }

    fn on_fault(&mut self, stream: StreamId, error: RecorderError) {
        if !self.state.is_recording() || stream != self.stream_id {
            log::debug!("ignoring fault from closed stream {}: {}", stream, error);
            return;
        }

        log::error!("input stream failed: {}", error);
        self.diagnostics.lock().stream_faults += 1;
        let error = match error {
            RecorderError::StreamFault(_) => error,
            other => RecorderError::StreamFault(other.to_string()),
        };
        self.close_stream(Some(error));
    }

    fn on_shutdown(&mut self) {
        if self.state.is_recording() {
            self.close_stream(None);
        }
    }

    fn close_stream(&mut self, fault: Option<RecorderError>) {
        self.accepting.store(false, Ordering::Release);
        self.recording.store(false, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.close() {
                log::warn!("error while closing input stream: {}", e);
            }
        }
        self.state = RecorderState::Idle;
        log::info!("closed input stream on device {}", self.config.device_index);

        self.notify("recording_stopped", |l| l.recording_stopped(Utc::now(), fault.as_ref()));
    }

    fn notify(&self, event: &str, f: impl Fn(&dyn RecorderListener)) {
        let panicked = self.notifier.notify(event, |l| f(l));
        if panicked > 0 {
            self.diagnostics.lock().listener_panics += panicked;
        }
    }
}
