/// Counters maintained by the engine's consumer thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderDiagnostics {
    pub stream_opens: u64,
    pub buffers_delivered: u64,
    pub frames_delivered: u64,
    pub overflow_count: u64,
    pub underflow_count: u64,
    /// Buffers that reached the engine after their stream was closed.
    pub buffers_discarded: u64,
    pub stream_faults: u64,
    pub listener_panics: u64,
}
