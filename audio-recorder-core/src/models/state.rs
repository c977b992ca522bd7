/// Recorder engine state machine.
///
/// State transitions:
/// ```text
///          Start                 Stop
/// Idle ───────────→ Recording ─────────→ StopPending
///   ↑                  │                     │
///   └── Fault ─────────┘                     │
///   └──────────── Input (after delivery) ────┘
/// ```
///
/// Owned and mutated only by the engine's consumer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    StopPending,
}

impl RecorderState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// True while a hardware stream is open, including while a stop is pending.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording | Self::StopPending)
    }

    pub fn is_stop_pending(&self) -> bool {
        matches!(self, Self::StopPending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_pending_counts_as_recording() {
        assert!(RecorderState::StopPending.is_recording());
        assert!(RecorderState::StopPending.is_stop_pending());
        assert!(!RecorderState::Recording.is_stop_pending());
    }

    #[test]
    fn default_is_idle() {
        let state = RecorderState::default();
        assert!(state.is_idle());
        assert!(!state.is_recording());
    }
}
