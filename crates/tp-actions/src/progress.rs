//! Progress reporting seam for long-running actions.

use tp_common::response::ActionState;

/// Receives intermediate progress while an action runs.
pub trait ProgressSink {
    fn update(&mut self, state: ActionState, progress: u32, message: &str);
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&mut self, _state: ActionState, _progress: u32, _message: &str) {}
}

/// One recorded progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub state: ActionState,
    pub progress: u32,
    pub message: String,
}

/// Records every update for later inspection. Used by tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub updates: Vec<ProgressUpdate>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The progress values seen so far, in order.
    pub fn progress_values(&self) -> Vec<u32> {
        self.updates.iter().map(|u| u.progress).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn update(&mut self, state: ActionState, progress: u32, message: &str) {
        self.updates.push(ProgressUpdate {
            state,
            progress,
            message: message.to_owned(),
        });
    }
}
