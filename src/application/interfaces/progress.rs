use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One progress tick: the current phase name, how far through it we are,
/// the (estimated) total, and a human-readable message.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: String,
    pub current: u64,
    pub total: u64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(phase: impl Into<String>, current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            current,
            total,
            message: message.into(),
        }
    }

    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.current as f32 / self.total as f32) * 100.0
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cooperative cancellation shared across an orchestrator run and the
/// subprocesses/suspension points it spawns. Checked at suspension points;
/// never preempts a CPU-bound step mid-flight.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
