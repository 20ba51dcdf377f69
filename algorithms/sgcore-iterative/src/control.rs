//! Explicit control of a training run
//!
//! A [`TrainingControl`] travels through the training loop. Other threads stop a run through a
//! [`CancelHandle`]; the loop observes the request before the next iteration.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Result of a single iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// The convergence criterion is met, no further iteration is needed
    Converged,
}

/// Summary of a call to `train` or `continue_train`
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingOutcome {
    /// The model converged
    pub complete: bool,
    /// Iterations done so far, over all resumed runs
    pub iterations: usize,
    /// The run was stopped through its control
    pub cancelled: bool,
}

impl TrainingOutcome {
    /// Neither converged nor cancelled, the iteration budget ran out
    pub fn is_exhausted(&self) -> bool {
        !self.complete && !self.cancelled
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingControl {
    cancelled: Arc<AtomicBool>,
}

impl TrainingControl {
    pub fn new() -> Self {
        TrainingControl::default()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so that the control can drive another run
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Requests the cancellation of the runs driven by a [`TrainingControl`]
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_cancels_every_clone() {
        let control = TrainingControl::new();
        let copy = control.clone();
        assert!(!control.is_cancelled());

        let handle = control.cancel_handle();
        std::thread::spawn(move || handle.cancel())
            .join()
            .unwrap();

        assert!(control.is_cancelled());
        assert!(copy.is_cancelled());

        control.reset();
        assert!(!copy.is_cancelled());
    }
}
