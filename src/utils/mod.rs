//! Utility functions and types

use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock timer for a named stage
#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    checkpoints: Vec<(String, Duration)>,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            checkpoints: Vec::new(),
        }
    }

    /// Record the elapsed time under `label`
    pub fn checkpoint(&mut self, label: impl Into<String>) {
        let label = label.into();
        let elapsed = self.start.elapsed();
        debug!(stage = %self.name, checkpoint = %label, secs = elapsed.as_secs_f64(), "Checkpoint");
        self.checkpoints.push((label, elapsed));
    }

    /// Recorded checkpoints, in order
    pub fn checkpoints(&self) -> &[(String, Duration)] {
        &self.checkpoints
    }

    /// Stop and log the timer
    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        info!(stage = %self.name, secs = elapsed.as_secs_f64(), "{} completed", self.name);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_checkpoints_are_monotonic() {
        let mut timer = Timer::start("split");
        timer.checkpoint("a");
        timer.checkpoint("b");

        let checkpoints = timer.checkpoints().to_vec();
        assert_eq!(checkpoints.len(), 2);
        assert_eq!(checkpoints[0].0, "a");
        assert!(checkpoints[0].1 <= checkpoints[1].1);

        let total = timer.stop();
        assert!(total >= checkpoints[1].1);
    }
}
