use std::time::Duration;

use tokio::time::Instant;

/// Coalesces bursts of edits into one deadline `quiet` after the last edit.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// (Re)starts the quiet period from now.
    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves once the quiet period has passed and clears the deadline.
    /// Pends forever when nothing is scheduled. Cancel safe: a rescheduled
    /// deadline is picked up by the next call.
    pub async fn elapsed(&mut self) {
        let Some(deadline) = self.deadline else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;
        self.deadline = None;
    }
}
