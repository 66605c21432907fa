//! Fluent builder for Instance construction.
//!
//! Provides a builder pattern interface for creating and configuring Instance values.

use crate::error::Result;
use crate::port::{CompletionPort, PollPort};
use crate::reactor::core::Instance;

/// Default number of completions drained per blocking step.
pub const DEFAULT_COMPLETION_BATCH: usize = 64;

/// Builder for constructing Instance values with fluent API.
///
/// # Example
/// ```ignore
/// let instance = InstanceBuilder::new().completion_batch(256).build()?;
/// ```
#[derive(Debug, Clone)]
pub struct InstanceBuilder {
    completion_batch: usize,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceBuilder {
    /// Creates a new instance builder with default settings.
    pub fn new() -> Self {
        Self {
            completion_batch: DEFAULT_COMPLETION_BATCH,
        }
    }

    /// Sets how many completions one blocking step may drain from the port.
    ///
    /// Completions beyond a caller's buffer stay queued as ready Watches and
    /// are reported by later waits. Values below 1 are raised to 1.
    pub fn completion_batch(mut self, batch: usize) -> Self {
        self.completion_batch = batch.max(1);
        self
    }

    /// Builds an instance on a new [`PollPort`].
    ///
    /// # Errors
    /// Returns [`Error::Io`](crate::Error::Io) if the port cannot be created.
    pub fn build(self) -> Result<Instance<PollPort>> {
        let port = PollPort::new()?;
        Ok(self.build_with_port(port))
    }

    /// Builds an instance on the given completion port.
    pub fn build_with_port<P: CompletionPort>(self, port: P) -> Instance<P> {
        Instance::with_port(port, self.completion_batch)
    }
}
