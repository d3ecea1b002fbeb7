//! Coalescing of re-index requests.
//!
//! Every content change requests a re-index. Requests only bump a
//! generation counter; the work happens when the owner runs the pending
//! job, and a result computed for an older generation is discarded.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Clone, Debug, Default)]
pub struct ReindexScheduler {
    generation: u64,
    pending: bool,
}

impl ReindexScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the index stale. Returns the new generation.
    pub fn request(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        tracing::trace!(generation = self.generation, "re-index requested");
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts the pending run, if any.
    pub fn begin(&mut self) -> Option<Ticket> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(Ticket(self.generation))
    }

    /// Whether the run for `ticket` is still current. A request made since
    /// it began supersedes it and leaves a new run pending.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        let current = ticket.0 == self.generation;
        if !current {
            tracing::debug!(
                stale = ticket.0,
                current = self.generation,
                "re-index superseded"
            );
        }
        current
    }
}
