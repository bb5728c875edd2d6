//! Public types for the mirror coordinator.

/// Mirror lifecycle state.
///
/// Broadcast on a watch channel; use [`super::Mirror::state()`] to check the
/// current state or [`super::Mirror::state_receiver()`] to watch transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// Accepting change events and processing the queue.
    Running,
    /// Stop requested; queue draining, no new work accepted.
    Draining,
    /// Worker stopped, state persisted; safe to exit.
    Terminated,
}

impl std::fmt::Display for MirrorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Draining => write!(f, "Draining"),
            Self::Terminated => write!(f, "Terminated"),
        }
    }
}
