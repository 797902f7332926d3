use super::snapshot::MatchSnapshot;

/// Events broadcast from the match actor to all subscribers.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum MatchEvent {
    /// Full state snapshot after any mutation.
    StateChanged(MatchSnapshot),
    /// An engine query failed or returned an unusable move.
    EngineFailed { reason: String, retrying: bool },
    /// Error notification.
    Error(String),
}
