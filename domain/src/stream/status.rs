//! Stream lifecycle status

use serde::{Deserialize, Serialize};

/// Lifecycle of one generation stream.
///
/// `Starting -> Streaming -> {Completed | Cancelled | Error}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    Starting,
    Streaming,
    Completed,
    Cancelled,
    Error,
}

impl StreamStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamStatus::Completed | StreamStatus::Cancelled | StreamStatus::Error
        )
    }

    /// Terminal states accept nothing; `Streaming` cannot go back to `Starting`.
    pub fn can_transition_to(&self, next: StreamStatus) -> bool {
        match self {
            StreamStatus::Starting => true,
            StreamStatus::Streaming => next != StreamStatus::Starting,
            _ => false,
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamStatus::Starting => "STARTING",
            StreamStatus::Streaming => "STREAMING",
            StreamStatus::Completed => "COMPLETED",
            StreamStatus::Cancelled => "CANCELLED",
            StreamStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transition_out_of_terminal() {
        for terminal in [
            StreamStatus::Completed,
            StreamStatus::Cancelled,
            StreamStatus::Error,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(StreamStatus::Streaming));
            assert!(!terminal.can_transition_to(StreamStatus::Completed));
        }
    }

    #[test]
    fn test_forward_transitions() {
        assert!(StreamStatus::Starting.can_transition_to(StreamStatus::Streaming));
        assert!(StreamStatus::Starting.can_transition_to(StreamStatus::Error));
        assert!(StreamStatus::Streaming.can_transition_to(StreamStatus::Cancelled));
        assert!(!StreamStatus::Streaming.can_transition_to(StreamStatus::Starting));
    }
}
