/// Crawl phase definitions for the orchestrator's state machine
use std::fmt;

/// Represents the lifecycle phase of a crawl run
///
/// `Init -> Running -> (Checkpointing <-> Running)* -> Done`. A run may jump
/// to `Done` from any phase so that abnormal termination still finishes
/// cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Frontier restored or seeded, nothing fetched yet
    Init,

    /// Fetch batches are being dispatched
    Running,

    /// A checkpoint is being written
    Checkpointing,

    /// Final checkpoint and report written
    Done,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::Done, _) => false,
            (_, Self::Done) => true,
            (Self::Init, Self::Running) => true,
            (Self::Init, Self::Checkpointing) => true,
            (Self::Running, Self::Checkpointing) => true,
            (Self::Checkpointing, Self::Running) => true,
            _ => false,
        }
    }

    /// Returns the lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Checkpointing => "checkpointing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
