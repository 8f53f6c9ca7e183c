use std::fmt::{self, Display};

/// The states a training invocation goes through on every model update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainPhase {
    /// The batches are being processed by the worker pool.
    Dispatching,
    /// The counters of every batch are being summed.
    Reducing,
    Regularizing,
    Normalizing,
    /// The new model version is visible to readers.
    Published,
}

impl Display for TrainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dispatching => "dispatching",
            Self::Reducing => "reducing",
            Self::Regularizing => "regularizing",
            Self::Normalizing => "normalizing",
            Self::Published => "published",
        };

        f.write_str(name)
    }
}
