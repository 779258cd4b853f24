use scrape_core::{JobHandle, JobResult, LaunchError, ProgressEvent, ResolveError};

/// Everything the engine reports back to the host, already in core terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Launched(Result<Launched, LaunchError>),
    Progress {
        handle: JobHandle,
        event: ProgressEvent,
    },
    WorkerDone {
        handle: JobHandle,
    },
    WorkerFailed {
        handle: JobHandle,
        message: String,
    },
    /// The progress feed ended or broke before the worker said done.
    FeedClosed {
        handle: JobHandle,
        reason: String,
    },
    CancelSignalled {
        handle: JobHandle,
        outcome: Result<(), LaunchError>,
    },
    Resolved {
        handle: JobHandle,
        outcome: Result<JobResult, ResolveError>,
    },
    ArtifactOpened(Result<Option<String>, LaunchError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub handle: JobHandle,
    /// Free-form acknowledgment text from the worker.
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("progress feed io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("progress feed line too long or undecodable: {0}")]
    Codec(String),
}
