use crate::{JobCandidate, JobHandle, JobResult, LaunchError, ProgressEvent, ResolveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked to start a job with these parameters.
    StartRequested(JobCandidate),
    /// The gateway acknowledged the launch.
    LaunchSucceeded {
        handle: JobHandle,
        message: Option<String>,
    },
    /// The gateway could not launch the job.
    LaunchFailed(LaunchError),
    /// Authoritative progress from the worker.
    WorkerProgress {
        handle: JobHandle,
        event: ProgressEvent,
    },
    /// The worker reported that the job finished.
    WorkerDone { handle: JobHandle },
    /// The worker reported a failure.
    WorkerFailed { handle: JobHandle, message: String },
    /// The progress feed broke before the worker said done.
    TransportLost { handle: JobHandle, message: String },
    /// Operator clicked Cancel.
    CancelRequested,
    /// Operator asked for the result summary again, e.g. after a cancel.
    ResolveRequested,
    /// The resolver finished reading the artifact.
    ResultResolved {
        handle: JobHandle,
        outcome: Result<JobResult, ResolveError>,
    },
    /// Operator asked the worker to open the output artifact.
    OpenArtifactRequested,
    /// Outcome of the open request.
    ArtifactOpened(Result<Option<String>, LaunchError>),
    /// Operator cleared a finished job.
    ResetRequested,
    /// Monotonic clock tick in milliseconds, drives the local estimate.
    Tick { now_ms: u64 },
    /// Fallback for placeholder wiring.
    NoOp,
}
