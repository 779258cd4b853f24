use crate::{JobHandle, JobRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Submit the request to the worker.
    Launch { request: JobRequest },
    /// Best-effort stop signal to the worker.
    Cancel { handle: JobHandle },
    /// The handle reached a terminal state; free the gateway slot.
    Release { handle: JobHandle },
    /// Read the output artifact for this job. `row_limit` caps how many rows
    /// count; a cancelled job only owns the rows up to its last reported profile.
    Resolve {
        handle: JobHandle,
        row_limit: Option<u32>,
    },
    /// Ask the worker to open the output artifact.
    OpenArtifact,
}
