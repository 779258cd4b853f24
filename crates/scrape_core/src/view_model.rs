use crate::{JobHandle, JobResult, JobStatus, LocalEstimate, ProgressEvent, ResolveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Short operator-facing message about the latest transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressView {
    pub status: JobStatus,
    pub launching: bool,
    pub handle: Option<JobHandle>,
    pub profile_limit: Option<u32>,
    /// Latest progress as reported by the worker.
    pub authoritative: Option<ProgressEvent>,
    /// Derived from `authoritative` only.
    pub percent_complete: u8,
    /// Local interpolation; absent unless Running.
    pub estimate: Option<LocalEstimate>,
    /// Worker events dropped for being out of order or out of bounds.
    pub rejected_events: u32,
    pub result: Option<Result<JobResult, ResolveError>>,
    pub notice: Option<Notice>,
    pub dirty: bool,
}
