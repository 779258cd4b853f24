use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Opaque identifier for one launched job.
///
/// Carries the wall-clock launch time so that output artifacts older than the
/// job can be told apart from the job's own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle {
    id: u64,
    launched_at: SystemTime,
}

impl JobHandle {
    pub fn new(id: u64, launched_at: SystemTime) -> Self {
        Self { id, launched_at }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn launched_at(&self) -> SystemTime {
        self.launched_at
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed(FailureReason),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Launch(LaunchError),
    Worker(String),
    TransportLost(String),
    /// Operator cancelled the job. A normal terminal state, not an error.
    UserCancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Launch(err) => write!(f, "launch failed: {err}"),
            FailureReason::Worker(message) => write!(f, "worker error: {message}"),
            FailureReason::TransportLost(message) => {
                write!(f, "lost contact with worker: {message}")
            }
            FailureReason::UserCancelled => write!(f, "cancelled by user"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    #[error("worker unreachable: {0}")]
    Unreachable(String),
    #[error("worker rejected the request: {0}")]
    Rejected(String),
    #[error("a job is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no output artifact at {}", .0.display())]
    ArtifactMissing(PathBuf),
    #[error("output artifact {} is unreadable: {reason}", .path.display())]
    ArtifactUnreadable { path: PathBuf, reason: String },
}

/// Totals for one finished job. Only produced by [`ArtifactTally::finish`],
/// so every number traces back to rows of the output artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    total_processed: u32,
    succeeded: u32,
    failed: u32,
    developers: u32,
    output_artifact_path: PathBuf,
}

impl JobResult {
    pub fn total_processed(&self) -> u32 {
        self.total_processed
    }

    pub fn succeeded(&self) -> u32 {
        self.succeeded
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Rows whose title names an engineering or development role.
    pub fn developers(&self) -> u32 {
        self.developers
    }

    pub fn output_artifact_path(&self) -> &Path {
        &self.output_artifact_path
    }

    /// `None` for an empty artifact.
    pub fn success_rate_percent(&self) -> Option<u32> {
        if self.total_processed == 0 {
            return None;
        }
        Some(self.succeeded * 100 / self.total_processed)
    }
}

/// Name markers the worker writes for a profile it could not scrape.
const FAILED_ROW_MARKERS: &[&str] = &["Failed to scrape", "N/A"];

const DEVELOPER_KEYWORDS: &[&str] = &[
    "developer",
    "engineer",
    "engineering",
    "programmer",
    "software",
    "sde",
    "swe",
    "devops",
];

/// Accumulates artifact rows into a [`JobResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactTally {
    total: u32,
    failed: u32,
    developers: u32,
}

impl ArtifactTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one data row given its `Name` and `Title` cells.
    pub fn record(&mut self, name: &str, title: &str) {
        self.total += 1;
        let name = name.trim();
        if FAILED_ROW_MARKERS
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(name))
        {
            self.failed += 1;
            return;
        }
        if is_developer_title(title) {
            self.developers += 1;
        }
    }

    pub fn rows(&self) -> u32 {
        self.total
    }

    pub fn finish(self, output_artifact_path: impl Into<PathBuf>) -> JobResult {
        JobResult {
            total_processed: self.total,
            succeeded: self.total - self.failed,
            failed: self.failed,
            developers: self.developers,
            output_artifact_path: output_artifact_path.into(),
        }
    }
}

fn is_developer_title(title: &str) -> bool {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| {
            DEVELOPER_KEYWORDS
                .iter()
                .any(|keyword| keyword.eq_ignore_ascii_case(word))
        })
}
