//! Scraper controller core: pure job state machine, request validation and view-model helpers.
mod effect;
mod job;
mod msg;
mod progress;
mod request;
mod session;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use job::{
    ArtifactTally, FailureReason, JobHandle, JobResult, JobStatus, LaunchError, ResolveError,
};
pub use msg::Msg;
pub use progress::{
    format_remaining, interpolate, EstimateBasis, LocalEstimate, Phase, ProgressEvent,
    ASSUMED_PROFILE_OVERHEAD_SECS,
};
pub use request::{
    validate, JobCandidate, JobRequest, ValidationError, DELAY_SECONDS_RANGE, PROFILE_LIMIT_RANGE,
};
pub use session::{JobObserver, Notification, Session, SubscriptionId};
pub use state::AppState;
pub use update::update;
pub use view_model::{Notice, NoticeLevel, ProgressView};
