use crate::progress::interpolate;
use crate::view_model::{Notice, NoticeLevel, ProgressView};
use crate::{
    FailureReason, JobHandle, JobRequest, JobResult, JobStatus, Notification, ProgressEvent,
    ResolveError,
};

/// Monotonic timestamps supplied through `Msg::Tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct JobClock {
    now_ms: u64,
    started_ms: Option<u64>,
    last_event_ms: Option<u64>,
}

/// Session-scoped controller state. Mutated only through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    status: JobStatus,
    /// Validated request whose launch has not been acknowledged yet.
    pending: Option<JobRequest>,
    cancel_on_ack: bool,
    request: Option<JobRequest>,
    handle: Option<JobHandle>,
    last_event: Option<ProgressEvent>,
    rejected_events: u32,
    /// Last authoritative profile index when the operator cancelled.
    cancelled_at: Option<u32>,
    result: Option<Result<JobResult, ResolveError>>,
    notice: Option<Notice>,
    clock: JobClock,
    notifications: Vec<Notification>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn handle(&self) -> Option<JobHandle> {
        self.handle
    }

    pub fn request(&self) -> Option<&JobRequest> {
        self.request.as_ref()
    }

    pub fn is_launching(&self) -> bool {
        self.pending.is_some()
    }

    /// Idle with no launch in flight.
    pub fn accepts_new_job(&self) -> bool {
        self.status == JobStatus::Idle && self.pending.is_none()
    }

    pub fn last_event(&self) -> Option<&ProgressEvent> {
        self.last_event.as_ref()
    }

    /// Rows of the artifact that belong to this job, when it was cancelled.
    pub fn row_limit(&self) -> Option<u32> {
        self.cancelled_at
    }

    pub fn result(&self) -> Option<&Result<JobResult, ResolveError>> {
        self.result.as_ref()
    }

    pub fn view(&self) -> ProgressView {
        let profile_limit = self.request.as_ref().map(JobRequest::profile_limit);
        let percent_complete = match (self.last_event.as_ref(), profile_limit) {
            (Some(event), Some(limit)) if limit > 0 => {
                (u64::from(event.sequence_index) * 100 / u64::from(limit)) as u8
            }
            _ => 0,
        };
        let estimate = match (&self.status, self.request.as_ref(), self.clock.started_ms) {
            (JobStatus::Running, Some(request), Some(started_ms)) => {
                let since_start = self.clock.now_ms.saturating_sub(started_ms);
                let since_event = self
                    .clock
                    .last_event_ms
                    .map(|at| self.clock.now_ms.saturating_sub(at))
                    .unwrap_or(since_start);
                Some(interpolate(
                    request,
                    self.last_event.as_ref(),
                    since_start,
                    since_event,
                ))
            }
            _ => None,
        };

        ProgressView {
            status: self.status.clone(),
            launching: self.pending.is_some(),
            handle: self.handle,
            profile_limit,
            authoritative: self.last_event,
            percent_complete,
            estimate,
            rejected_events: self.rejected_events,
            result: self.result.clone(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Drains notifications produced by the last transitions.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_now(&mut self, now_ms: u64) {
        self.clock.now_ms = now_ms;
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub(crate) fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let notice = Notice {
            level,
            text: text.into(),
        };
        self.notifications.push(Notification::Notice(notice.clone()));
        self.notice = Some(notice);
        self.dirty = true;
    }

    pub(crate) fn begin_launch(&mut self, request: JobRequest) {
        self.request = Some(request.clone());
        self.pending = Some(request);
        self.cancel_on_ack = false;
        self.dirty = true;
    }

    pub(crate) fn take_pending(&mut self) -> Option<JobRequest> {
        self.pending.take()
    }

    pub(crate) fn request_cancel_on_ack(&mut self) {
        self.cancel_on_ack = true;
    }

    pub(crate) fn take_cancel_on_ack(&mut self) -> bool {
        std::mem::take(&mut self.cancel_on_ack)
    }

    pub(crate) fn start_running(&mut self, handle: JobHandle) {
        self.handle = Some(handle);
        self.last_event = None;
        self.rejected_events = 0;
        self.cancelled_at = None;
        self.result = None;
        self.clock.started_ms = Some(self.clock.now_ms);
        self.clock.last_event_ms = None;
        self.transition(JobStatus::Running);
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        if reason == FailureReason::UserCancelled {
            self.cancelled_at = Some(self.last_event.map_or(0, |e| e.sequence_index));
        }
        self.transition(JobStatus::Failed(reason));
    }

    pub(crate) fn complete(&mut self) {
        self.transition(JobStatus::Completed);
    }

    fn transition(&mut self, status: JobStatus) {
        self.status = status.clone();
        self.notifications.push(Notification::Status(status));
        self.dirty = true;
    }

    /// Whether `handle` is the one this state currently tracks.
    pub(crate) fn owns(&self, handle: JobHandle) -> bool {
        self.handle == Some(handle)
    }

    /// Accepts an authoritative event if it keeps the stream ordered and bounded.
    pub(crate) fn accept_progress(&mut self, handle: JobHandle, event: ProgressEvent) -> bool {
        let limit = self
            .request
            .as_ref()
            .map(JobRequest::profile_limit)
            .unwrap_or(0);
        let floor = self.last_event.map(|e| e.sequence_index).unwrap_or(1);
        if event.sequence_index < floor || event.sequence_index > limit {
            self.rejected_events += 1;
            self.dirty = true;
            return false;
        }
        self.last_event = Some(event);
        self.clock.last_event_ms = Some(self.clock.now_ms);
        self.notifications.push(Notification::Progress { handle, event });
        self.dirty = true;
        true
    }

    pub(crate) fn has_final_result(&self) -> bool {
        matches!(self.result, Some(Ok(_)))
    }

    pub(crate) fn store_result(
        &mut self,
        handle: JobHandle,
        outcome: Result<JobResult, ResolveError>,
    ) {
        self.notifications.push(Notification::Resolved {
            handle,
            outcome: outcome.clone(),
        });
        self.result = Some(outcome);
        self.dirty = true;
    }

    /// Back to Idle; only the clock survives.
    pub(crate) fn reset(&mut self) {
        let now_ms = self.clock.now_ms;
        let notifications = std::mem::take(&mut self.notifications);
        *self = Self::default();
        self.clock.now_ms = now_ms;
        self.notifications = notifications;
        self.transition(JobStatus::Idle);
    }
}
