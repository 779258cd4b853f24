use crate::{
    update, AppState, Effect, JobHandle, JobResult, JobStatus, Msg, Notice, ProgressEvent,
    ProgressView, ResolveError, ValidationError,
};

/// What observers hear about, in the order transitions happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Status(JobStatus),
    Progress {
        handle: JobHandle,
        event: ProgressEvent,
    },
    Resolved {
        handle: JobHandle,
        outcome: Result<JobResult, ResolveError>,
    },
    Invalid(ValidationError),
    Notice(Notice),
}

pub trait JobObserver: Send + Sync {
    fn notify(&self, notification: &Notification);
}

impl<F> JobObserver for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Owns the controller state for one operator session and fans out
/// notifications to subscribed observers after each message.
///
/// Every message is applied in full before any observer runs, so observers
/// never see a half-applied transition.
#[derive(Default)]
pub struct Session {
    state: AppState,
    observers: Vec<(SubscriptionId, Box<dyn JobObserver>)>,
    next_subscription: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl JobObserver + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        let observer: Box<dyn JobObserver> = Box::new(observer);
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Applies `msg` and returns the effects the host must execute.
    pub fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let notifications = state.take_notifications();
        self.state = state;
        for notification in &notifications {
            for (_, observer) in &self.observers {
                observer.notify(notification);
            }
        }
        effects
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> ProgressView {
        self.state.view()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }
}
