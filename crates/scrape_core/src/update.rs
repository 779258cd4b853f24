use crate::view_model::NoticeLevel;
use crate::{
    validate, AppState, Effect, FailureReason, JobHandle, JobResult, JobStatus, Msg,
    Notification, ResolveError,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested(candidate) => {
            if !state.accepts_new_job() {
                let text = if state.status().is_terminal() {
                    "Clear the finished job before starting a new one."
                } else {
                    "A job is already running."
                };
                state.set_notice(NoticeLevel::Error, text);
                return (state, Vec::new());
            }
            match validate(&candidate) {
                Ok(request) => {
                    state.begin_launch(request.clone());
                    state.set_notice(NoticeLevel::Info, "Initializing scraper...");
                    vec![Effect::Launch { request }]
                }
                Err(err) => {
                    state.notify(Notification::Invalid(err));
                    state.set_notice(NoticeLevel::Error, err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::LaunchSucceeded { handle, message } => {
            if state.take_pending().is_none() {
                // Nobody asked for this job; hand the slot straight back.
                return (state, vec![Effect::Release { handle }]);
            }
            state.start_running(handle);
            if state.take_cancel_on_ack() {
                state.fail(FailureReason::UserCancelled);
                state.set_notice(NoticeLevel::Warning, "Scraping cancelled.");
                vec![Effect::Cancel { handle }, Effect::Release { handle }]
            } else {
                let text = message.unwrap_or_else(|| {
                    "Scraping started successfully! This may take several minutes.".to_string()
                });
                state.set_notice(NoticeLevel::Success, text);
                Vec::new()
            }
        }
        Msg::LaunchFailed(err) => {
            if state.take_pending().is_some() {
                state.take_cancel_on_ack();
                state.set_notice(NoticeLevel::Error, format!("Failed to start scraping: {err}"));
                state.fail(FailureReason::Launch(err));
            }
            Vec::new()
        }
        Msg::WorkerProgress { handle, event } => {
            if state.owns(handle) && *state.status() == JobStatus::Running {
                state.accept_progress(handle, event);
            }
            Vec::new()
        }
        Msg::WorkerDone { handle } => {
            if state.owns(handle) && *state.status() == JobStatus::Running {
                state.complete();
                state.set_notice(NoticeLevel::Success, "Scraping completed successfully!");
                vec![
                    Effect::Release { handle },
                    Effect::Resolve {
                        handle,
                        row_limit: None,
                    },
                ]
            } else {
                Vec::new()
            }
        }
        Msg::WorkerFailed { handle, message } => {
            fail_running(&mut state, handle, FailureReason::Worker(message))
        }
        Msg::TransportLost { handle, message } => {
            fail_running(&mut state, handle, FailureReason::TransportLost(message))
        }
        Msg::CancelRequested => match state.handle() {
            Some(handle) if *state.status() == JobStatus::Running => {
                state.fail(FailureReason::UserCancelled);
                state.set_notice(NoticeLevel::Warning, "Scraping cancelled.");
                vec![Effect::Cancel { handle }, Effect::Release { handle }]
            }
            _ if state.is_launching() => {
                state.request_cancel_on_ack();
                state.set_notice(NoticeLevel::Warning, "Cancelling once the worker responds...");
                Vec::new()
            }
            _ => Vec::new(),
        },
        Msg::ResolveRequested => match state.handle() {
            Some(handle) if state.status().is_terminal() && !state.has_final_result() => {
                vec![Effect::Resolve {
                    handle,
                    row_limit: state.row_limit(),
                }]
            }
            _ => Vec::new(),
        },
        Msg::ResultResolved { handle, outcome } => {
            if state.owns(handle) && state.status().is_terminal() && !state.has_final_result() {
                let outcome = within_row_limit(outcome, state.row_limit());
                match &outcome {
                    Ok(result) => state.set_notice(
                        NoticeLevel::Success,
                        format!(
                            "Scraped {} profiles ({} developers). Results in {}.",
                            result.total_processed(),
                            result.developers(),
                            result.output_artifact_path().display()
                        ),
                    ),
                    Err(err) => state.set_notice(NoticeLevel::Error, err.to_string()),
                }
                state.store_result(handle, outcome);
            }
            Vec::new()
        }
        Msg::OpenArtifactRequested => {
            state.set_notice(NoticeLevel::Info, "Opening Excel file...");
            vec![Effect::OpenArtifact]
        }
        Msg::ArtifactOpened(outcome) => {
            match outcome {
                Ok(message) => state.set_notice(
                    NoticeLevel::Success,
                    message.unwrap_or_else(|| "Excel file opened successfully.".to_string()),
                ),
                Err(err) => state.set_notice(
                    NoticeLevel::Error,
                    format!("Failed to open Excel file: {err}"),
                ),
            }
            Vec::new()
        }
        Msg::ResetRequested => {
            if state.status().is_terminal() {
                state.reset();
                state.set_notice(NoticeLevel::Success, "Data cleared successfully");
            } else if !state.accepts_new_job() {
                state.set_notice(NoticeLevel::Error, "Cannot clear data while a job is running.");
            }
            Vec::new()
        }
        Msg::Tick { now_ms } => {
            state.set_now(now_ms);
            if *state.status() == JobStatus::Running {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn fail_running(state: &mut AppState, handle: JobHandle, reason: FailureReason) -> Vec<Effect> {
    if !state.owns(handle) || *state.status() != JobStatus::Running {
        return Vec::new();
    }
    state.set_notice(NoticeLevel::Error, format!("Scraping failed: {reason}"));
    state.fail(reason);
    vec![Effect::Release { handle }]
}

/// An artifact with more rows than the job reported before its cancel was
/// written after it, by a worker that kept going.
fn within_row_limit(
    outcome: Result<JobResult, ResolveError>,
    row_limit: Option<u32>,
) -> Result<JobResult, ResolveError> {
    match (outcome, row_limit) {
        (Ok(result), Some(limit)) if result.total_processed() > limit => Err(
            ResolveError::ArtifactMissing(result.output_artifact_path().to_path_buf()),
        ),
        (outcome, _) => outcome,
    }
}
