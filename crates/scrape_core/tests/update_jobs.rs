use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use scrape_core::{
    update, AppState, ArtifactTally, Effect, EstimateBasis, FailureReason, JobCandidate,
    JobHandle, JobStatus, Msg, Phase, ProgressEvent, ResolveError,
};

const PEOPLE_URL: &str = "https://www.linkedin.com/company/acme/people/";

fn handle(id: u64) -> JobHandle {
    JobHandle::new(id, SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
}

fn running(limit: u32, delay: u32) -> AppState {
    let (state, _) = update(AppState::new(), Msg::Tick { now_ms: 1_000 });
    let (state, _) = update(
        state,
        Msg::StartRequested(JobCandidate::new(PEOPLE_URL, limit, delay)),
    );
    let (state, _) = update(
        state,
        Msg::LaunchSucceeded {
            handle: handle(1),
            message: Some("Started scraping".to_string()),
        },
    );
    state
}

fn progress(state: AppState, sequence_index: u32, phase: Phase, elapsed_ms: u64) -> AppState {
    let (state, effects) = update(
        state,
        Msg::WorkerProgress {
            handle: handle(1),
            event: ProgressEvent {
                sequence_index,
                phase,
                elapsed_ms,
                estimated_remaining_ms: None,
            },
        },
    );
    assert!(effects.is_empty());
    state
}

fn tally(rows: u32) -> scrape_core::JobResult {
    let mut tally = ArtifactTally::new();
    for i in 0..rows {
        tally.record(&format!("Person {i}"), "Software Engineer");
    }
    tally.finish(PathBuf::from("jobs.xlsx"))
}

#[test]
fn progress_updates_authoritative_view() {
    let state = running(4, 5);
    let mut state = progress(state, 1, Phase::ExtractingProfile, 8_000);

    let view = state.view();
    let event = view.authoritative.expect("authoritative progress");
    assert_eq!(event.sequence_index, 1);
    assert_eq!(event.phase, Phase::ExtractingProfile);
    assert_eq!(view.percent_complete, 25);
    assert!(state.consume_dirty());

    let state = progress(state, 1, Phase::ExtractingSkills, 9_000);
    let state = progress(state, 2, Phase::ExtractingProfile, 16_000);
    let view = state.view();
    assert_eq!(view.authoritative.unwrap().sequence_index, 2);
    assert_eq!(view.percent_complete, 50);
    assert_eq!(view.rejected_events, 0);
}

#[test]
fn out_of_order_and_out_of_bounds_events_are_dropped() {
    let state = running(3, 5);
    let state = progress(state, 2, Phase::ExtractingProfile, 10_000);

    // Going backwards.
    let state = progress(state, 1, Phase::Persisting, 11_000);
    // Beyond the profile limit.
    let state = progress(state, 4, Phase::ExtractingProfile, 12_000);
    // Index zero is never valid.
    let state = progress(state, 0, Phase::CollectingUrls, 12_500);

    let view = state.view();
    let event = view.authoritative.unwrap();
    assert_eq!(event.sequence_index, 2);
    assert_eq!(event.phase, Phase::ExtractingProfile);
    assert_eq!(view.rejected_events, 3);
    assert_eq!(view.status, JobStatus::Running);
}

#[test]
fn progress_before_launch_is_ignored() {
    let (state, _) = update(
        AppState::new(),
        Msg::WorkerProgress {
            handle: handle(1),
            event: ProgressEvent {
                sequence_index: 1,
                phase: Phase::CollectingUrls,
                elapsed_ms: 0,
                estimated_remaining_ms: None,
            },
        },
    );
    assert!(state.view().authoritative.is_none());
}

#[test]
fn prior_estimate_uses_limit_and_delay() {
    let state = running(10, 5);
    // 10 profiles * (5s delay + 5s overhead) = 100s; 4s have passed.
    let (state, _) = update(state, Msg::Tick { now_ms: 5_000 });

    let estimate = state.view().estimate.expect("estimate while running");
    assert_eq!(estimate.basis, EstimateBasis::Prior);
    assert_eq!(estimate.remaining_ms, 96_000);
}

#[test]
fn estimate_extrapolates_without_touching_authoritative_index() {
    let state = running(10, 5);
    let (state, _) = update(state, Msg::Tick { now_ms: 21_000 });
    let state = progress(state, 2, Phase::ExtractingProfile, 20_000);
    let (state, _) = update(state, Msg::Tick { now_ms: 24_000 });

    let view = state.view();
    let estimate = view.estimate.unwrap();
    // 10s per profile, 8 left, 3s since the event.
    assert_eq!(estimate.remaining_ms, 77_000);
    assert_eq!(
        estimate.basis,
        EstimateBasis::Extrapolated {
            from_sequence_index: 2
        }
    );
    assert_eq!(view.authoritative.unwrap().sequence_index, 2);
}

#[test]
fn worker_estimate_takes_precedence_over_pace() {
    let state = running(10, 5);
    let (state, _) = update(
        state,
        Msg::WorkerProgress {
            handle: handle(1),
            event: ProgressEvent {
                sequence_index: 5,
                phase: Phase::ExtractingExperience,
                elapsed_ms: 50_000,
                estimated_remaining_ms: Some(30_000),
            },
        },
    );
    let (state, _) = update(state, Msg::Tick { now_ms: 2_000 });

    assert_eq!(state.view().estimate.unwrap().remaining_ms, 29_000);
}

#[test]
fn done_completes_and_requests_resolution() {
    let state = running(2, 5);
    let state = progress(state, 2, Phase::Persisting, 20_000);
    let (state, effects) = update(state, Msg::WorkerDone { handle: handle(1) });

    let view = state.view();
    assert_eq!(view.status, JobStatus::Completed);
    assert!(view.estimate.is_none());
    assert_eq!(
        effects,
        vec![
            Effect::Release { handle: handle(1) },
            Effect::Resolve {
                handle: handle(1),
                row_limit: None,
            },
        ]
    );

    let (state, effects) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(2)),
        },
    );
    assert!(effects.is_empty());
    let result = state.view().result.unwrap().unwrap();
    assert_eq!(result.total_processed(), 2);
    assert_eq!(result.developers(), 2);
}

#[test]
fn result_is_recorded_once() {
    let (state, _) = update(running(2, 5), Msg::WorkerDone { handle: handle(1) });
    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(2)),
        },
    );
    let (state, effects) = update(state, Msg::ResolveRequested);
    assert!(effects.is_empty());

    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(1)),
        },
    );
    let result = state.view().result.unwrap().unwrap();
    assert_eq!(result.total_processed(), 2);
}

#[test]
fn cancelled_job_can_be_resolved_explicitly() {
    let state = running(25, 5);
    let mut state = state;
    for index in 1..=10 {
        state = progress(state, index, Phase::ExtractingProfile, u64::from(index) * 10_000);
    }
    let (state, _) = update(state, Msg::CancelRequested);
    assert_eq!(
        state.view().status,
        JobStatus::Failed(FailureReason::UserCancelled)
    );

    let (state, effects) = update(state, Msg::ResolveRequested);
    assert_eq!(
        effects,
        vec![Effect::Resolve {
            handle: handle(1),
            row_limit: Some(10),
        }]
    );

    let missing = ResolveError::ArtifactMissing(PathBuf::from("jobs.xlsx"));
    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Err(missing.clone()),
        },
    );
    assert_eq!(state.view().result, Some(Err(missing)));

    // A missing artifact may still appear later; retrying is allowed.
    let (state, effects) = update(state, Msg::ResolveRequested);
    assert_eq!(
        effects,
        vec![Effect::Resolve {
            handle: handle(1),
            row_limit: Some(10),
        }]
    );
    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(10)),
        },
    );
    let result = state.view().result.unwrap().unwrap();
    assert_eq!(result.total_processed(), 10);
}

#[test]
fn cancelled_job_never_reports_rows_written_after_cancel() {
    let mut state = running(25, 5);
    for index in 1..=10 {
        state = progress(state, index, Phase::ExtractingProfile, u64::from(index) * 10_000);
    }
    let (state, _) = update(state, Msg::CancelRequested);
    assert_eq!(state.row_limit(), Some(10));
    let (state, _) = update(state, Msg::ResolveRequested);

    // The worker ignored the stop signal and finished all 25 profiles.
    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(25)),
        },
    );

    assert_eq!(
        state.view().result,
        Some(Err(ResolveError::ArtifactMissing(PathBuf::from("jobs.xlsx"))))
    );
}

#[test]
fn cancel_before_any_progress_owns_no_rows() {
    let (state, _) = update(running(25, 5), Msg::CancelRequested);
    let (_state, effects) = update(state, Msg::ResolveRequested);

    assert_eq!(
        effects,
        vec![Effect::Resolve {
            handle: handle(1),
            row_limit: Some(0),
        }]
    );
}

#[test]
fn completed_job_has_no_row_limit() {
    let (state, _) = update(running(2, 5), Msg::WorkerDone { handle: handle(1) });
    assert_eq!(state.row_limit(), None);
}

#[test]
fn absurd_worker_elapsed_time_saturates_estimate() {
    let state = running(100, 5);
    let state = progress(state, 1, Phase::ExtractingProfile, u64::MAX / 2);
    let (state, _) = update(state, Msg::Tick { now_ms: 2_000 });

    let estimate = state.view().estimate.unwrap();
    assert_eq!(estimate.remaining_ms, u64::MAX - 1_000);
}

#[test]
fn resolve_is_not_requested_while_running() {
    let (_state, effects) = update(running(5, 5), Msg::ResolveRequested);
    assert!(effects.is_empty());
}

#[test]
fn reset_clears_finished_job() {
    let (state, _) = update(running(2, 5), Msg::WorkerDone { handle: handle(1) });
    let (state, _) = update(
        state,
        Msg::ResultResolved {
            handle: handle(1),
            outcome: Ok(tally(2)),
        },
    );
    let (state, effects) = update(state, Msg::ResetRequested);

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.status, JobStatus::Idle);
    assert!(view.handle.is_none());
    assert!(view.result.is_none());
    assert!(view.authoritative.is_none());
    assert_eq!(view.percent_complete, 0);
}
