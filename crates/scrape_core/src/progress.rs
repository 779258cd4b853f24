use crate::JobRequest;

/// Per-profile overhead the worker adds on top of the configured delay,
/// used only for the prior estimate before any progress has been reported.
pub const ASSUMED_PROFILE_OVERHEAD_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    CollectingUrls,
    ExtractingProfile,
    ExtractingExperience,
    ExtractingEducation,
    ExtractingSkills,
    Persisting,
}

impl Phase {
    /// Status line shown to the operator.
    pub fn label(self) -> &'static str {
        match self {
            Phase::CollectingUrls => "Collecting profile URLs...",
            Phase::ExtractingProfile => "Extracting profile information...",
            Phase::ExtractingExperience => "Gathering experience data...",
            Phase::ExtractingEducation => "Collecting education details...",
            Phase::ExtractingSkills => "Extracting skills...",
            Phase::Persisting => "Saving to database...",
        }
    }
}

/// Authoritative progress, exactly as the worker reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based index of the profile being processed.
    pub sequence_index: u32,
    pub phase: Phase,
    /// Worker-side time since the job started.
    pub elapsed_ms: u64,
    /// Worker's own remaining-time figure, when it sends one.
    pub estimated_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateBasis {
    /// No authoritative event yet; derived from the request's limit and delay.
    Prior,
    /// Extrapolated from the last authoritative event.
    Extrapolated { from_sequence_index: u32 },
}

/// Locally interpolated time remaining. A UX affordance, never truth: it is
/// recomputed on every tick and never feeds back into the authoritative
/// [`ProgressEvent`] stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEstimate {
    pub remaining_ms: u64,
    pub basis: EstimateBasis,
}

/// Computes the local estimate.
///
/// `since_start_ms` is the time since launch was acknowledged and
/// `since_event_ms` the time since `last` was received.
pub fn interpolate(
    request: &JobRequest,
    last: Option<&ProgressEvent>,
    since_start_ms: u64,
    since_event_ms: u64,
) -> LocalEstimate {
    let limit = u64::from(request.profile_limit());
    let Some(event) = last else {
        let per_profile_ms =
            (u64::from(request.delay_seconds()) + ASSUMED_PROFILE_OVERHEAD_SECS) * 1000;
        return LocalEstimate {
            remaining_ms: (limit * per_profile_ms).saturating_sub(since_start_ms),
            basis: EstimateBasis::Prior,
        };
    };

    let reported = match event.estimated_remaining_ms {
        Some(remaining) => remaining,
        None => {
            let done = u64::from(event.sequence_index.max(1));
            let pace_ms = event.elapsed_ms / done;
            pace_ms.saturating_mul(limit.saturating_sub(done))
        }
    };
    LocalEstimate {
        remaining_ms: reported.saturating_sub(since_event_ms),
        basis: EstimateBasis::Extrapolated {
            from_sequence_index: event.sequence_index,
        },
    }
}

/// Formats milliseconds as `m:ss`.
pub fn format_remaining(remaining_ms: u64) -> String {
    let total_secs = remaining_ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}
