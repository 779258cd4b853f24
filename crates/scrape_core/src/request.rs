use std::ops::RangeInclusive;

use url::Url;

/// Inclusive bounds for the number of profiles a single job may visit.
pub const PROFILE_LIMIT_RANGE: RangeInclusive<u32> = 1..=100;

/// Inclusive bounds for the pause between two profiles, in seconds.
pub const DELAY_SECONDS_RANGE: RangeInclusive<u32> = 3..=15;

const LINKEDIN_HOSTS: &[&str] = &["www.linkedin.com", "linkedin.com"];

/// Raw operator input, before any checks have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCandidate {
    pub target_url: String,
    pub profile_limit: u32,
    pub delay_seconds: u32,
}

impl JobCandidate {
    pub fn new(target_url: impl Into<String>, profile_limit: u32, delay_seconds: u32) -> Self {
        Self {
            target_url: target_url.into(),
            profile_limit,
            delay_seconds,
        }
    }
}

/// A request that passed [`validate`]. Only constructible through validation,
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    target_url: String,
    profile_limit: u32,
    delay_seconds: u32,
}

impl JobRequest {
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn profile_limit(&self) -> u32 {
        self.profile_limit
    }

    pub fn delay_seconds(&self) -> u32 {
        self.delay_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter a valid LinkedIn company people page URL")]
    BadUrlPattern,
    #[error("please enter a valid number of profiles (1-100)")]
    LimitOutOfRange,
    #[error("please enter a valid delay time (3-15 seconds)")]
    DelayOutOfRange,
}

/// Checks operator-supplied bounds. Pure; runs before anything touches the network.
///
/// Checks run in a fixed order (URL, limit, delay) and the first failure wins.
pub fn validate(candidate: &JobCandidate) -> Result<JobRequest, ValidationError> {
    let target_url = candidate.target_url.trim();
    if !is_company_people_url(target_url) {
        return Err(ValidationError::BadUrlPattern);
    }
    if !PROFILE_LIMIT_RANGE.contains(&candidate.profile_limit) {
        return Err(ValidationError::LimitOutOfRange);
    }
    if !DELAY_SECONDS_RANGE.contains(&candidate.delay_seconds) {
        return Err(ValidationError::DelayOutOfRange);
    }
    Ok(JobRequest {
        target_url: target_url.to_string(),
        profile_limit: candidate.profile_limit,
        delay_seconds: candidate.delay_seconds,
    })
}

/// `https://[www.]linkedin.com/company/<slug>/people[/]`, query string allowed.
fn is_company_people_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    if !url
        .host_str()
        .is_some_and(|host| LINKEDIN_HOSTS.contains(&host))
    {
        return false;
    }
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    matches!(segments.as_slice(), ["company", _slug, "people"])
}
