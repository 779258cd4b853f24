use std::io::Write;

use scrape_core::{
    format_remaining, EstimateBasis, JobResult, JobStatus, Notice, NoticeLevel, Notification,
    ProgressView,
};

const BAR_WIDTH: usize = 20;
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Writes notices as permanent lines and keeps one status line current.
///
/// With `in_place` the status line is redrawn over itself; otherwise each
/// change is printed on its own line.
pub struct Console<W: Write> {
    out: W,
    in_place: bool,
    status: Option<String>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, in_place: bool) -> Self {
        Self {
            out,
            in_place,
            status: None,
        }
    }

    pub fn line(&mut self, text: &str) {
        let _ = if self.in_place && self.status.is_some() {
            write!(
                self.out,
                "{CLEAR_LINE}{text}\n{}",
                self.status.as_deref().unwrap_or_default()
            )
        } else {
            writeln!(self.out, "{text}")
        };
        let _ = self.out.flush();
    }

    pub fn status(&mut self, text: String) {
        if self.status.as_ref() == Some(&text) {
            return;
        }
        let _ = if self.in_place {
            write!(self.out, "{CLEAR_LINE}{text}")
        } else {
            writeln!(self.out, "{text}")
        };
        let _ = self.out.flush();
        self.status = Some(text);
    }

    /// Leaves the current status line on screen and moves below it.
    pub fn finish_status(&mut self) {
        if self.in_place && self.status.take().is_some() {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// One-line summary of the view; `None` while nothing is happening.
pub fn status_line(view: &ProgressView, with_estimate: bool) -> Option<String> {
    let bar = progress_bar(view.percent_complete);
    let done = view.authoritative.map_or(0, |event| event.sequence_index);
    let limit = view.profile_limit.unwrap_or(0);
    match &view.status {
        JobStatus::Idle if view.launching => Some("Initializing scraper...".to_string()),
        JobStatus::Idle => None,
        JobStatus::Running => {
            let label = view
                .authoritative
                .map_or("Waiting for the first profile...", |event| event.phase.label());
            let mut line = format!(
                "{bar} {:>3}% {done}/{limit} {label}",
                view.percent_complete
            );
            if let Some(estimate) = view.estimate.filter(|_| with_estimate) {
                line.push_str(&format!(" ~{} left", format_remaining(estimate.remaining_ms)));
                if estimate.basis == EstimateBasis::Prior {
                    line.push_str(" (rough)");
                }
            }
            Some(line)
        }
        JobStatus::Completed => Some(format!(
            "{bar} {:>3}% {done}/{limit} Done",
            view.percent_complete
        )),
        JobStatus::Failed(reason) => Some(format!(
            "{bar} {:>3}% {done}/{limit} Stopped: {reason}",
            view.percent_complete
        )),
    }
}

/// Permanent output for a notification. Status and progress changes are
/// covered by the status line instead.
pub fn notification_text(notification: &Notification) -> Option<String> {
    match notification {
        Notification::Notice(notice) => Some(notice_text(notice)),
        Notification::Resolved {
            outcome: Ok(result),
            ..
        } => Some(result_summary(result)),
        Notification::Resolved { outcome: Err(_), .. }
        | Notification::Invalid(_)
        | Notification::Status(_)
        | Notification::Progress { .. } => None,
    }
}

pub fn result_summary(result: &JobResult) -> String {
    let success_rate = result
        .success_rate_percent()
        .map_or_else(|| "n/a".to_string(), |rate| format!("{rate}%"));
    format!(
        "Total profiles: {}\nDevelopers found: {}\nSuccess rate: {}\nFailed profiles: {}\nOutput: {}",
        result.total_processed(),
        result.developers(),
        success_rate,
        result.failed(),
        result.output_artifact_path().display()
    )
}

fn notice_text(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => " ok ",
        NoticeLevel::Warning => "warn",
        NoticeLevel::Error => "fail",
    };
    format!("[{tag}] {}", notice.text)
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use pretty_assertions::assert_eq;
    use scrape_core::{
        ArtifactTally, FailureReason, JobHandle, LocalEstimate, Phase, ProgressEvent,
    };

    use super::*;

    fn running(percent: u8) -> ProgressView {
        ProgressView {
            status: JobStatus::Running,
            handle: Some(JobHandle::new(1, SystemTime::UNIX_EPOCH)),
            profile_limit: Some(10),
            percent_complete: percent,
            ..ProgressView::default()
        }
    }

    #[test]
    fn idle_has_no_status_line() {
        assert_eq!(status_line(&ProgressView::default(), true), None);
    }

    #[test]
    fn running_before_first_event_shows_rough_estimate() {
        let view = ProgressView {
            estimate: Some(LocalEstimate {
                remaining_ms: 95_400,
                basis: EstimateBasis::Prior,
            }),
            ..running(0)
        };

        assert_eq!(
            status_line(&view, true).unwrap(),
            "[....................]   0% 0/10 Waiting for the first profile... ~1:35 left (rough)"
        );
        assert_eq!(
            status_line(&view, false).unwrap(),
            "[....................]   0% 0/10 Waiting for the first profile..."
        );
    }

    #[test]
    fn running_with_event_shows_phase() {
        let view = ProgressView {
            authoritative: Some(ProgressEvent {
                sequence_index: 4,
                phase: Phase::ExtractingSkills,
                elapsed_ms: 40_000,
                estimated_remaining_ms: None,
            }),
            estimate: Some(LocalEstimate {
                remaining_ms: 60_000,
                basis: EstimateBasis::Extrapolated {
                    from_sequence_index: 4,
                },
            }),
            ..running(40)
        };

        assert_eq!(
            status_line(&view, true).unwrap(),
            "[########............]  40% 4/10 Extracting skills... ~1:00 left"
        );
    }

    #[test]
    fn cancelled_job_says_so() {
        let view = ProgressView {
            status: JobStatus::Failed(FailureReason::UserCancelled),
            ..running(30)
        };
        assert!(status_line(&view, true)
            .unwrap()
            .ends_with("Stopped: cancelled by user"));
    }

    #[test]
    fn summary_lists_totals() {
        let mut tally = ArtifactTally::new();
        tally.record("Ada", "Software Engineer");
        tally.record("Failed to scrape", "N/A");
        let summary = result_summary(&tally.finish("jobs.xlsx"));

        assert_eq!(
            summary,
            "Total profiles: 2\nDevelopers found: 1\nSuccess rate: 50%\nFailed profiles: 1\nOutput: jobs.xlsx"
        );
    }

    #[test]
    fn notices_are_tagged_by_level() {
        let text = notification_text(&Notification::Notice(Notice {
            level: NoticeLevel::Error,
            text: "Failed to start scraping: boom".to_string(),
        }));
        assert_eq!(text.as_deref(), Some("[fail] Failed to start scraping: boom"));
        assert_eq!(notification_text(&Notification::Status(JobStatus::Running)), None);
    }

    #[test]
    fn in_place_console_redraws_status_after_lines() {
        let mut console = Console::new(Vec::new(), true);
        console.status("[..] 0%".to_string());
        console.status("[..] 0%".to_string());
        console.line("[info] hello");
        console.finish_status();

        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "\r\x1b[2K[..] 0%\r\x1b[2K[info] hello\n[..] 0%\n");
    }

    #[test]
    fn plain_console_prints_each_change_once() {
        let mut console = Console::new(Vec::new(), false);
        console.status("a".to_string());
        console.status("a".to_string());
        console.status("b".to_string());
        console.line("note");

        let out = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(out, "a\nb\nnote\n");
    }
}
