use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use scrape_core::{Phase, ProgressEvent};
use scrape_logging::{scrape_debug, scrape_warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::types::FeedError;

/// One NDJSON line emitted by the worker, e.g.
/// `{"type":"progress","sequence_index":3,"phase":"extracting_skills","elapsed_ms":41000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    Progress {
        sequence_index: u32,
        phase: WirePhase,
        #[serde(default)]
        elapsed_ms: u64,
        #[serde(default)]
        estimated_remaining_ms: Option<u64>,
    },
    Done,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WirePhase {
    CollectingUrls,
    ExtractingProfile,
    ExtractingExperience,
    ExtractingEducation,
    ExtractingSkills,
    Persisting,
}

impl From<WirePhase> for Phase {
    fn from(phase: WirePhase) -> Self {
        match phase {
            WirePhase::CollectingUrls => Phase::CollectingUrls,
            WirePhase::ExtractingProfile => Phase::ExtractingProfile,
            WirePhase::ExtractingExperience => Phase::ExtractingExperience,
            WirePhase::ExtractingEducation => Phase::ExtractingEducation,
            WirePhase::ExtractingSkills => Phase::ExtractingSkills,
            WirePhase::Persisting => Phase::Persisting,
        }
    }
}

impl WorkerEvent {
    /// Core view of a progress line; `None` for terminal events.
    pub fn progress(&self) -> Option<ProgressEvent> {
        match *self {
            WorkerEvent::Progress {
                sequence_index,
                phase,
                elapsed_ms,
                estimated_remaining_ms,
            } => Some(ProgressEvent {
                sequence_index,
                phase: phase.into(),
                elapsed_ms,
                estimated_remaining_ms,
            }),
            WorkerEvent::Done | WorkerEvent::Error { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerEvent::Progress { .. })
    }
}

/// Parses one feed line. Blank and malformed lines yield `None`; malformed
/// ones are logged.
pub fn parse_worker_line(line: &str) -> Option<WorkerEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            scrape_warn!("Skipping malformed worker event {:?}: {}", line, err);
            None
        }
    }
}

/// Lazy, finite source of worker events for one job.
#[async_trait::async_trait]
pub trait ProgressFeed: Send {
    /// `Ok(None)` means the feed ended.
    async fn next_event(&mut self) -> Result<Option<WorkerEvent>, FeedError>;
}

/// Opens a fresh feed for each launch. Called before the launch request is
/// sent so no early event is missed.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn attach(&self) -> Result<Box<dyn ProgressFeed>, FeedError>;
}

/// In-process feed fed through a tokio channel.
pub struct ChannelFeed {
    rx: mpsc::Receiver<WorkerEvent>,
}

pub fn channel_feed(buffer: usize) -> (mpsc::Sender<WorkerEvent>, ChannelFeed) {
    let (tx, rx) = mpsc::channel(buffer);
    (tx, ChannelFeed { rx })
}

#[async_trait::async_trait]
impl ProgressFeed for ChannelFeed {
    async fn next_event(&mut self) -> Result<Option<WorkerEvent>, FeedError> {
        Ok(self.rx.recv().await)
    }
}

/// NDJSON over any async reader, e.g. a worker's stdout pipe.
pub struct LineFeed<R> {
    lines: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin + Send> LineFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: FramedRead::new(reader, LinesCodec::new_with_max_length(64 * 1024)),
        }
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> ProgressFeed for LineFeed<R> {
    async fn next_event(&mut self) -> Result<Option<WorkerEvent>, FeedError> {
        while let Some(line) = self.lines.next().await {
            let line = line.map_err(|err| FeedError::Codec(err.to_string()))?;
            if let Some(event) = parse_worker_line(&line) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

/// Tails an event log the worker appends to. Starts at the end of the file as
/// it was when attached, so events from earlier runs are never replayed.
pub struct EventLogFeed {
    reader: BufReader<tokio::fs::File>,
    partial: Vec<u8>,
    poll_interval: Duration,
}

#[async_trait::async_trait]
impl ProgressFeed for EventLogFeed {
    async fn next_event(&mut self) -> Result<Option<WorkerEvent>, FeedError> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.partial).await?;
            if read == 0 || !self.partial.ends_with(b"\n") {
                // Nothing new yet, or the worker is mid-line.
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            let line = match String::from_utf8(std::mem::take(&mut self.partial)) {
                Ok(line) => line,
                Err(err) => {
                    scrape_warn!("Skipping undecodable worker event: {}", err);
                    continue;
                }
            };
            if let Some(event) = parse_worker_line(&line) {
                return Ok(Some(event));
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventLogSource {
    path: PathBuf,
    poll_interval: Duration,
}

impl EventLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: Duration::from_millis(250),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait::async_trait]
impl FeedSource for EventLogSource {
    async fn attach(&self) -> Result<Box<dyn ProgressFeed>, FeedError> {
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;
        let offset = file.seek(SeekFrom::End(0)).await?;
        scrape_debug!("Tailing {:?} from byte {}", self.path, offset);
        Ok(Box::new(EventLogFeed {
            reader: BufReader::new(file),
            partial: Vec::new(),
            poll_interval: self.poll_interval,
        }))
    }
}
