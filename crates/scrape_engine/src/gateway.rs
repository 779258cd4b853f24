use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use reqwest::header::CONTENT_TYPE;
use scrape_core::{JobHandle, JobRequest, LaunchError};
use scrape_logging::{scrape_debug, scrape_info, scrape_warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::Launched;

const START_PATH: &str = "start-scraping";
const STOP_PATH: &str = "stop-scraping";
const OPEN_ARTIFACT_PATH: &str = "open-excel";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl GatewaySettings {
    /// Parses the worker's base URL, e.g. `http://127.0.0.1:5000`.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        // `Url::join` replaces the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, LaunchError> {
        self.base_url
            .join(path)
            .map_err(|err| LaunchError::Unreachable(err.to_string()))
    }
}

/// Talks to the external worker. At most one job is active per gateway.
#[async_trait::async_trait]
pub trait LaunchGateway: Send + Sync {
    /// Submits the request. Fails fast with `AlreadyRunning` while another
    /// handle from this gateway is still active.
    async fn launch(&self, request: &JobRequest) -> Result<Launched, LaunchError>;

    /// Best-effort stop signal; the worker may finish in-flight work.
    async fn cancel(&self, handle: JobHandle) -> Result<(), LaunchError>;

    /// Frees the slot once `handle` reached a terminal state.
    fn release(&self, handle: JobHandle);

    /// Asks the worker to open its output artifact.
    async fn open_artifact(&self) -> Result<Option<String>, LaunchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Launching,
    Active(JobHandle),
}

#[derive(Debug, Serialize)]
struct StartBody<'a> {
    limit: u32,
    delay: u32,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct Ack {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
pub struct HttpGateway {
    settings: GatewaySettings,
    client: reqwest::Client,
    slot: Mutex<Slot>,
    next_id: AtomicU64,
}

impl HttpGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, LaunchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| LaunchError::Unreachable(err.to_string()))?;
        Ok(Self {
            settings,
            client,
            slot: Mutex::new(Slot::Free),
            next_id: AtomicU64::new(1),
        })
    }

    /// Currently active handle, if a job is running.
    pub fn active(&self) -> Option<JobHandle> {
        match *self.lock_slot() {
            Slot::Active(handle) => Some(handle),
            Slot::Free | Slot::Launching => None,
        }
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(&self) -> Result<(), LaunchError> {
        let mut slot = self.lock_slot();
        match *slot {
            Slot::Free => {
                *slot = Slot::Launching;
                Ok(())
            }
            Slot::Launching | Slot::Active(_) => Err(LaunchError::AlreadyRunning),
        }
    }

    fn settle(&self, outcome: Option<JobHandle>) {
        let mut slot = self.lock_slot();
        *slot = match outcome {
            Some(handle) => Slot::Active(handle),
            None => Slot::Free,
        };
    }

    async fn send_start(&self, request: &JobRequest) -> Result<Option<String>, LaunchError> {
        let body = StartBody {
            limit: request.profile_limit(),
            delay: request.delay_seconds(),
            url: request.target_url(),
        };
        let body = serde_json::to_vec(&body)
            .map_err(|err| LaunchError::Rejected(format!("could not encode request: {err}")))?;
        let response = self
            .client
            .post(self.settings.endpoint(START_PATH)?)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_ack(response).await
    }
}

#[async_trait::async_trait]
impl LaunchGateway for HttpGateway {
    async fn launch(&self, request: &JobRequest) -> Result<Launched, LaunchError> {
        self.reserve()?;
        let launched_at = SystemTime::now();
        match self.send_start(request).await {
            Ok(message) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let handle = JobHandle::new(id, launched_at);
                self.settle(Some(handle));
                scrape_info!(
                    "Launched {} limit={} delay={}s",
                    handle,
                    request.profile_limit(),
                    request.delay_seconds()
                );
                Ok(Launched { handle, message })
            }
            Err(err) => {
                self.settle(None);
                scrape_warn!("Launch failed: {}", err);
                Err(err)
            }
        }
    }

    async fn cancel(&self, handle: JobHandle) -> Result<(), LaunchError> {
        scrape_info!("Signalling worker to stop {}", handle);
        let response = self
            .client
            .post(self.settings.endpoint(STOP_PATH)?)
            .header(CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_ack(response).await.map(|_| ())
    }

    fn release(&self, handle: JobHandle) {
        let mut slot = self.lock_slot();
        if *slot == Slot::Active(handle) {
            *slot = Slot::Free;
            scrape_debug!("Released {}", handle);
        } else {
            scrape_debug!("Ignoring release of {} (slot is {:?})", handle, *slot);
        }
    }

    async fn open_artifact(&self) -> Result<Option<String>, LaunchError> {
        let response = self
            .client
            .get(self.settings.endpoint(OPEN_ARTIFACT_PATH)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_ack(response).await
    }
}

/// Interprets a `{status, message?}` acknowledgment. The worker answers errors
/// with a 500 and the same body shape, so the body wins over the status code.
async fn read_ack(response: reqwest::Response) -> Result<Option<String>, LaunchError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    let ack: Ack = match serde_json::from_slice(&bytes) {
        Ok(ack) => ack,
        Err(err) if status.is_success() => {
            return Err(LaunchError::Rejected(format!("malformed acknowledgment: {err}")));
        }
        Err(_) => {
            return Err(LaunchError::Rejected(format!("http status {status}")));
        }
    };
    if ack.status.eq_ignore_ascii_case("success") {
        Ok(ack.message)
    } else {
        Err(LaunchError::Rejected(
            ack.message.unwrap_or_else(|| "worker reported an error".to_string()),
        ))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> LaunchError {
    if err.is_timeout() {
        return LaunchError::Unreachable(format!("timed out: {err}"));
    }
    LaunchError::Unreachable(err.to_string())
}
