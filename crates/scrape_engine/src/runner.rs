use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use scrape_core::{JobHandle, JobRequest, LaunchError, ResolveError};
use scrape_logging::{scrape_debug, scrape_info, scrape_warn};
use tokio_util::sync::CancellationToken;

use crate::feed::{FeedSource, ProgressFeed, WorkerEvent};
use crate::gateway::LaunchGateway;
use crate::resolver::ArtifactResolver;
use crate::types::EngineEvent;

enum EngineCommand {
    Launch(JobRequest),
    Cancel(JobHandle),
    Release(JobHandle),
    Resolve(JobHandle, Option<u32>),
    OpenArtifact,
}

/// Pump for the active job's progress feed, stopped on cancel or release.
type ActivePump = Arc<Mutex<Option<(JobHandle, CancellationToken)>>>;

struct Services {
    gateway: Arc<dyn LaunchGateway>,
    feeds: Arc<dyn FeedSource>,
    resolver: ArtifactResolver,
    pump: ActivePump,
}

/// Runs gateway, feed and resolver IO on a background tokio runtime.
/// Commands go in through methods, results come back as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(
        gateway: Arc<dyn LaunchGateway>,
        feeds: Arc<dyn FeedSource>,
        resolver: ArtifactResolver,
    ) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("scrape-engine")
            .build()?;
        let services = Arc::new(Services {
            gateway,
            feeds,
            resolver,
            pump: Arc::new(Mutex::new(None)),
        });

        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let services = services.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(&services, command, event_tx).await;
                });
            }
            scrape_debug!("Engine command channel closed; shutting down runtime");
            runtime.shutdown_timeout(Duration::from_secs(1));
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn launch(&self, request: JobRequest) {
        self.send(EngineCommand::Launch(request));
    }

    pub fn cancel(&self, handle: JobHandle) {
        self.send(EngineCommand::Cancel(handle));
    }

    pub fn release(&self, handle: JobHandle) {
        self.send(EngineCommand::Release(handle));
    }

    /// Reads the artifact for `handle`, counting at most `row_limit` rows.
    pub fn resolve(&self, handle: JobHandle, row_limit: Option<u32>) {
        self.send(EngineCommand::Resolve(handle, row_limit));
    }

    pub fn open_artifact(&self) {
        self.send(EngineCommand::OpenArtifact);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            scrape_warn!("Engine thread is gone; command dropped");
        }
    }
}

async fn handle_command(
    services: &Services,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    match command {
        EngineCommand::Launch(request) => launch(services, request, event_tx).await,
        EngineCommand::Cancel(handle) => {
            stop_pump(&services.pump, handle);
            let outcome = services.gateway.cancel(handle).await;
            if let Err(err) = &outcome {
                scrape_warn!("Stop signal for {} failed: {}", handle, err);
            }
            let _ = event_tx.send(EngineEvent::CancelSignalled { handle, outcome });
        }
        EngineCommand::Release(handle) => {
            stop_pump(&services.pump, handle);
            services.gateway.release(handle);
        }
        EngineCommand::Resolve(handle, row_limit) => {
            let resolver = services.resolver.clone();
            let outcome =
                tokio::task::spawn_blocking(move || resolver.resolve_rows(handle, row_limit))
                    .await
                    .unwrap_or_else(|err| {
                        Err(ResolveError::ArtifactUnreadable {
                            path: services.resolver.path().to_path_buf(),
                            reason: format!("resolver task failed: {err}"),
                        })
                    });
            let _ = event_tx.send(EngineEvent::Resolved { handle, outcome });
        }
        EngineCommand::OpenArtifact => {
            let outcome = services.gateway.open_artifact().await;
            let _ = event_tx.send(EngineEvent::ArtifactOpened(outcome));
        }
    }
}

async fn launch(services: &Services, request: JobRequest, event_tx: mpsc::Sender<EngineEvent>) {
    // Attach first so nothing the worker writes right after launch is lost.
    let feed = match services.feeds.attach().await {
        Ok(feed) => feed,
        Err(err) => {
            let err = LaunchError::Unreachable(format!("progress feed unavailable: {err}"));
            let _ = event_tx.send(EngineEvent::Launched(Err(err)));
            return;
        }
    };

    let launched = match services.gateway.launch(&request).await {
        Ok(launched) => launched,
        Err(err) => {
            let _ = event_tx.send(EngineEvent::Launched(Err(err)));
            return;
        }
    };
    let handle = launched.handle;

    let token = CancellationToken::new();
    *services.pump.lock().unwrap_or_else(PoisonError::into_inner) = Some((handle, token.clone()));
    let _ = event_tx.send(EngineEvent::Launched(Ok(launched)));
    pump(handle, feed, token, event_tx).await;
}

async fn pump(
    handle: JobHandle,
    mut feed: Box<dyn ProgressFeed>,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                scrape_debug!("Progress pump for {} stopped", handle);
                return;
            }
            next = feed.next_event() => next,
        };
        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => {
                let _ = event_tx.send(EngineEvent::FeedClosed {
                    handle,
                    reason: "progress feed ended before the worker finished".to_string(),
                });
                return;
            }
            Err(err) => {
                let _ = event_tx.send(EngineEvent::FeedClosed {
                    handle,
                    reason: err.to_string(),
                });
                return;
            }
        };

        let terminal = event.is_terminal();
        let forwarded = match event {
            WorkerEvent::Done => {
                scrape_info!("Worker reported {} done", handle);
                EngineEvent::WorkerDone { handle }
            }
            WorkerEvent::Error { message } => EngineEvent::WorkerFailed { handle, message },
            progress => match progress.progress() {
                Some(event) => EngineEvent::Progress { handle, event },
                None => continue,
            },
        };
        if event_tx.send(forwarded).is_err() || terminal {
            return;
        }
    }
}

fn stop_pump(pump: &ActivePump, handle: JobHandle) {
    let mut active = pump.lock().unwrap_or_else(PoisonError::into_inner);
    let owned = active
        .as_ref()
        .is_some_and(|(current, _)| *current == handle);
    if let Some((_, token)) = active.take_if(|_| owned) {
        token.cancel();
    }
}
