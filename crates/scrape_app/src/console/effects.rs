use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use scrape_core::{Effect, Msg};
use scrape_engine::{
    ArtifactResolver, EngineEvent, EngineHandle, EventLogSource, GatewaySettings, HttpGateway,
};
use scrape_logging::{scrape_debug, scrape_info, scrape_warn, set_job_context};

use super::config::AppConfig;

/// Executes core effects on the engine and turns engine events back into
/// messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let mut settings = GatewaySettings::new(&config.worker_base_url)
            .with_context(|| format!("invalid worker_base_url {:?}", config.worker_base_url))?;
        settings.connect_timeout = config.connect_timeout();
        settings.request_timeout = config.request_timeout();

        let gateway = HttpGateway::new(settings).context("building worker client")?;
        let feeds = EventLogSource::new(&config.event_log);
        let resolver = ArtifactResolver::new(&config.artifact_path);
        let engine = EngineHandle::new(Arc::new(gateway), Arc::new(feeds), resolver)
            .context("starting engine runtime")?;
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Launch { request } => {
                    scrape_info!(
                        "Launch limit={} delay={}s url={}",
                        request.profile_limit(),
                        request.delay_seconds(),
                        request.target_url()
                    );
                    self.engine.launch(request);
                }
                Effect::Cancel { handle } => self.engine.cancel(handle),
                Effect::Release { handle } => {
                    self.engine.release(handle);
                    set_job_context(None);
                }
                Effect::Resolve { handle, row_limit } => self.engine.resolve(handle, row_limit),
                Effect::OpenArtifact => self.engine.open_artifact(),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        let event = self.engine.recv_timeout(timeout)?;
        if let EngineEvent::Launched(Ok(launched)) = &event {
            set_job_context(Some(launched.handle.id()));
        }
        Some(map_event(event))
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Launched(Ok(launched)) => Msg::LaunchSucceeded {
            handle: launched.handle,
            message: launched.message,
        },
        EngineEvent::Launched(Err(err)) => Msg::LaunchFailed(err),
        EngineEvent::Progress { handle, event } => Msg::WorkerProgress { handle, event },
        EngineEvent::WorkerDone { handle } => Msg::WorkerDone { handle },
        EngineEvent::WorkerFailed { handle, message } => Msg::WorkerFailed { handle, message },
        EngineEvent::FeedClosed { handle, reason } => Msg::TransportLost {
            handle,
            message: reason,
        },
        // The job is already terminal; the stop signal only affects the worker.
        EngineEvent::CancelSignalled { handle, outcome } => {
            match outcome {
                Ok(()) => scrape_debug!("Worker acknowledged stop for {}", handle),
                Err(err) => scrape_warn!("Worker may still be running {}: {}", handle, err),
            }
            Msg::NoOp
        }
        EngineEvent::Resolved { handle, outcome } => Msg::ResultResolved { handle, outcome },
        EngineEvent::ArtifactOpened(outcome) => Msg::ArtifactOpened(outcome),
    }
}
