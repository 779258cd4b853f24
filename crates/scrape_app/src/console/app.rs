use std::io::{self, IsTerminal};
use std::sync::mpsc::TryRecvError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::bail;
use scrape_core::{JobCandidate, JobHandle, JobStatus, Msg, Notification, Session};
use scrape_logging::scrape_debug;

use super::commands::{self, Command, Input, HELP};
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::render::{self, Console};

const TICK: Duration = Duration::from_millis(250);
const ENGINE_WAIT: Duration = Duration::from_millis(50);

type SharedConsole = Arc<Mutex<Console<io::Stdout>>>;

/// Runs one job to a settled state and returns its final status.
///
/// With an interactive stdin the console stays up after the job settles so
/// the operator can open, reset or start again; `quit` leaves.
pub fn run(
    config: &AppConfig,
    candidate: JobCandidate,
    open_when_done: bool,
) -> anyhow::Result<JobStatus> {
    let runner = EffectRunner::new(config)?;
    let interactive = io::stdin().is_terminal();
    let live = io::stdout().is_terminal();
    let console: SharedConsole = Arc::new(Mutex::new(Console::new(io::stdout(), live)));

    let mut session = Session::new();
    let printer = console.clone();
    session.subscribe(move |notification: &Notification| {
        if let Some(text) = render::notification_text(notification) {
            lock(&printer).line(&text);
        }
    });

    let mut driver = Driver {
        session,
        runner,
        console: console.clone(),
        live,
        started: Instant::now(),
        open_when_done,
        resolve_asked: None,
        open_asked: None,
        open_pending: false,
    };
    driver.start(candidate.clone());
    if !driver.session.state().is_launching() {
        bail!("job was not started");
    }

    let inputs = commands::spawn_stdin_reader();
    if interactive {
        lock(&console).line(HELP);
    }
    let mut inputs_open = true;
    let mut quitting = false;
    let mut announced = false;
    let mut last_tick = Instant::now();

    loop {
        if let Some(msg) = driver.runner.next_msg(ENGINE_WAIT) {
            driver.dispatch(msg);
        }

        if inputs_open {
            match inputs.try_recv() {
                Ok(Input::Command(Command::Quit)) => {
                    quitting = true;
                    if !driver.is_settled() {
                        driver.dispatch(Msg::CancelRequested);
                    }
                }
                Ok(Input::Command(Command::Start)) => {
                    announced = false;
                    driver.start(candidate.clone());
                }
                Ok(Input::Command(command)) => {
                    if let Some(msg) = command.msg() {
                        driver.dispatch(msg);
                    }
                }
                Ok(Input::Unknown(word)) => {
                    lock(&console).line(&format!("Unknown command {word:?}. {HELP}"));
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    scrape_debug!("stdin closed");
                    inputs_open = false;
                }
            }
        }

        if last_tick.elapsed() >= TICK {
            last_tick = Instant::now();
            driver.tick();
        }

        driver.settle();
        if driver.is_settled() {
            if quitting || !interactive || !inputs_open {
                break;
            }
            if !announced {
                announced = true;
                lock(&console).line(HELP);
            }
        }
    }

    lock(&console).finish_status();
    Ok(driver.session.state().status().clone())
}

fn lock(console: &SharedConsole) -> MutexGuard<'_, Console<io::Stdout>> {
    console.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session plus the bookkeeping the console loop adds on top of it.
struct Driver {
    session: Session,
    runner: EffectRunner,
    console: SharedConsole,
    live: bool,
    started: Instant,
    open_when_done: bool,
    resolve_asked: Option<JobHandle>,
    open_asked: Option<JobHandle>,
    open_pending: bool,
}

impl Driver {
    fn start(&mut self, candidate: JobCandidate) {
        self.resolve_asked = None;
        self.open_asked = None;
        self.dispatch(Msg::StartRequested(candidate));
    }

    fn tick(&mut self) {
        let now_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.dispatch(Msg::Tick { now_ms });
    }

    fn dispatch(&mut self, msg: Msg) {
        match msg {
            Msg::OpenArtifactRequested => self.open_pending = true,
            Msg::ArtifactOpened(_) => self.open_pending = false,
            _ => {}
        }
        let effects = self.session.dispatch(msg);
        self.runner.enqueue(effects);
        self.redraw();
    }

    fn redraw(&mut self) {
        if !self.session.consume_dirty() {
            return;
        }
        let view = self.session.view();
        let mut console = lock(&self.console);
        match render::status_line(&view, self.live) {
            Some(line) => console.status(line),
            None => console.finish_status(),
        }
    }

    /// Follow-ups once a job is terminal: a result summary for jobs that did
    /// not complete normally, then the optional open request.
    fn settle(&mut self) {
        let state = self.session.state();
        if !state.status().is_terminal() {
            return;
        }
        let Some(handle) = state.handle() else {
            return;
        };
        let failed = matches!(state.status(), JobStatus::Failed(_));
        let unresolved = state.result().is_none();
        let resolved_ok = matches!(state.result(), Some(Ok(_)));

        if failed && unresolved && self.resolve_asked != Some(handle) {
            self.resolve_asked = Some(handle);
            self.dispatch(Msg::ResolveRequested);
        } else if self.open_when_done && resolved_ok && self.open_asked != Some(handle) {
            self.open_asked = Some(handle);
            self.dispatch(Msg::OpenArtifactRequested);
        }
    }

    /// Nothing in flight: idle, or terminal with its result and any open
    /// request answered.
    fn is_settled(&self) -> bool {
        let state = self.session.state();
        match state.status() {
            JobStatus::Idle => !state.is_launching(),
            JobStatus::Running => false,
            JobStatus::Completed | JobStatus::Failed(_) => {
                !self.open_pending && (state.handle().is_none() || state.result().is_some())
            }
        }
    }
}
