//! Render jobs and the one-at-a-time dispatcher.
//!
//! The interactive side owns a [`Dispatcher`]. [`Dispatcher::submit`] starts
//! a named worker thread that runs synthesis and mixing and reports back over
//! an `mpsc` channel; the worker never touches interactive state. The
//! interactive side drains events with [`Dispatcher::poll`] (non-blocking,
//! for an event loop) or [`Dispatcher::wait_event`] (blocking, for a CLI) and
//! is the only place [`JobStatus`] changes.
//!
//! ```text
//! Idle ──submit──▶ Running ──Finished(Ok)──▶ Succeeded ──submit──▶ Running …
//!                     │
//!                     └──Finished(Err)──▶ Failed ──submit──▶ Running …
//! ```
//!
//! While Running, further submissions are ignored. There is no queue and no
//! cancellation.

use std::{
    path::PathBuf,
    sync::{mpsc, Arc},
    thread,
};

use tracing::{error, info};

use crate::{
    audio::{decode::decode_file, encode::write_file},
    error::{CallbenchError, Result},
    mix::{self, MixParams},
    output::OutputLayout,
    request::{AnnouncementRequest, RequestForm},
    synth::SpeechSynthesizer,
};

// ─────────────────────────────────────────────────────────────────────────────
// Job data
// ─────────────────────────────────────────────────────────────────────────────

/// One unit of work: a validated request plus the key to call the service with.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub request: AnnouncementRequest,
    pub api_key: String,
}

impl RenderJob {
    pub fn new(request: AnnouncementRequest, api_key: impl Into<String>) -> Self {
        Self { request, api_key: api_key.into() }
    }

    /// Validate `form` and wrap it. Nothing is dispatched on error.
    pub fn from_form(form: &RequestForm, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(form.validate()?, api_key))
    }
}

/// Files produced by a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    pub dir: PathBuf,
    pub wav: PathBuf,
    pub mp3: PathBuf,
}

/// Coarse progress reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesizing,
    Mixing,
    Exporting,
}

impl Stage {
    pub fn message(self) -> &'static str {
        match self {
            Stage::Synthesizing => "Generating voice…",
            Stage::Mixing => "Mixing music…",
            Stage::Exporting => "Writing files…",
        }
    }
}

/// Message from the worker to the interactive side.
#[derive(Debug)]
pub enum JobEvent {
    Progress(Stage),
    /// Sent exactly once, last.
    Finished(Result<RenderResult>),
}

/// Dispatcher state as seen by the interactive side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// The blocking work a job performs on the worker thread.
pub trait Render: Send + Sync + 'static {
    fn render(&self, job: &RenderJob, progress: &dyn Fn(Stage)) -> Result<RenderResult>;
}

/// Synthesis → mix → export into an [`OutputLayout`].
pub struct Renderer<S> {
    synth: S,
    layout: OutputLayout,
}

impl<S: SpeechSynthesizer> Renderer<S> {
    pub fn new(synth: S, layout: OutputLayout) -> Self {
        Self { synth, layout }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }
}

impl<S: SpeechSynthesizer + 'static> Render for Renderer<S> {
    fn render(&self, job: &RenderJob, progress: &dyn Fn(Stage)) -> Result<RenderResult> {
        let req = &job.request;
        let paths = self.layout.prepare()?;

        progress(Stage::Synthesizing);
        let text = req.styled_text();
        self.synth.synthesize(&text, req.voice, &job.api_key, &paths.voice)?;

        progress(Stage::Mixing);
        let voice = decode_file(&paths.voice).map_err(CallbenchError::Mix)?;
        let mixed = mix::mix(voice, req.music_path.as_deref(), &MixParams::from(req))?;

        progress(Stage::Exporting);
        let out = mix::export(&mixed)?;
        write_file(&paths.wav, &out.wav).map_err(CallbenchError::Mix)?;
        write_file(&paths.mp3, &out.mp3).map_err(CallbenchError::Mix)?;

        Ok(RenderResult { dir: paths.dir, wav: paths.wav, mp3: paths.mp3 })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Runs at most one [`RenderJob`] at a time on a background thread.
pub struct Dispatcher<R: Render> {
    renderer: Arc<R>,
    status: JobStatus,
    events: Option<mpsc::Receiver<JobEvent>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<R: Render> Dispatcher<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer: Arc::new(renderer), status: JobStatus::Idle, events: None, worker: None }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// `true` while a job is running. The trigger should stay disabled.
    pub fn is_busy(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Start `job` on a worker thread.
    ///
    /// Returns `Ok(false)` and changes nothing if a job is already running.
    pub fn submit(&mut self, job: RenderJob) -> Result<bool> {
        if self.is_busy() {
            return Ok(false);
        }

        let (tx, rx) = mpsc::channel();
        let renderer = Arc::clone(&self.renderer);
        let handle = thread::Builder::new()
            .name("callbench-render".into())
            .spawn(move || {
                let progress_tx = tx.clone();
                let progress = move |stage: Stage| {
                    info!(?stage, "{}", stage.message());
                    let _ = progress_tx.send(JobEvent::Progress(stage));
                };
                let outcome = renderer.render(&job, &progress);
                // The receiver may be gone if the front end is shutting down.
                let _ = tx.send(JobEvent::Finished(outcome));
            })?;

        self.events = Some(rx);
        self.worker = Some(handle);
        self.status = JobStatus::Running;
        Ok(true)
    }

    /// Next pending event without blocking.
    pub fn poll(&mut self) -> Option<JobEvent> {
        let event = match self.events.as_ref()?.try_recv() {
            Ok(ev) => ev,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Self::worker_lost(),
        };
        Some(self.apply(event))
    }

    /// Block until the next event of the running job; `None` when idle.
    pub fn wait_event(&mut self) -> Option<JobEvent> {
        let event = self.events.as_ref()?.recv().unwrap_or_else(|_| Self::worker_lost());
        Some(self.apply(event))
    }

    /// Block until the running job finishes and return its outcome.
    pub fn wait(&mut self) -> Option<Result<RenderResult>> {
        while let Some(ev) = self.wait_event() {
            if let JobEvent::Finished(outcome) = ev {
                return Some(outcome);
            }
        }
        None
    }

    fn worker_lost() -> JobEvent {
        JobEvent::Finished(Err(CallbenchError::Mix(anyhow::anyhow!(
            "render worker stopped without reporting a result"
        ))))
    }

    fn apply(&mut self, event: JobEvent) -> JobEvent {
        if let JobEvent::Finished(outcome) = &event {
            self.status = match outcome {
                Ok(result) => {
                    info!(wav = %result.wav.display(), mp3 = %result.mp3.display(), "render finished");
                    JobStatus::Succeeded
                }
                Err(e) => {
                    error!("render failed: {}", e);
                    JobStatus::Failed
                }
            };
            self.events = None;
            if let Some(handle) = self.worker.take() {
                let _ = handle.join();
            }
        }
        event
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    /// Blocks inside `render` until the test releases it.
    struct GatedRender {
        calls: AtomicUsize,
        gate: Mutex<mpsc::Receiver<()>>,
        fail: bool,
    }

    impl Render for GatedRender {
        fn render(&self, job: &RenderJob, progress: &dyn Fn(Stage)) -> Result<RenderResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            progress(Stage::Synthesizing);
            let _ = self.gate.lock().unwrap().recv();
            if self.fail {
                return Err(CallbenchError::Synthesis(anyhow::anyhow!("401 Unauthorized")));
            }
            let dir = PathBuf::from("/out");
            Ok(RenderResult {
                wav: dir.join(format!("{}.wav", job.request.voice)),
                mp3: dir.join(format!("{}.mp3", job.request.voice)),
                dir,
            })
        }
    }

    fn gated(fail: bool) -> (Dispatcher<GatedRender>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let r = GatedRender { calls: AtomicUsize::new(0), gate: Mutex::new(rx), fail };
        (Dispatcher::new(r), tx)
    }

    fn job(text: &str) -> RenderJob {
        let form = RequestForm { text: text.into(), ..RequestForm::default() };
        RenderJob::from_form(&form, "sk-test").unwrap()
    }

    #[test]
    fn test_second_submit_ignored_while_running() {
        let (mut d, release) = gated(false);
        assert_eq!(d.status(), JobStatus::Idle);
        assert!(d.submit(job("eins")).unwrap());
        assert!(d.is_busy());

        // Wait for the worker to be inside render.
        assert!(matches!(d.wait_event(), Some(JobEvent::Progress(Stage::Synthesizing))));
        assert!(!d.submit(job("zwei")).unwrap());
        assert_eq!(d.status(), JobStatus::Running);

        release.send(()).unwrap();
        let result = d.wait().unwrap().unwrap();
        assert_eq!(result.wav, PathBuf::from("/out/nova.wav"));
        assert_eq!(d.status(), JobStatus::Succeeded);
        assert_eq!(d.renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_then_resubmit() {
        let (mut d, release) = gated(true);
        assert!(d.submit(job("eins")).unwrap());
        release.send(()).unwrap();
        let err = d.wait().unwrap().unwrap_err();
        assert!(matches!(err, CallbenchError::Synthesis(_)));
        assert_eq!(d.status(), JobStatus::Failed);
        assert!(!d.is_busy());

        assert!(d.submit(job("zwei")).unwrap());
        assert_eq!(d.status(), JobStatus::Running);
        release.send(()).unwrap();
        assert!(d.wait().unwrap().is_err());
        assert_eq!(d.renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_poll_when_idle() {
        let (mut d, _release) = gated(false);
        assert!(d.poll().is_none());
        assert!(d.wait_event().is_none());
        assert!(d.wait().is_none());
    }

    #[test]
    fn test_poll_drains_until_finished() {
        let (mut d, release) = gated(false);
        d.submit(job("eins")).unwrap();
        release.send(()).unwrap();
        let mut finished = false;
        while !finished {
            match d.poll() {
                Some(JobEvent::Finished(outcome)) => {
                    assert!(outcome.is_ok());
                    finished = true;
                }
                Some(JobEvent::Progress(_)) | None => thread::yield_now(),
            }
        }
        assert_eq!(d.status(), JobStatus::Succeeded);
        assert!(d.poll().is_none());
    }
}
