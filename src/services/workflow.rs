//! Screen-state machine for one document scan.
//!
//! The controller is the only owner of the screen, the scan status and the
//! stored result. Background work (progress ticker, staged messages, the
//! analysis request, the finalize delay) runs on spawned tasks that never touch
//! that state directly: they post [`ScanEvent`]s tagged with the scan epoch,
//! and [`WorkflowController::apply`] drops any event whose epoch is no longer
//! current.

use crate::models::analysis::AnalysisResult;
use crate::models::session::{ScanStatus, ScreenState, SessionSnapshot};
use crate::services::analysis::{AnalysisError, Analyzer};
use crate::services::input::{InputCollector, InputError};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};
use uuid::Uuid;

pub const MSG_READING: &str = "Reading document...";
pub const MSG_CHECKING: &str = "Checking IP rights...";
pub const MSG_ANALYZING: &str = "Analyzing non-competes...";
pub const MSG_FINALIZING: &str = "Finalizing report...";

pub const FAILURE_NOTICE: &str =
    "Something went wrong. Please check your API key or internet connection.";

pub const INITIAL_PROGRESS: f32 = 10.0;
/// The ticker never moves progress past this while the request is outstanding.
pub const PROGRESS_CEILING: f32 = 90.0;
pub const MAX_TICK_INCREMENT: f32 = 5.0;

#[derive(Debug, Clone)]
pub struct ScanTimings {
    pub tick_interval: Duration,
    pub checking_after: Duration,
    pub analyzing_after: Duration,
    pub finalize_delay: Duration,
}

impl Default for ScanTimings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            checking_after: Duration::from_millis(1500),
            analyzing_after: Duration::from_millis(3500),
            finalize_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("a scan is already in progress")]
    ScanInProgress,
    #[error("cannot {action} from the {screen:?} screen")]
    InvalidTransition {
        action: &'static str,
        screen: ScreenState,
    },
    #[error("the session is no longer running")]
    SessionClosed,
}

#[derive(Debug)]
pub enum ScanEvent {
    Tick {
        epoch: u64,
    },
    Stage {
        epoch: u64,
        message: &'static str,
    },
    Settled {
        epoch: u64,
        outcome: Result<AnalysisResult, AnalysisError>,
    },
    Reveal {
        epoch: u64,
    },
}

impl ScanEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            ScanEvent::Tick { epoch }
            | ScanEvent::Stage { epoch, .. }
            | ScanEvent::Settled { epoch, .. }
            | ScanEvent::Reveal { epoch } => *epoch,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ScanEvent::Tick { .. } => "tick",
            ScanEvent::Stage { .. } => "stage",
            ScanEvent::Settled { .. } => "settled",
            ScanEvent::Reveal { .. } => "reveal",
        }
    }
}

enum Phase {
    Analyzing,
    Finalizing(AnalysisResult),
}

struct ActiveScan {
    epoch: u64,
    id: Uuid,
    phase: Phase,
    timers: Vec<JoinHandle<()>>,
    request: Option<JoinHandle<()>>,
}

impl ActiveScan {
    fn stop_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }

    fn pending_tasks(&self) -> usize {
        self.timers
            .iter()
            .chain(self.request.iter())
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl Drop for ActiveScan {
    fn drop(&mut self) {
        self.stop_timers();
        if let Some(request) = self.request.take() {
            request.abort();
        }
    }
}

pub struct WorkflowController<A> {
    analyzer: Arc<A>,
    timings: ScanTimings,
    rng: StdRng,
    screen: ScreenState,
    status: ScanStatus,
    result: Option<AnalysisResult>,
    input: InputCollector,
    notice: Option<String>,
    epoch: u64,
    active: Option<ActiveScan>,
    trail: Vec<ScreenState>,
    events_tx: mpsc::UnboundedSender<ScanEvent>,
    events_rx: mpsc::UnboundedReceiver<ScanEvent>,
}

impl<A: Analyzer> WorkflowController<A> {
    pub fn new(analyzer: Arc<A>, timings: ScanTimings) -> Self {
        Self::with_rng(analyzer, timings, StdRng::from_os_rng())
    }

    pub fn with_rng(analyzer: Arc<A>, timings: ScanTimings, rng: StdRng) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            analyzer,
            timings,
            rng,
            screen: ScreenState::Home,
            status: ScanStatus::default(),
            result: None,
            input: InputCollector::new(),
            notice: None,
            epoch: 0,
            active: None,
            trail: vec![ScreenState::Home],
            events_tx,
            events_rx,
        }
    }

    pub fn screen(&self) -> ScreenState {
        self.screen
    }

    pub fn status(&self) -> &ScanStatus {
        &self.status
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn input(&self) -> &InputCollector {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputCollector {
        &mut self.input
    }

    /// Screens visited since the last scan started, oldest first.
    pub fn screen_trail(&self) -> &[ScreenState] {
        &self.trail
    }

    /// Background tasks of the current scan that have not finished yet.
    pub fn pending_tasks(&self) -> usize {
        self.active.as_ref().map(ActiveScan::pending_tasks).unwrap_or(0)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            screen: self.screen,
            status: self.status.clone(),
            result: self.result.clone(),
            draft: self.input.draft().to_string(),
            notice: self.notice.clone(),
            scan_id: self.active.as_ref().map(|a| a.id),
        }
    }

    /// Validates `text` and starts a scan with it, untrimmed.
    pub fn submit(&mut self, text: &str) -> Result<(), WorkflowError> {
        let accepted = self.input.submit(text)?.to_string();
        self.start_analysis(accepted.clone())?;
        self.input.set_text(accepted);
        Ok(())
    }

    pub fn submit_draft(&mut self) -> Result<(), WorkflowError> {
        let draft = self.input.draft().to_string();
        self.submit(&draft)
    }

    pub fn start_analysis(&mut self, text: String) -> Result<(), WorkflowError> {
        match self.screen {
            ScreenState::Home => {}
            ScreenState::Scanning => return Err(WorkflowError::ScanInProgress),
            screen => {
                return Err(WorkflowError::InvalidTransition {
                    action: "start analysis",
                    screen,
                });
            }
        }
        if text.is_empty() {
            return Err(InputError::TooShort.into());
        }

        self.epoch += 1;
        let epoch = self.epoch;
        let id = Uuid::new_v4();

        self.trail.clear();
        self.trail.push(ScreenState::Home);
        self.notice = None;
        self.result = None;
        self.transition(ScreenState::Scanning);
        self.status = ScanStatus::new(MSG_READING, INITIAL_PROGRESS);

        let timers = vec![
            spawn_ticker(&self.events_tx, epoch, self.timings.tick_interval),
            schedule(
                &self.events_tx,
                self.timings.checking_after,
                ScanEvent::Stage { epoch, message: MSG_CHECKING },
            ),
            schedule(
                &self.events_tx,
                self.timings.analyzing_after,
                ScanEvent::Stage { epoch, message: MSG_ANALYZING },
            ),
        ];

        info!("Scan {} started ({} chars)", id, text.chars().count());

        let analyzer = Arc::clone(&self.analyzer);
        let tx = self.events_tx.clone();
        let request = tokio::spawn(async move {
            let outcome = analyzer.analyze(&text).await;
            let _ = tx.send(ScanEvent::Settled { epoch, outcome });
        });

        self.active = Some(ActiveScan {
            epoch,
            id,
            phase: Phase::Analyzing,
            timers,
            request: Some(request),
        });
        Ok(())
    }

    /// Leaves the results screen, discarding the report.
    pub fn go_back(&mut self) -> Result<(), WorkflowError> {
        if self.screen != ScreenState::Results {
            return Err(WorkflowError::InvalidTransition {
                action: "go back",
                screen: self.screen,
            });
        }
        self.epoch += 1;
        self.result = None;
        self.status = ScanStatus::default();
        self.transition(ScreenState::Home);
        Ok(())
    }

    /// Abandons the running scan. Calling it when no scan is running does
    /// nothing.
    pub fn cancel_scan(&mut self) {
        if self.screen != ScreenState::Scanning {
            debug!("Cancel ignored on the {:?} screen", self.screen);
            return;
        }
        self.epoch += 1;
        if let Some(active) = self.active.take() {
            info!("Scan {} cancelled", active.id);
        }
        self.status = ScanStatus::default();
        self.transition(ScreenState::Home);
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events_rx.recv().await
    }

    /// Waits for the next background event and applies it.
    pub async fn step(&mut self) {
        if let Some(event) = self.next_event().await {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: ScanEvent) {
        let analyzing = match &self.active {
            Some(active) if active.epoch == event.epoch() => {
                matches!(active.phase, Phase::Analyzing)
            }
            _ => {
                debug!(
                    "Dropping stale {} event from epoch {} (current {})",
                    event.kind(),
                    event.epoch(),
                    self.epoch
                );
                return;
            }
        };

        match event {
            ScanEvent::Tick { .. } if analyzing => self.advance_progress(),
            ScanEvent::Stage { message, .. } if analyzing => {
                self.status.message = message.to_string();
            }
            ScanEvent::Settled { outcome, .. } if analyzing => self.settle(outcome),
            ScanEvent::Reveal { .. } if !analyzing => self.reveal(),
            other => debug!("Ignoring {} event outside its phase", other.kind()),
        }
    }

    fn advance_progress(&mut self) {
        if self.status.progress >= PROGRESS_CEILING {
            return;
        }
        let increment = self.rng.random_range(0.0..MAX_TICK_INCREMENT);
        self.status.progress = (self.status.progress + increment).min(PROGRESS_CEILING);
    }

    fn settle(&mut self, outcome: Result<AnalysisResult, AnalysisError>) {
        let finalize_delay = self.timings.finalize_delay;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.stop_timers();
        active.request = None;

        match outcome {
            Ok(result) => {
                info!("Scan {} finished, finalizing report", active.id);
                active.phase = Phase::Finalizing(result);
                active.timers.push(schedule(
                    &self.events_tx,
                    finalize_delay,
                    ScanEvent::Reveal { epoch: active.epoch },
                ));
                self.status = ScanStatus::new(MSG_FINALIZING, 100.0);
            }
            Err(e) => {
                error!("Analysis process error in scan {}: {}", active.id, e);
                self.active = None;
                self.status = ScanStatus::default();
                self.transition(ScreenState::Error);
                self.notice = Some(FAILURE_NOTICE.to_string());
                self.transition(ScreenState::Home);
            }
        }
    }

    fn reveal(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Phase::Finalizing(result) = std::mem::replace(&mut active.phase, Phase::Analyzing) {
            info!("Scan {} report ready", active.id);
            self.result = Some(result);
            self.status = ScanStatus::default();
            self.transition(ScreenState::Results);
        }
    }

    fn transition(&mut self, next: ScreenState) {
        info!("Screen {:?} -> {:?}", self.screen, next);
        self.screen = next;
        self.trail.push(next);
    }
}

fn schedule(
    tx: &mpsc::UnboundedSender<ScanEvent>,
    delay: Duration,
    event: ScanEvent,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        sleep(delay).await;
        let _ = tx.send(event);
    })
}

fn spawn_ticker(tx: &mpsc::UnboundedSender<ScanEvent>, epoch: u64, every: Duration) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        loop {
            ticker.tick().await;
            if tx.send(ScanEvent::Tick { epoch }).is_err() {
                break;
            }
        }
    })
}
