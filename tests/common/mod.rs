#![allow(dead_code)]

use contract_scanner::models::analysis::{AnalysisResult, RedFlag, RiskLevel, Severity};
use contract_scanner::models::session::{ScreenState, ScanStatus};
use contract_scanner::services::analysis::{AnalysisError, Analyzer};
use contract_scanner::services::workflow::{ScanTimings, WorkflowController};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

pub const SCENARIO_A: &str =
    "This agreement grants Company perpetual ownership of all work product.";

pub enum Script {
    Succeed(AnalysisResult),
    FailConfiguration,
}

/// Analyzer stub that waits `delay` and then plays back its script.
pub struct ScriptedAnalyzer {
    pub delay: Duration,
    pub script: Script,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn succeeding(result: AnalysisResult, delay: Duration) -> Self {
        Self {
            delay,
            script: Script::Succeed(result),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn misconfigured(delay: Duration) -> Self {
        Self {
            delay,
            script: Script::FailConfiguration,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Analyzer for ScriptedAnalyzer {
    async fn analyze(&self, _text: &str) -> Result<AnalysisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Succeed(result) => Ok(result.clone()),
            Script::FailConfiguration => Err(AnalysisError::Configuration(
                "GEMINI_API_KEY is not set".to_string(),
            )),
        }
    }
}

pub fn high_risk_result() -> AnalysisResult {
    AnalysisResult {
        risk_level: RiskLevel::High,
        score: 15,
        summary: "The company owns everything you create, forever.".to_string(),
        red_flags: vec![
            RedFlag {
                title: "They own your work forever".to_string(),
                explanation: "Anything you make while working here belongs to them, even after you leave."
                    .to_string(),
                original_text: "perpetual ownership of all work product".to_string(),
                severity: Severity::Critical,
            },
            RedFlag {
                title: "No end date".to_string(),
                explanation: "The ownership never expires.".to_string(),
                original_text: "perpetual".to_string(),
                severity: Severity::Warning,
            },
        ],
    }
}

pub fn fast_timings() -> ScanTimings {
    ScanTimings {
        tick_interval: Duration::from_millis(5),
        checking_after: Duration::from_millis(15),
        analyzing_after: Duration::from_millis(35),
        finalize_delay: Duration::from_millis(5),
    }
}

pub fn controller<A: Analyzer>(analyzer: Arc<A>, timings: ScanTimings) -> WorkflowController<A> {
    WorkflowController::with_rng(analyzer, timings, StdRng::seed_from_u64(42))
}

/// Applies every event that arrives within `window` and records the status
/// seen after each one.
pub async fn pump_for<A: Analyzer>(
    controller: &mut WorkflowController<A>,
    window: Duration,
) -> Vec<(ScreenState, ScanStatus)> {
    let deadline = Instant::now() + window;
    let mut seen = Vec::new();
    while let Ok(Some(event)) = timeout_at(deadline, controller.next_event()).await {
        controller.apply(event);
        seen.push((controller.screen(), controller.status().clone()));
    }
    seen
}

/// Applies events until the controller leaves the scanning screen.
pub async fn run_scan<A: Analyzer>(controller: &mut WorkflowController<A>, limit: Duration) {
    let deadline = Instant::now() + limit;
    while controller.screen() == ScreenState::Scanning {
        match timeout_at(deadline, controller.next_event()).await {
            Ok(Some(event)) => controller.apply(event),
            _ => panic!("scan did not settle within {:?}", limit),
        }
    }
}
