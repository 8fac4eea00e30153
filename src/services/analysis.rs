use crate::models::analysis::{AnalysisResult, RedFlag, RiskLevel, Severity};
use log::{error, warn};
use std::future::Future;
use thiserror::Error;

pub const FALLBACK_SUMMARY: &str =
    "We encountered an error analyzing this document. Please try again.";
pub const FALLBACK_TITLE: &str = "Analysis Failed";
pub const FALLBACK_EXPLANATION: &str =
    "The AI service could not process your request at this time.";
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis service is not configured: {0}")]
    Configuration(String),
    #[error("request to analysis service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no content in analysis response")]
    EmptyResponse,
    #[error("analysis response did not match the declared shape: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// Configuration problems cannot be fixed by retrying the same document,
    /// so they are surfaced instead of being folded into a fallback report.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AnalysisError::Configuration(_))
    }
}

/// Turns document text into an [`AnalysisResult`].
pub trait Analyzer: Send + Sync + 'static {
    fn analyze(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

pub fn fallback_result() -> AnalysisResult {
    AnalysisResult {
        risk_level: RiskLevel::High,
        score: 0,
        summary: FALLBACK_SUMMARY.to_string(),
        red_flags: vec![RedFlag {
            title: FALLBACK_TITLE.to_string(),
            explanation: FALLBACK_EXPLANATION.to_string(),
            original_text: NOT_APPLICABLE.to_string(),
            severity: Severity::Info,
        }],
    }
}

/// Wraps an analyzer so transport and response failures become the fixed
/// fallback report. Only configuration errors reach the caller.
pub struct FallbackAnalyzer<A> {
    inner: A,
}

impl<A: Analyzer> FallbackAnalyzer<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: Analyzer> Analyzer for FallbackAnalyzer<A> {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        match self.inner.analyze(text).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_recoverable() => {
                error!("Analysis failed: {}", e);
                Ok(fallback_result())
            }
            Err(e) => {
                warn!("Analysis cannot run: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing(fn() -> AnalysisError);

    impl Analyzer for Failing {
        async fn analyze(&self, _text: &str) -> Result<AnalysisResult, AnalysisError> {
            Err((self.0)())
        }
    }

    #[tokio::test]
    async fn response_failures_become_fallback() {
        let analyzer = FallbackAnalyzer::new(Failing(|| AnalysisError::EmptyResponse));
        let result = analyzer.analyze("some contract text").await.unwrap();
        assert_eq!(result, fallback_result());
        assert_eq!(result.score, 0);
        assert_eq!(result.red_flags[0].original_text, "N/A");
    }

    #[tokio::test]
    async fn status_failures_become_fallback() {
        let analyzer = FallbackAnalyzer::new(Failing(|| AnalysisError::Status {
            status: 503,
            body: "overloaded".to_string(),
        }));
        assert_eq!(analyzer.analyze("x").await.unwrap(), fallback_result());
    }

    #[tokio::test]
    async fn configuration_failures_propagate() {
        let analyzer = FallbackAnalyzer::new(Failing(|| {
            AnalysisError::Configuration("GEMINI_API_KEY is not set".to_string())
        }));
        let err = analyzer.analyze("x").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }
}
