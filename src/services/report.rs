use crate::models::analysis::{AnalysisResult, RedFlag, RiskLevel, Severity};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Danger,
    Caution,
    Safe,
}

impl From<RiskLevel> for Tone {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::High => Tone::Danger,
            RiskLevel::Medium => Tone::Caution,
            RiskLevel::Low => Tone::Safe,
        }
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

/// Display projection of a finished analysis.
#[derive(Debug, Serialize, Clone)]
pub struct ReportView {
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(rename = "riskLabel")]
    pub risk_label: &'static str,
    pub tone: Tone,
    pub score: u8,
    pub summary: String,
    #[serde(rename = "flagCount")]
    pub flag_count: usize,
    pub counts: SeverityCounts,
    #[serde(rename = "redFlags")]
    pub red_flags: Vec<RedFlag>,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

impl ReportView {
    pub fn new(result: &AnalysisResult) -> Self {
        let mut counts = SeverityCounts::default();
        for flag in &result.red_flags {
            match flag.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }

        Self {
            risk_level: result.risk_level,
            risk_label: result.risk_level.label(),
            tone: result.risk_level.into(),
            score: result.score,
            summary: result.summary.clone(),
            flag_count: result.red_flags.len(),
            counts,
            red_flags: result.red_flags.clone(),
            generated_at: Utc::now(),
        }
    }
}

/// Plain-text red flag report.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = format!(
        "Red Flag Report\n===============\n{} (safety score {}/100)\n\n{}\n\nCritical Issues Found ({})\n",
        result.risk_level.label(),
        result.score,
        result.summary,
        result.red_flags.len()
    );

    for (idx, flag) in result.red_flags.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. [{}] {}\n   {}\n   Original legal text: \"{}\"\n",
            idx + 1,
            flag.severity.label(),
            flag.title,
            flag.explanation,
            flag.original_text
        ));
    }

    out
}
