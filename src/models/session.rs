use crate::models::analysis::AnalysisResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreenState {
    Home,
    Scanning,
    Results,
    Error,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ScanStatus {
    pub message: String,
    pub progress: f32,
}

impl ScanStatus {
    pub fn new(message: &str, progress: f32) -> Self {
        Self {
            message: message.to_string(),
            progress: progress.clamp(0.0, 100.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.progress == 0.0
    }
}

/// Consistent view of the session handed to whatever renders the screens.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub screen: ScreenState,
    pub status: ScanStatus,
    pub result: Option<AnalysisResult>,
    pub draft: String,
    pub notice: Option<String>,
    #[serde(rename = "scanId", skip_serializing_if = "Option::is_none")]
    pub scan_id: Option<Uuid>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            screen: ScreenState::Home,
            status: ScanStatus::default(),
            result: None,
            draft: String::new(),
            notice: None,
            scan_id: None,
        }
    }
}
