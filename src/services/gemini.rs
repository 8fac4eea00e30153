use crate::models::analysis::{AnalysisResult, RedFlag, RiskLevel};
use crate::services::analysis::{AnalysisError, Analyzer};
use crate::utils::prompt::{
    RESPONSE_MIME_TYPE, RESPONSE_SCHEMA, SYSTEM_INSTRUCTION, TEMPERATURE, strip_code_fence,
};
use log::{debug, error, info};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiContent<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig<'a> {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'a str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Analysis payload as the model emits it. `score` arrives as a JSON number
/// and is range-checked before it becomes an `AnalysisResult`.
#[derive(Debug, Deserialize)]
struct WireAnalysis {
    #[serde(rename = "riskLevel")]
    risk_level: RiskLevel,
    score: f64,
    summary: String,
    #[serde(rename = "redFlags")]
    red_flags: Vec<RedFlag>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: String, timeout: Duration) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn generate_content(&self, text: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AnalysisError::Configuration("GEMINI_API_KEY is not set".to_string()))?;
        let key_header = HeaderValue::from_str(api_key)
            .map_err(|_| AnalysisError::Configuration("GEMINI_API_KEY is not a valid header value".to_string()))?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: SYSTEM_INSTRUCTION }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: RESPONSE_MIME_TYPE,
                response_schema: &*RESPONSE_SCHEMA,
            },
        };

        let url = self.endpoint();
        debug!("POST {} ({} chars of document text)", url, text.chars().count());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", key_header)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    AnalysisError::Configuration(format!("cannot build request to {}: {}", url, e))
                } else {
                    AnalysisError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, error_text);
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let response_text = response.text().await?;
        let gemini_response: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| AnalysisError::InvalidResponse(format!("malformed Gemini envelope: {}", e)))?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(AnalysisError::EmptyResponse)
    }
}

impl Analyzer for GeminiClient {
    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalysisError> {
        info!("Sending document to Gemini model {}", self.model);
        let raw = self.generate_content(text).await?;
        let result = parse_analysis(&raw)?;
        info!(
            "Gemini returned {} with score {} and {} red flags",
            result.risk_level.label(),
            result.score,
            result.red_flags.len()
        );
        Ok(result)
    }
}

/// Parses the model's structured output into an [`AnalysisResult`].
pub fn parse_analysis(raw: &str) -> Result<AnalysisResult, AnalysisError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Err(AnalysisError::EmptyResponse);
    }

    let wire: WireAnalysis = serde_json::from_str(cleaned).map_err(|e| {
        error!("Failed to parse Gemini analysis: {}", e);
        AnalysisError::InvalidResponse(e.to_string())
    })?;

    if !wire.score.is_finite() || !(0.0..=100.0).contains(&wire.score) {
        return Err(AnalysisError::InvalidResponse(format!(
            "score {} is outside 0..=100",
            wire.score
        )));
    }

    Ok(AnalysisResult {
        risk_level: wire.risk_level,
        score: wire.score.round() as u8,
        summary: wire.summary,
        red_flags: wire.red_flags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::Severity;

    const VALID: &str = r#"{
        "riskLevel": "High Risk",
        "score": 15,
        "summary": "The company owns everything you make.",
        "redFlags": [
            {"title": "They own your work forever", "explanation": "Anything you create belongs to them.",
             "originalText": "perpetual ownership of all work product", "severity": "CRITICAL"},
            {"title": "Renews on its own", "explanation": "You have to cancel yourself.",
             "originalText": "renews automatically", "severity": "WARNING"}
        ]
    }"#;

    #[test]
    fn parses_declared_shape_in_order() {
        let result = parse_analysis(VALID).unwrap();
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.score, 15);
        assert_eq!(result.red_flags.len(), 2);
        assert_eq!(result.red_flags[0].severity, Severity::Critical);
        assert_eq!(result.red_flags[1].title, "Renews on its own");
    }

    #[test]
    fn accepts_fenced_json_and_fractional_scores() {
        let raw = "```json\n{\"riskLevel\":\"Low Risk\",\"score\":87.6,\"summary\":\"ok\",\"redFlags\":[]}\n```";
        let result = parse_analysis(raw).unwrap();
        assert_eq!(result.score, 88);
        assert!(result.red_flags.is_empty());
    }

    #[test]
    fn rejects_missing_fields() {
        let raw = r#"{"riskLevel":"Low Risk","score":90,"summary":"ok"}"#;
        assert!(matches!(parse_analysis(raw), Err(AnalysisError::InvalidResponse(_))));
    }

    #[test]
    fn rejects_unknown_severity() {
        let raw = r#"{"riskLevel":"Low Risk","score":90,"summary":"ok","redFlags":[
            {"title":"t","explanation":"e","originalText":"o","severity":"MINOR"}]}"#;
        assert!(matches!(parse_analysis(raw), Err(AnalysisError::InvalidResponse(_))));
    }

    #[test]
    fn rejects_out_of_range_score() {
        let raw = r#"{"riskLevel":"Low Risk","score":140,"summary":"ok","redFlags":[]}"#;
        assert!(matches!(parse_analysis(raw), Err(AnalysisError::InvalidResponse(_))));
    }

    #[test]
    fn rejects_blank_payload() {
        assert!(matches!(parse_analysis("   "), Err(AnalysisError::EmptyResponse)));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        let client = GeminiClient::new(None, DEFAULT_MODEL.to_string(), Duration::from_secs(5)).unwrap();
        let err = client.analyze("This agreement renews automatically.").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
    }
}
