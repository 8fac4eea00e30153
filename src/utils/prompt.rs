use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Value, json};

pub const SYSTEM_INSTRUCTION: &str = "You are an expert legal consultant and risk analyst. Your job is to protect the user.
Analyze the following legal text provided by the user.
Identify the top 5 most dangerous or restrictive clauses (Red Flags).
Summarize each point in simple, casual English (Grade 8 reading level).
If the text is safe, list the key obligations instead.
Do not use legal jargon.
Analyze specifically for risks related to IP ownership, non-competes, hidden fees, automatic renewals, and data privacy.";

pub const TEMPERATURE: f32 = 0.2;

pub const RESPONSE_MIME_TYPE: &str = "application/json";

lazy_static! {
    /// Response shape declared to the model up front. Mirrors `AnalysisResult`.
    pub static ref RESPONSE_SCHEMA: Value = json!({
        "type": "OBJECT",
        "properties": {
            "riskLevel": {
                "type": "STRING",
                "enum": ["Low Risk", "Medium Risk", "High Risk"],
                "description": "The overall risk assessment of the contract."
            },
            "score": {
                "type": "NUMBER",
                "description": "A safety score from 0 to 100, where 100 is perfectly safe and 0 is extremely dangerous."
            },
            "summary": {
                "type": "STRING",
                "description": "A 2-sentence summary of the contract."
            },
            "redFlags": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {
                            "type": "STRING",
                            "description": "A short, punchy headline for the risk (e.g., 'They own your work forever')."
                        },
                        "explanation": {
                            "type": "STRING",
                            "description": "A plain English explanation (Grade 8 reading level) of why this is bad."
                        },
                        "originalText": {
                            "type": "STRING",
                            "description": "The exact snippet of legal text from the input that contains this risk."
                        },
                        "severity": {
                            "type": "STRING",
                            "enum": ["CRITICAL", "WARNING", "INFO"],
                            "description": "The severity of this specific flag."
                        }
                    },
                    "required": ["title", "explanation", "originalText", "severity"]
                }
            }
        },
        "required": ["riskLevel", "score", "summary", "redFlags"]
    });

    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").unwrap();
}

/// Strips a markdown code fence the model sometimes wraps JSON in, even when
/// asked for `application/json`.
pub fn strip_code_fence(raw: &str) -> &str {
    match CODE_FENCE.captures(raw).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}
