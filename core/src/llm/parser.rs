//! Tolerant parser for LLM decision responses: extracts the first balanced
//! JSON object from free-form model text (prose or code fences around it
//! are ignored), then validates it against the decision schema.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Take,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SetupQuality {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    C,
    #[serde(rename = "C-")]
    CMinus,
}

impl SetupQuality {
    /// Ordinal rank, 0 = best (`A+`), 8 = worst (`C-`). Lower is better, so
    /// "meets the configured minimum" is `rank() <= minimum.rank()`.
    pub fn rank(self) -> u8 {
        match self {
            SetupQuality::APlus => 0,
            SetupQuality::A => 1,
            SetupQuality::AMinus => 2,
            SetupQuality::BPlus => 3,
            SetupQuality::B => 4,
            SetupQuality::BMinus => 5,
            SetupQuality::CPlus => 6,
            SetupQuality::C => 7,
            SetupQuality::CMinus => 8,
        }
    }

    pub fn meets_minimum(self, minimum: SetupQuality) -> bool {
        self.rank() <= minimum.rank()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDecision {
    pub decision: Decision,
    pub setup_quality: SetupQuality,
    pub confidence: f64,
    pub risk_flags: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no balanced JSON object found in response text")]
    NoJsonObject,
    #[error("response JSON did not match the decision schema: {0}")]
    SchemaMismatch(#[from] serde_json::Error),
}

/// Extract the first top-level balanced `{...}` span from `text`, ignoring
/// braces inside string literals.
fn extract_first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model response, clamping `confidence` into `[0, 1]` if the model
/// returned an out-of-range value rather than rejecting the response outright.
pub fn parse_decision(raw: &str) -> Result<ParsedDecision, ParseError> {
    let json_span = extract_first_json_object(raw).ok_or(ParseError::NoJsonObject)?;
    let mut parsed: ParsedDecision = serde_json::from_str(json_span)?;
    parsed.confidence = parsed.confidence.clamp(0.0, 1.0);
    Ok(parsed)
}
