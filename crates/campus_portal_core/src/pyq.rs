//! crates/campus_portal_core/src/pyq.rs
//!
//! The previous-year-question (PYQ) analyzer: recovers text from an uploaded paper,
//! asks the generative model for a structured breakdown and parses its JSON reply.

use crate::ports::{AnalysisModel, PortError, PortResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::info;

pub const PYQ_ANALYZER_FUNCTION: &str = "pyq-analyzer";

/// Below this many recovered characters a PDF is treated as unreadable.
pub const MIN_EXTRACTED_CHARS: usize = 50;

/// Longest input forwarded to the model.
pub const MAX_PROMPT_CHARS: usize = 30_000;

const SYSTEM_PROMPT: &str = r#"You analyze university previous-year question papers for students.

Read the question paper text and reply with ONE JSON object and nothing else, shaped like:
{
  "subjectName": "string",
  "questions": [{ "question": "string", "topic": "string", "importance": "high|medium|low" }],
  "topicWeightage": [{ "topic": "string", "count": 0, "percentage": 0 }],
  "difficulty": "easy|moderate|hard",
  "predictedQuestions": [{ "question": "string", "probability": "high|medium|low", "reason": "string", "topic": "string" }],
  "repeatedQuestions": [{ "question": "string", "count": 0, "years": ["string"] }]
}

Rules:
- Group questions by syllabus topic; topic percentages should add up to roughly 100.
- Predict likely questions from topics that recur or carry the most marks.
- Only list a question under repeatedQuestions when it appears more than once.
- Do not wrap the JSON in prose."#;

static PDF_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\(((?:[^()\\]|\\.)*)\)").expect("PDF string pattern is valid")
});

//=========================================================================================
// Request and result types
//=========================================================================================

/// The function payload: `{ extractedText }` or `{ pdfBase64, isPdf: true }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub pdf_base64: Option<String>,
    #[serde(default)]
    pub is_pdf: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
    Text(String),
    Pdf(Vec<u8>),
}

impl AnalyzeRequest {
    pub fn into_input(self) -> PortResult<AnalysisInput> {
        if self.is_pdf {
            let encoded = self
                .pdf_base64
                .ok_or_else(|| PortError::Validation("pdfBase64 is required when isPdf is set".to_string()))?;
            // Browsers often send a data URL.
            let encoded = match encoded.split_once(";base64,") {
                Some((_, data)) => data.to_string(),
                None => encoded,
            };
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| PortError::Validation(format!("pdfBase64 is not valid base64: {}", e)))?;
            return Ok(AnalysisInput::Pdf(bytes));
        }
        match self.extracted_text {
            Some(text) if !text.trim().is_empty() => Ok(AnalysisInput::Text(text)),
            _ => Err(PortError::Validation("extractedText is required".to_string())),
        }
    }
}

/// A value the model may give either as a label ("high") or as a number (0.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Label(String),
    Value(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedQuestion {
    pub question: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub importance: Option<Score>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicWeight {
    pub topic: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedQuestion {
    pub question: String,
    #[serde(default)]
    pub probability: Option<Score>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedQuestion {
    pub question: String,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub years: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PyqAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<AnalyzedQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_weightage: Option<Vec<TopicWeight>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_questions: Option<Vec<PredictedQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeated_questions: Option<Vec<RepeatedQuestion>>,
}

//=========================================================================================
// Text recovery and reply parsing
//=========================================================================================

fn unescape_pdf_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('r') | Some('t') => out.push(' '),
            // Octal escape: up to three digits naming one byte.
            Some(first @ '0'..='7') => {
                let mut code = first.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                let byte = char::from((code & 0xFF) as u8);
                out.push(if byte.is_control() { ' ' } else { byte });
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Best-effort text recovery: collects the parenthesized string literals found in
/// the raw PDF bytes. This is not a PDF parser; compressed content streams yield
/// nothing and the call fails.
pub fn scrape_pdf_text(bytes: &[u8]) -> PortResult<String> {
    let raw = String::from_utf8_lossy(bytes);
    let pieces: Vec<String> = PDF_STRING
        .captures_iter(&raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_pdf_string(m.as_str()))
        .filter(|piece| {
            piece.chars().any(char::is_alphanumeric)
                && piece.chars().all(|c| !c.is_control() || c.is_whitespace())
                && !piece.contains('\u{FFFD}')
        })
        .collect();

    let text = pieces.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() < MIN_EXTRACTED_CHARS {
        return Err(PortError::Rule(
            "could not extract enough text from the PDF; try pasting the text instead".to_string(),
        ));
    }
    Ok(text)
}

/// Parses the model reply, tolerating a Markdown code fence or stray prose around
/// the JSON object.
pub fn parse_analysis(reply: &str) -> PortResult<PyqAnalysis> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => {
            return Err(PortError::Unexpected(
                "analysis model did not return a JSON object".to_string(),
            ))
        }
    };
    serde_json::from_str(json)
        .map_err(|e| PortError::Unexpected(format!("analysis model returned malformed JSON: {}", e)))
}

//=========================================================================================
// PyqAnalyzer
//=========================================================================================

pub struct PyqAnalyzer {
    model: Arc<dyn AnalysisModel>,
}

impl PyqAnalyzer {
    pub fn new(model: Arc<dyn AnalysisModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(&self, input: AnalysisInput) -> PortResult<PyqAnalysis> {
        let text = match input {
            AnalysisInput::Text(text) => text.trim().to_string(),
            AnalysisInput::Pdf(bytes) => scrape_pdf_text(&bytes)?,
        };
        if text.is_empty() {
            return Err(PortError::Validation("question paper text is empty".to_string()));
        }
        let text: String = text.chars().take(MAX_PROMPT_CHARS).collect();
        info!(chars = text.chars().count(), "Sending question paper for analysis");

        let reply = self
            .model
            .complete_json(
                SYSTEM_PROMPT,
                &format!("Analyze this question paper:\n\n{}", text),
            )
            .await
            .map_err(|e| PortError::Unexpected(format!("question paper analysis failed: {}", e)))?;
        parse_analysis(&reply)
    }
}
