// ABOUTME: Judges - score a produced answer against a reference. Exact match,
// ABOUTME: numeric tolerance, and a model-backed semantic judge.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::agent::ModelSettings;
use crate::error::EvalError;
use crate::llm::{LlmClient, Message, Request};

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d+(?:\.\d+)?)\s*(°\s*[cf]?|%|percent\b|degrees?(?:\s+(?:celsius|fahrenheit))?\b|celsius\b|fahrenheit\b)?")
        .expect("quantity pattern is valid")
});

static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*]*score[ \t*]*:[ \t*]*(-?\d+(?:\.\d+)?)").expect("score pattern is valid")
});

static REASONING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^[ \t*]*reasoning[ \t*]*:[ \t*]*(.+)").expect("reasoning pattern is valid")
});

/// A score in [0, 1] and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub score: f64,
    pub reasoning: String,
}

impl Judgment {
    /// Build a judgment, clamping the score into [0, 1]. NaN scores 0.
    pub fn new(score: f64, reasoning: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            reasoning: reasoning.into(),
        }
    }
}

/// Compares a produced response with a reference answer. Sees nothing else.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Name used for report files, e.g. `answer_accuracy`.
    fn name(&self) -> &str;

    async fn judge(&self, response: &str, reference: &str) -> Result<Judgment, EvalError>;
}

/// Case- and whitespace-insensitive string equality.
#[derive(Debug, Clone, Default)]
pub struct ExactMatchJudge;

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '!'])
        .to_lowercase()
}

#[async_trait]
impl Judge for ExactMatchJudge {
    fn name(&self) -> &str {
        "exact_match"
    }

    async fn judge(&self, response: &str, reference: &str) -> Result<Judgment, EvalError> {
        if normalize(response) == normalize(reference) {
            Ok(Judgment::new(1.0, "response matches the reference"))
        } else {
            Ok(Judgment::new(
                0.0,
                format!("expected '{}', got '{}'", reference.trim(), response.trim()),
            ))
        }
    }
}

/// Compares the number the response gives as its answer with the first
/// number in the reference.
///
/// Responses usually restate the question, so a bare year or a count can come
/// before the value. When the reference carries a unit the judge takes the
/// first response number with the same unit; otherwise it skips numbers that
/// look like years unless the reference is one.
#[derive(Debug, Clone)]
pub struct NumericJudge {
    tolerance: f64,
}

/// Half a unit in the second decimal place.
pub const DEFAULT_TOLERANCE: f64 = 0.005;

impl Default for NumericJudge {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl NumericJudge {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Quantity {
    value: f64,
    unit: Option<&'static str>,
    whole: bool,
}

impl Quantity {
    fn is_year(&self) -> bool {
        self.unit.is_none() && self.whole && (1000.0..3000.0).contains(&self.value)
    }
}

fn unit_of(raw: &str) -> &'static str {
    let raw = raw.to_lowercase();
    if raw.ends_with('f') || raw.contains("fahrenheit") {
        "°f"
    } else if raw.starts_with('%') || raw.starts_with("percent") {
        "%"
    } else {
        "°c"
    }
}

fn quantities(text: &str) -> Vec<Quantity> {
    QUANTITY
        .captures_iter(text)
        .filter_map(|caps| {
            let number = caps.get(1)?.as_str();
            Some(Quantity {
                value: number.parse().ok()?,
                unit: caps.get(2).map(|m| unit_of(m.as_str())),
                whole: !number.contains('.'),
            })
        })
        .collect()
}

/// The response number that answers for `expected`.
fn answer_number(response: &str, expected: &Quantity) -> Option<f64> {
    let found = quantities(response);
    if let Some(unit) = expected.unit {
        if let Some(q) = found.iter().find(|q| q.unit == Some(unit)) {
            return Some(q.value);
        }
    }
    if !expected.is_year() {
        if let Some(q) = found.iter().find(|q| !q.is_year()) {
            return Some(q.value);
        }
    }
    found.first().map(|q| q.value)
}

#[async_trait]
impl Judge for NumericJudge {
    fn name(&self) -> &str {
        "numeric_match"
    }

    async fn judge(&self, response: &str, reference: &str) -> Result<Judgment, EvalError> {
        let expected = quantities(reference).into_iter().next().ok_or_else(|| {
            EvalError::Judge(format!("reference '{}' contains no number", reference))
        })?;
        let Some(actual) = answer_number(response, &expected) else {
            return Ok(Judgment::new(0.0, "response contains no number"));
        };

        let expected = expected.value;
        // Absorbs float error at the tolerance boundary.
        if (actual - expected).abs() <= self.tolerance + 1e-9 {
            Ok(Judgment::new(
                1.0,
                format!("{} is within {} of {}", actual, self.tolerance, expected),
            ))
        } else {
            Ok(Judgment::new(
                0.0,
                format!(
                    "{} differs from the reference {} by {:.4}",
                    actual,
                    expected,
                    (actual - expected).abs()
                ),
            ))
        }
    }
}

const JUDGE_RUBRIC: &str = "You grade answers against a reference answer. \
Decide whether the candidate answer states the same fact as the reference. \
Ignore formatting, units spelled out versus abbreviated, and rounding in the last digit. \
Reply with exactly two lines:\n\
Score: 1 if the answer is correct, 0.5 if it is partially correct, 0 if it is wrong\n\
Reasoning: one sentence explaining the score";

/// Semantic comparison by a language model.
pub struct LlmJudge {
    client: Arc<dyn LlmClient>,
    settings: ModelSettings,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn LlmClient>, settings: ModelSettings) -> Self {
        Self { client, settings }
    }

    pub fn build_request(&self, response: &str, reference: &str) -> Request {
        let mut request = Request::new(&self.settings.model)
            .system(JUDGE_RUBRIC)
            .message(Message::user(format!(
                "Reference answer: {}\nCandidate answer: {}",
                reference, response
            )));
        request.temperature = Some(self.settings.temperature.unwrap_or(0.0));
        request.top_p = self.settings.top_p;
        request.max_tokens = self.settings.max_tokens;
        request
    }
}

/// Extract a Judgment from a grader reply.
pub fn parse_verdict(text: &str) -> Result<Judgment, EvalError> {
    let score = SCORE_LINE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| EvalError::Judge(format!("no 'Score:' line in judge reply: {}", text.trim())))?;
    let reasoning = REASONING_LINE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or_else(|| text.trim().to_string(), |m| m.as_str().trim().to_string());
    Ok(Judgment::new(score, reasoning))
}

#[async_trait]
impl Judge for LlmJudge {
    fn name(&self) -> &str {
        "answer_accuracy"
    }

    async fn judge(&self, response: &str, reference: &str) -> Result<Judgment, EvalError> {
        let request = self.build_request(response, reference);
        let reply = self
            .client
            .create_message(&request)
            .await
            .map_err(|e| EvalError::Judge(e.to_string()))?;
        parse_verdict(&reply.text)
    }
}
