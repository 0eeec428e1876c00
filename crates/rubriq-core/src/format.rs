use serde::{Deserialize, Serialize};

use crate::answer::format_answer_value;
use crate::error::{ConfigError, JudgeError, Result};
use crate::judge::JudgeVerdict;

/// One allowed value of a discrete response format, with an optional
/// human-readable meaning surfaced in the judge instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteOption {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
}

impl DiscreteOption {
    pub fn new(value: f64, meaning: impl Into<String>) -> Self {
        Self {
            value,
            meaning: Some(meaning.into()),
        }
    }

    pub fn bare(value: f64) -> Self {
        Self {
            value,
            meaning: None,
        }
    }
}

/// Describes the verdicts a judge is allowed to return for one requirement.
///
/// Value-typed: two formats with the same options and meanings compare equal
/// and are interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// A finite set of allowed answer values.
    Discrete { options: Vec<DiscreteOption> },
    /// A closed interval `[lo, hi]` of allowed answer values.
    Continuous {
        lo: f64,
        hi: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lo_meaning: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hi_meaning: Option<String>,
    },
}

impl ResponseFormat {
    /// The common case: `1.0` meaning yes, `0.0` meaning no.
    pub fn binary() -> Self {
        ResponseFormat::Discrete {
            options: vec![
                DiscreteOption::new(1.0, "yes"),
                DiscreteOption::new(0.0, "no"),
            ],
        }
    }

    /// Continuous score on `[0.0, 1.0]`.
    pub fn unit_vector() -> Self {
        ResponseFormat::Continuous {
            lo: 0.0,
            hi: 1.0,
            lo_meaning: Some("lower".into()),
            hi_meaning: Some("higher".into()),
        }
    }

    /// Registry lookup for config-driven construction.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "binary" => Ok(Self::binary()),
            "unit_vector" => Ok(Self::unit_vector()),
            other => Err(ConfigError::UnknownFormat(other.to_string()).into()),
        }
    }

    /// Whether `value` is inside the declared answer domain.
    pub fn contains(&self, value: f64) -> bool {
        match self {
            ResponseFormat::Discrete { options } => options.iter().any(|o| o.value == value),
            ResponseFormat::Continuous { lo, hi, .. } => *lo <= value && value <= *hi,
        }
    }

    /// The answer value used in the instruction block's example payload.
    pub fn example_answer(&self) -> f64 {
        match self {
            ResponseFormat::Discrete { options } => {
                options.first().map(|o| o.value).unwrap_or(0.0)
            }
            ResponseFormat::Continuous { lo, .. } => *lo,
        }
    }

    /// The score recorded when no reference answer exists: `0.0` when the
    /// domain declares it, otherwise the lowest declared value.
    pub fn neutral_answer(&self) -> f64 {
        if self.contains(0.0) {
            return 0.0;
        }
        match self {
            ResponseFormat::Discrete { options } => options
                .iter()
                .map(|o| o.value)
                .fold(f64::INFINITY, f64::min),
            ResponseFormat::Continuous { lo, .. } => *lo,
        }
    }

    /// Declared values, for error messages.
    fn domain_str(&self) -> String {
        match self {
            ResponseFormat::Discrete { options } => {
                let values: Vec<String> = options
                    .iter()
                    .map(|o| format_answer_value(o.value))
                    .collect();
                format!("[{}]", values.join(", "))
            }
            ResponseFormat::Continuous { lo, hi, .. } => {
                format!(
                    "[{}, {}]",
                    format_answer_value(*lo),
                    format_answer_value(*hi)
                )
            }
        }
    }

    /// The canonical instruction block appended to every judge prompt:
    /// required JSON shape, allowed domain, meanings, one concrete example.
    pub fn instructions(&self) -> String {
        let mut out = String::from(
            "Respond with just a JSON object containing two fields: 'answer' and 'reasoning'. ",
        );
        match self {
            ResponseFormat::Discrete { options } => {
                out.push_str(&format!(
                    "The 'answer' field must be exactly one of the following options: {}. ",
                    self.domain_str()
                ));
                out.push_str("The 'reasoning' field should contain your explanation for the answer.");
                let meanings: Vec<String> = options
                    .iter()
                    .filter_map(|o| {
                        o.meaning
                            .as_ref()
                            .map(|m| format!("{} ({})", format_answer_value(o.value), m))
                    })
                    .collect();
                if !meanings.is_empty() {
                    out.push_str(&format!(
                        "\nThe meaning of each answer option is: {}",
                        meanings.join(", ")
                    ));
                }
            }
            ResponseFormat::Continuous {
                lo,
                hi,
                lo_meaning,
                hi_meaning,
            } => {
                out.push_str(&format!(
                    "The 'answer' field must be between {} and {}. ",
                    format_answer_value(*lo),
                    format_answer_value(*hi)
                ));
                out.push_str("The 'reasoning' field should contain your explanation for the answer.");
                if let (Some(lo_m), Some(hi_m)) = (lo_meaning, hi_meaning) {
                    out.push_str(&format!(
                        "\nThe meaning of the lower bound {} is: {}. The meaning of the upper bound {} is: {}.",
                        format_answer_value(*lo),
                        lo_m,
                        format_answer_value(*hi),
                        hi_m
                    ));
                }
            }
        }
        out.push_str(&format!(
            "\n\nExample format: {{\"answer\": {}, \"reasoning\": \"Your explanation here\"}}",
            format_answer_value(self.example_answer())
        ));
        out
    }

    /// Strict decode of a judge reply into a verdict.
    ///
    /// Requires a JSON object with both fields, coerces `answer` to a float
    /// and rejects any value outside the declared domain.
    pub fn parse(&self, reply: &str) -> Result<JudgeVerdict> {
        let parsed: serde_json::Value = serde_json::from_str(reply.trim()).map_err(|e| {
            JudgeError::InvalidReply(format!("expected a JSON object, got '{reply}': {e}"))
        })?;

        let obj = parsed
            .as_object()
            .ok_or_else(|| JudgeError::InvalidReply(format!("expected a JSON object, got '{reply}'")))?;

        let raw_answer = obj
            .get("answer")
            .ok_or_else(|| JudgeError::InvalidReply("missing 'answer' field".into()))?;
        let reasoning = obj
            .get("reasoning")
            .and_then(|r| r.as_str())
            .ok_or_else(|| JudgeError::InvalidReply("missing 'reasoning' field".into()))?;

        let answer = coerce_answer(raw_answer)
            .ok_or_else(|| JudgeError::InvalidReply(format!("non-numeric answer: {raw_answer}")))?;

        if !self.contains(answer) {
            return Err(JudgeError::InvalidReply(format!(
                "answer {} is not in {}",
                format_answer_value(answer),
                self.domain_str()
            ))
            .into());
        }

        Ok(JudgeVerdict {
            answer,
            reasoning: reasoning.to_string(),
        })
    }
}

/// Judges occasionally quote the number; accept `1.0` and `"1.0"` alike.
fn coerce_answer(raw: &serde_json::Value) -> Option<f64> {
    match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
