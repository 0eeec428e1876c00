use serde::{Deserialize, Serialize};

/// A reference answer for a requirement.
///
/// Scenarios may carry either a bare scalar (`1.0`) or the richer
/// `{answer, reasoning}` shape; both deserialize into this union and every
/// call site reads through [`Answer::value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Scalar(f64),
    WithReasoning {
        answer: f64,
        #[serde(default)]
        reasoning: String,
    },
}

impl Answer {
    pub fn value(&self) -> f64 {
        match self {
            Answer::Scalar(v) => *v,
            Answer::WithReasoning { answer, .. } => *answer,
        }
    }

    pub fn reasoning(&self) -> Option<&str> {
        match self {
            Answer::Scalar(_) => None,
            Answer::WithReasoning { reasoning, .. } => {
                if reasoning.is_empty() {
                    None
                } else {
                    Some(reasoning)
                }
            }
        }
    }

    pub fn with_reasoning(answer: f64, reasoning: impl Into<String>) -> Self {
        Answer::WithReasoning {
            answer,
            reasoning: reasoning.into(),
        }
    }
}

impl From<f64> for Answer {
    fn from(v: f64) -> Self {
        Answer::Scalar(v)
    }
}

/// Render an answer value the way it is keyed in revealed-info maps and
/// prompt text: `1.0`, `0.0`, `0.5` — never the bare integer form `1`.
pub fn format_answer_value(value: f64) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_value() {
        let a = Answer::Scalar(1.0);
        assert_eq!(a.value(), 1.0);
        assert!(a.reasoning().is_none());
    }

    #[test]
    fn with_reasoning_value() {
        let a = Answer::with_reasoning(0.0, "scene is not secured");
        assert_eq!(a.value(), 0.0);
        assert_eq!(a.reasoning(), Some("scene is not secured"));
    }

    #[test]
    fn empty_reasoning_reads_as_none() {
        let a = Answer::with_reasoning(1.0, "");
        assert!(a.reasoning().is_none());
    }

    #[test]
    fn deserialize_scalar_shape() {
        let a: Answer = serde_json::from_str("1.0").unwrap();
        assert_eq!(a, Answer::Scalar(1.0));
    }

    #[test]
    fn deserialize_dict_shape() {
        let a: Answer =
            serde_json::from_str(r#"{"answer": 0.0, "reasoning": "missed the step"}"#).unwrap();
        assert_eq!(a.value(), 0.0);
        assert_eq!(a.reasoning(), Some("missed the step"));
    }

    #[test]
    fn deserialize_dict_without_reasoning() {
        let a: Answer = serde_json::from_str(r#"{"answer": 1.0}"#).unwrap();
        assert_eq!(a.value(), 1.0);
        assert!(a.reasoning().is_none());
    }

    #[test]
    fn scalar_roundtrip_stays_scalar() {
        let a = Answer::Scalar(0.5);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "0.5");
        let back: Answer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn format_answer_value_keeps_decimal_point() {
        assert_eq!(format_answer_value(1.0), "1.0");
        assert_eq!(format_answer_value(0.0), "0.0");
        assert_eq!(format_answer_value(0.25), "0.25");
    }
}
