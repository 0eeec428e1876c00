use thiserror::Error;

/// Top-level error type for the Rubriq library.
#[derive(Debug, Error)]
pub enum RubriqError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A judge failure in a non-adaptive mode aborts the evaluation.
    /// The state computed before the failing layer rides along for the caller.
    #[error("Evaluation aborted at '{requirement}': {source}")]
    EvaluationAborted {
        requirement: String,
        source: Box<RubriqError>,
        partial_state: serde_json::Value,
    },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Requirement '{requirement}' unlocks unknown requirement '{target}'")]
    UnknownDependency { requirement: String, target: String },

    #[error(
        "Dependency key {key} of requirement '{requirement}' is not a declared answer option"
    )]
    DependencyKeyOutOfDomain { requirement: String, key: f64 },

    #[error("Cycle detected in requirement dependencies")]
    CycleDetected,

    #[error("Duplicate requirement name: '{0}'")]
    DuplicateRequirement(String),

    #[error("Judge prompt template is missing slot '{{{0}}}'")]
    MissingTemplateSlot(String),

    #[error("Judge prompt template contains unknown slot '{{{0}}}'")]
    UnknownTemplateSlot(String),

    #[error("Unknown reward strategy tag: '{0}'")]
    UnknownStrategy(String),

    #[error("Unknown response format tag: '{0}'")]
    UnknownFormat(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Scenario contains an answer for unknown requirement '{0}'")]
    UnknownRequirement(String),

    #[error("Answer {value} for requirement '{requirement}' is outside the declared options")]
    AnswerOutOfDomain { requirement: String, value: f64 },

    #[error("Scenario answers are required for reference-guided evaluation")]
    MissingAnswers,
}

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Judge call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Invalid judge reply: {0}")]
    InvalidReply(String),
}

pub type Result<T> = std::result::Result<T, RubriqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::UnknownDependency {
            requirement: "scene_safety".into(),
            target: "triage".into(),
        };
        assert_eq!(
            err.to_string(),
            "Requirement 'scene_safety' unlocks unknown requirement 'triage'"
        );
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::AnswerOutOfDomain {
            requirement: "assess".into(),
            value: 2.0,
        };
        assert!(err.to_string().contains("assess"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn judge_error_rate_limited_display() {
        let err = JudgeError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limited: retry after Some(30)s");
    }

    #[test]
    fn rubriq_error_from_config_error() {
        let err: RubriqError = ConfigError::CycleDetected.into();
        assert!(matches!(err, RubriqError::Config(ConfigError::CycleDetected)));
        assert!(err.to_string().contains("Cycle detected"));
    }

    #[test]
    fn rubriq_error_from_judge_error() {
        let err: RubriqError = JudgeError::Auth("bad key".into()).into();
        assert!(matches!(err, RubriqError::Judge(JudgeError::Auth(_))));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn evaluation_aborted_carries_partial_state() {
        let inner: RubriqError = JudgeError::ApiRequest("timeout".into()).into();
        let err = RubriqError::EvaluationAborted {
            requirement: "assess".into(),
            source: Box::new(inner),
            partial_state: serde_json::json!({"0": {"scene_safety": {"answer": 1.0}}}),
        };
        assert!(err.to_string().contains("assess"));
        if let RubriqError::EvaluationAborted { partial_state, .. } = &err {
            assert!(partial_state["0"]["scene_safety"]["answer"].as_f64().is_some());
        } else {
            panic!("expected EvaluationAborted");
        }
    }
}
