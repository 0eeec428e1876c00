pub mod answer;
pub mod config;
pub mod error;
pub mod format;
pub mod judge;
pub mod message;
pub mod prompt;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::answer::{Answer, format_answer_value};
    pub use crate::config::EvalConfig;
    pub use crate::error::{ConfigError, JudgeError, Result, RubriqError, ValidationError};
    pub use crate::format::{DiscreteOption, ResponseFormat};
    pub use crate::judge::{JudgeCallOptions, JudgeClient, JudgeVerdict};
    pub use crate::message::Message;
    pub use crate::prompt::{DEFAULT_JUDGE_PROMPT, JudgePrompt};
}
