use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::judge::JudgeCallOptions;

/// Configuration threaded through a single evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Unique identifier for this evaluation run.
    pub run_id: Uuid,

    /// Hard cap on layer count in adaptive mode.
    pub max_depth: usize,

    /// Options applied to every judge call in this evaluation.
    #[serde(default)]
    pub call: JudgeCallOptions,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            max_depth: 10,
            call: JudgeCallOptions::default(),
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_call_options(mut self, call: JudgeCallOptions) -> Self {
        self.call = call;
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }
}
