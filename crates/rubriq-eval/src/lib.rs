pub mod conversation;
pub mod node;
pub mod results;
pub mod rubric;
pub mod scenario;
pub mod strategy;

pub mod prelude {
    pub use crate::conversation::{ConversationState, TurnEvent};
    pub use crate::node::RequirementNode;
    pub use crate::results::{
        EvalOutcome, EvaluationMode, EvaluationResult, ScoreState, TerminalCondition,
    };
    pub use crate::rubric::{MultiStepRubric, RolloutReport};
    pub use crate::scenario::{Scenario, ScenarioBuilder};
    pub use crate::strategy::RewardStrategy;
}
