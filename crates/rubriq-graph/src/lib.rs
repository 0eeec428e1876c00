pub mod builder;
pub mod levels;
pub mod requirement;

pub mod prelude {
    pub use crate::builder::{WorkflowBuilder, linear_workflow, quick_workflow};
    pub use crate::levels::topological_levels;
    pub use crate::requirement::{DependencyRule, Requirement};
}
