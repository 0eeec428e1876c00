pub mod error;
pub mod rubric_io;
pub mod scenario_io;

pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::rubric_io::{RubricConfigFile, load_rubric, read_rubric_files, save_rubric};
    pub use crate::scenario_io::{load_scenarios, save_scenarios};
}
