use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rubriq_core::judge::JudgeClient;
use rubriq_eval::rubric::MultiStepRubric;
use rubriq_eval::strategy::RewardStrategy;
use rubriq_graph::requirement::Requirement;
use rubriq_judge::config::JudgeClientConfig;

use crate::error::Result;

/// `<prefix>_rubric.yaml`: everything about a rubric except the
/// requirement graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricConfigFile {
    pub reward_strategy: RewardStrategy,
    pub judge: JudgeClientConfig,
}

fn requirements_path(dir: &Path, prefix: &str) -> std::path::PathBuf {
    dir.join(format!("{prefix}_requirements.yaml"))
}

fn config_path(dir: &Path, prefix: &str) -> std::path::PathBuf {
    dir.join(format!("{prefix}_rubric.yaml"))
}

/// Write a rubric as the `<prefix>_requirements.yaml` /
/// `<prefix>_rubric.yaml` file pair.
pub fn save_rubric(
    dir: &Path,
    prefix: &str,
    rubric: &MultiStepRubric,
    judge: &JudgeClientConfig,
) -> Result<()> {
    fs::create_dir_all(dir)?;

    let requirements: Vec<&Requirement> = rubric.requirements().collect();
    fs::write(
        requirements_path(dir, prefix),
        serde_yaml::to_string(&requirements)?,
    )?;

    let config = RubricConfigFile {
        reward_strategy: rubric.reward_strategy().clone(),
        judge: judge.clone(),
    };
    fs::write(config_path(dir, prefix), serde_yaml::to_string(&config)?)?;
    Ok(())
}

/// Read back the raw file pair without constructing a rubric.
pub fn read_rubric_files(
    dir: &Path,
    prefix: &str,
) -> Result<(Vec<Requirement>, RubricConfigFile)> {
    let requirements: Vec<Requirement> =
        serde_yaml::from_str(&fs::read_to_string(requirements_path(dir, prefix))?)?;
    let config: RubricConfigFile =
        serde_yaml::from_str(&fs::read_to_string(config_path(dir, prefix))?)?;
    Ok((requirements, config))
}

/// Load a rubric, re-running full construction so a file pair whose graph
/// violates the rubric invariants is rejected.
pub fn load_rubric(
    dir: &Path,
    prefix: &str,
    client: Arc<dyn JudgeClient>,
) -> Result<MultiStepRubric> {
    let (requirements, config) = read_rubric_files(dir, prefix)?;
    Ok(MultiStepRubric::with_strategy(
        requirements,
        client,
        config.reward_strategy,
    )?)
}
