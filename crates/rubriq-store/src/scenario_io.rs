use std::fs;
use std::path::Path;

use rubriq_eval::scenario::Scenario;

use crate::error::Result;

/// Write scenarios as one YAML sequence.
pub fn save_scenarios(path: &Path, scenarios: &[Scenario]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_yaml::to_string(scenarios)?)?;
    Ok(())
}

/// Load a YAML sequence of scenarios.
pub fn load_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    Ok(serde_yaml::from_str(&fs::read_to_string(path)?)?)
}
