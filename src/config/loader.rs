//! Configuration file discovery and loading.

use crate::config::schema::OrchestratorConfig;
use crate::error::{Result, StepwiseError};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up by [`find_config`].
pub const CONFIG_FILE_NAME: &str = ".stepwise.yml";

/// Find `.stepwise.yml` by walking up from `start`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Load configuration from a specific file.
pub fn load_config_file(path: &Path) -> Result<OrchestratorConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StepwiseError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StepwiseError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into an [`OrchestratorConfig`].
///
/// An empty document yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<OrchestratorConfig> {
    if content.trim().is_empty() {
        return Ok(OrchestratorConfig::default());
    }

    serde_yaml::from_str(content).map_err(|e| StepwiseError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the nearest `.stepwise.yml`, or the defaults when there is none.
pub fn load_config_or_default(start: &Path) -> Result<OrchestratorConfig> {
    match find_config(start) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading configuration");
            load_config_file(&path)
        }
        None => Ok(OrchestratorConfig::default()),
    }
}
