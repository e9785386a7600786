//! Optional user configuration, loaded from a `clipforge.json` file.
//!
//! Everything here is a default the CLI can override per invocation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ClipResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Theme id used when none is given on the command line.
    pub theme: String,
    /// Quality preset id used when none is given.
    pub quality: String,
    /// Hard override for the scheduler's concurrency cap. When absent the
    /// cap is derived from available memory.
    pub max_concurrency: Option<usize>,
    /// Path to a TTF font file loaded at startup.
    pub font_path: Option<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            theme: "subway".to_string(),
            quality: "720p".to_string(),
            max_concurrency: None,
            font_path: None,
        }
    }
}

impl ForgeConfig {
    /// Load config from a JSON file, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> ClipResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
