//! Optional JSON configuration file.
//!
//! ```json
//! {
//!   "classification": { "phi_min_degrees": 45.0, "ignore_grounded": true },
//!   "load": { "strict_vertex_policy": true, "proximity_tolerance": 0.0001 }
//! }
//! ```
//!
//! Command-line flags override values from the file.

use std::path::Path;

use anyhow::{Context as _, Result};
use mesh_overhang::LoadOptions;
use serde::Deserialize;
use tracing::debug;

/// Parsed configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub classification: ClassificationSection,
    pub load: LoadOptions,
}

/// Classification settings. Unset fields fall back to the library defaults,
/// except `ground_level` which defaults to the model's lowest point.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationSection {
    pub phi_min_degrees: Option<f64>,
    pub ignore_grounded: Option<bool>,
    pub ground_level: Option<f64>,
    pub ground_tolerance: Option<f64>,
    pub angle_tolerance: Option<f64>,
}

/// Read the config file if one was given.
pub fn load(path: Option<&Path>) -> Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = parse(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}

pub fn parse(text: &str) -> Result<FileConfig> {
    if text.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.load, LoadOptions::default());
        assert!(config.classification.phi_min_degrees.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse(
            r#"{
                "classification": { "phi_min_degrees": 30.0, "ignore_grounded": true },
                "load": { "ignore_edges": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.classification.phi_min_degrees, Some(30.0));
        assert_eq!(config.classification.ignore_grounded, Some(true));
        assert!(config.load.ignore_edges);
        assert!(config.load.strict_vertex_policy);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse(r#"{ "classification": { "phi": 3 } }"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load(Some(Path::new("/nonexistent/mesh-overhang.json"))).is_err());
        assert!(load(None).is_ok());
    }
}
