//! Configuration for the mock synthesis engine.
//!
//! Defines endpoint definitions and global settings.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    /// Endpoint definitions
    #[serde(default)]
    pub endpoints: Vec<EndpointDefinition>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

impl MockConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        Ok(config)
    }

    /// Parse and validate YAML configuration.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            endpoint
                .validate()
                .map_err(|e| anyhow::anyhow!("Endpoint {}: {}", i, e))?;
            if !seen.insert(endpoint.id.as_str()) {
                anyhow::bail!("Endpoint {}: duplicate id '{}'", i, endpoint.id);
            }
        }
        Ok(())
    }
}

/// A single endpoint definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointDefinition {
    /// Unique identifier for this endpoint
    pub id: String,

    /// HTTP method
    #[serde(default = "default_method")]
    pub method: String,

    /// Path template, `:name` segments capture parameters
    pub path: String,

    /// Default status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Static response body
    #[serde(default)]
    pub body: Option<serde_json::Value>,

    /// Interface synthesized as the response body
    #[serde(default)]
    pub interface: Option<String>,

    /// Regenerate the body on every request
    #[serde(default)]
    pub dynamic: bool,

    /// Conditional response, validated when the endpoint is prepared
    #[serde(default)]
    pub guard: Option<serde_json::Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status() -> u16 {
    200
}

impl EndpointDefinition {
    /// Validate the endpoint definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.id.is_empty() {
            anyhow::bail!("Endpoint id cannot be empty");
        }
        if !self.path.starts_with('/') {
            anyhow::bail!("Path must start with '/': {}", self.path);
        }
        if self.status < 100 || self.status > 599 {
            anyhow::bail!("Invalid status code: {}", self.status);
        }
        if self.dynamic && self.interface.is_none() {
            anyhow::bail!("Dynamic endpoint '{}' requires an interface", self.id);
        }
        Ok(())
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Log per-field evaluation failures
    #[serde(default)]
    pub verbose: bool,

    /// Directory searched for interface declarations
    #[serde(default)]
    pub interfaces_dir: Option<PathBuf>,

    /// Globs (relative to `interfaces_dir`) selecting interface files
    #[serde(default = "default_interface_globs")]
    pub interface_globs: Vec<String>,
}

impl Settings {
    /// Point `interfaces_dir` at `dir`, resolving a relative path against `cwd`
    /// rather than the configuration file's directory.
    pub fn override_interfaces_dir(&mut self, dir: PathBuf, cwd: &Path) {
        self.interfaces_dir = Some(if dir.is_absolute() { dir } else { cwd.join(dir) });
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            interfaces_dir: None,
            interface_globs: default_interface_globs(),
        }
    }
}

fn default_interface_globs() -> Vec<String> {
    vec!["**/*.ts".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_endpoint() {
        let yaml = r#"
endpoints:
  - id: hello
    path: /hello
    body:
      message: "Hello, World!"
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].method, "GET");
        assert_eq!(config.endpoints[0].status, 200);
        assert_eq!(
            config.endpoints[0].body.as_ref().unwrap()["message"],
            "Hello, World!"
        );
    }

    #[test]
    fn test_parse_guarded_endpoint() {
        let yaml = r#"
settings:
  verbose: true
  interfaces_dir: ./types
endpoints:
  - id: login
    method: POST
    path: /login
    interface: Session
    dynamic: true
    guard:
      condition:
        field: role
        operator: equals
        value: admin
      left:
        status: 200
        body: { ok: true }
      right:
        status: 403
        interface: ErrorResponse
"#;
        let config = MockConfig::from_yaml(yaml).unwrap();
        assert!(config.settings.verbose);
        assert_eq!(config.settings.interface_globs, vec!["**/*.ts".to_string()]);
        let endpoint = &config.endpoints[0];
        assert!(endpoint.dynamic);
        assert_eq!(endpoint.guard.as_ref().unwrap()["right"]["status"], 403);
    }

    #[test]
    fn test_malformed_guard_does_not_fail_parsing() {
        let yaml = r#"
endpoints:
  - id: odd
    path: /odd
    guard: "not a guard"
"#;
        assert!(MockConfig::from_yaml(yaml).is_ok());
    }

    #[test]
    fn test_interfaces_override_uses_cwd() {
        let mut settings = Settings {
            interfaces_dir: Some(PathBuf::from("from-config")),
            ..Settings::default()
        };
        settings.override_interfaces_dir(PathBuf::from("types"), Path::new("/work"));
        assert_eq!(settings.interfaces_dir, Some(PathBuf::from("/work/types")));

        settings.override_interfaces_dir(PathBuf::from("/abs/types"), Path::new("/work"));
        assert_eq!(settings.interfaces_dir, Some(PathBuf::from("/abs/types")));

        // an absolute directory is not re-rooted under the config directory
        let resolved = Path::new("conf").join(settings.interfaces_dir.as_ref().unwrap());
        assert_eq!(resolved, PathBuf::from("/abs/types"));
    }

    #[test]
    fn test_validation_errors() {
        let dynamic_without_interface = r#"
endpoints:
  - id: x
    path: /x
    dynamic: true
"#;
        assert!(MockConfig::from_yaml(dynamic_without_interface).is_err());

        let bad_path = r#"
endpoints:
  - id: x
    path: x
"#;
        assert!(MockConfig::from_yaml(bad_path).is_err());

        let duplicate = r#"
endpoints:
  - id: x
    path: /a
  - id: x
    path: /b
"#;
        assert!(MockConfig::from_yaml(duplicate).is_err());

        let unknown_field = r#"
endpoints:
  - id: x
    path: /a
    colour: blue
"#;
        assert!(MockConfig::from_yaml(unknown_field).is_err());
    }
}
