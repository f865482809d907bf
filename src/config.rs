//! # Project File
//!
//! This module defines the optional `.stackweave.yaml` project file and the
//! logic for parsing it. The file never lists operations; units decide those.
//! It only tells the pipeline where things live and how to finish the job:
//!
//! ```yaml
//! layout:
//!   manifest: package.json
//!   config: config/stackweave.json
//! defaults:
//!   framework: vue
//!   typescript: false
//! tasks:
//!   "routes:generate": ["npx", "js-from-routes"]
//! ```
//!
//! ## Key Components
//!
//! - **`ProjectConfig`**: the whole file. Every section is optional.
//! - **`Layout`**: paths of the dependency manifest and the configuration
//!   document, relative to the target directory.
//! - **`defaults`**: option values that apply when the command line does not
//!   set them. They are validated exactly like command-line values.
//! - **`tasks`**: command lines for deferred task names, used by
//!   [`CommandTaskRunner`](crate::tasks::CommandTaskRunner).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::RawOptions;

/// Default project file name, looked up in the target directory.
pub const CONFIG_FILE: &str = ".stackweave.yaml";

/// Default dependency manifest path.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Default configuration document path.
pub const DEFAULT_CONFIG_DOCUMENT: &str = "config/stackweave.json";

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST)
}

fn default_config_document() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_DOCUMENT)
}

/// Where the persisted documents live inside the target tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    /// Dependency manifest; new entries go under `dependencies`.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Configuration document; each unit owns a top-level namespace.
    #[serde(default = "default_config_document")]
    pub config: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            config: default_config_document(),
        }
    }
}

/// Parsed `.stackweave.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub layout: Layout,
    /// Option defaults, by option name.
    pub defaults: BTreeMap<String, serde_yaml::Value>,
    /// Deferred task name to command line (program first).
    pub tasks: BTreeMap<String, Vec<String>>,
}

impl ProjectConfig {
    /// The `defaults` section as raw option strings.
    ///
    /// Scalars are stringified so that `typescript: false` and
    /// `typescript: "false"` mean the same thing; nested values are rejected.
    pub fn default_options(&self) -> Result<RawOptions> {
        let mut raw = RawOptions::new();
        for (name, value) in &self.defaults {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                _ => {
                    return Err(Error::ConfigParse {
                        message: format!("default for '{}' must be a string or boolean", name),
                        hint: None,
                    })
                }
            };
            raw.set(name.clone(), text);
        }
        Ok(raw)
    }

    /// Command line configured for task `name`.
    pub fn task(&self, name: &str) -> Option<&[String]> {
        self.tasks.get(name).map(Vec::as_slice)
    }
}

/// Parses a YAML string into a `ProjectConfig`.
///
/// An empty file is the same as no file.
pub fn parse(yaml_content: &str) -> Result<ProjectConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(ProjectConfig::default());
    }

    let config: ProjectConfig =
        serde_yaml::from_str(yaml_content).map_err(|e| {
            let message = e.to_string();
            let hint = hint_for(&message);
            Error::ConfigParse { message, hint }
        })?;

    validate(&config)?;
    Ok(config)
}

/// Load the project file at `path`, or `None` if there is none.
pub fn load(path: &Path) -> Result<Option<ProjectConfig>> {
    if !path.exists() {
        log::debug!("no project file at {}", path.display());
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    log::debug!("loaded project file {}", path.display());
    parse(&content).map(Some)
}

fn hint_for(message: &str) -> Option<String> {
    if message.contains("unknown field") {
        if message.contains("manifest") || message.contains("`config`") {
            Some("layout accepts only `manifest` and `config`".to_string())
        } else {
            Some("Top-level keys are layout, defaults and tasks".to_string())
        }
    } else if message.contains("tasks") {
        Some("Each task maps to a command line list, e.g. [\"npx\", \"tool\"]".to_string())
    } else {
        None
    }
}

fn validate(config: &ProjectConfig) -> Result<()> {
    for (label, path) in [
        ("layout.manifest", &config.layout.manifest),
        ("layout.config", &config.layout.config),
    ] {
        let escapes = path.as_os_str().is_empty()
            || path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::ConfigParse {
                message: format!(
                    "{} must be a relative path inside the project, got '{}'",
                    label,
                    path.display()
                ),
                hint: None,
            });
        }
    }

    if let Some((name, _)) = config.tasks.iter().find(|(_, command)| command.is_empty()) {
        return Err(Error::ConfigParse {
            message: format!("task '{}' has an empty command line", name),
            hint: Some("Each task maps to a command line list, e.g. [\"npx\", \"tool\"]".to_string()),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_default() {
        let config = parse("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.layout.manifest, PathBuf::from("package.json"));
        assert_eq!(config.layout.config, PathBuf::from("config/stackweave.json"));
    }

    #[test]
    fn test_parse_full_file() {
        let yaml = r#"
layout:
  manifest: frontend/package.json
defaults:
  framework: vue
  typescript: false
tasks:
  "routes:generate": ["npx", "js-from-routes"]
"#;
        let config = parse(yaml).unwrap();
        assert_eq!(config.layout.manifest, PathBuf::from("frontend/package.json"));
        assert_eq!(config.layout.config, PathBuf::from("config/stackweave.json"));
        assert_eq!(
            config.task("routes:generate"),
            Some(&["npx".to_string(), "js-from-routes".to_string()][..])
        );

        let raw = config.default_options().unwrap();
        assert_eq!(raw.get("framework"), Some("vue"));
        assert_eq!(raw.get("typescript"), Some("false"));
    }

    #[test]
    fn test_parse_unknown_key_has_hint() {
        let err = parse("layuot:\n  manifest: x.json\n").unwrap_err();
        match err {
            Error::ConfigParse { message, hint } => {
                assert!(message.contains("layuot"));
                assert!(hint.unwrap().contains("layout, defaults and tasks"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_escaping_layout() {
        let err = parse("layout:\n  config: ../elsewhere.json\n").unwrap_err();
        assert!(err.to_string().contains("layout.config"));
    }

    #[test]
    fn test_parse_rejects_empty_task() {
        let err = parse("tasks:\n  build: []\n").unwrap_err();
        assert!(err.to_string().contains("empty command line"));
    }

    #[test]
    fn test_nested_default_is_rejected() {
        let config = parse("defaults:\n  framework: [react]\n").unwrap();
        assert!(config.default_options().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(load(&temp_dir.path().join(CONFIG_FILE)).unwrap().is_none());
    }

    #[test]
    fn test_load_existing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "defaults:\n  ssr: true\n").unwrap();
        let config = load(&path).unwrap().unwrap();
        assert_eq!(config.default_options().unwrap().get("ssr"), Some("true"));
    }
}
