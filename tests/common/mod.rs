//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_package_json();
//!     fixture.install().arg("--yes").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Common project file and manifest snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// A plain application manifest.
    pub const PACKAGE_JSON: &str = r#"{
  "name": "demo-app",
  "private": true
}
"#;

    /// Project file switching the defaults to Vue without TypeScript.
    pub const VUE_JS: &str = r#"
defaults:
  framework: vue
  typescript: false
"#;

    /// Project file with YAML/TOML documents instead of JSON.
    pub const ALTERNATE_LAYOUT: &str = r#"
layout:
  manifest: deps.toml
  config: config/frontend.yaml
"#;

    /// Project file mapping the route generation task to a shell command.
    pub const WITH_TASK: &str = r#"
tasks:
  "routes:generate": ["sh", "-c", "echo generated > routes.txt"]
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "layout: [unclosed";
}

/// A temporary project directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.stackweave.yaml` project file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".stackweave.yaml", content)
    }

    /// Add the default `package.json`.
    #[allow(dead_code)]
    pub fn with_package_json(self) -> Self {
        self.with_file("package.json", configs::PACKAGE_JSON)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a file from the project.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// `stackweave install` running in this fixture's directory, with the
    /// environment cleared of settings that would change its output.
    pub fn install(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stackweave");
        cmd.current_dir(self.path())
            .env_remove("STACKWEAVE_CONFIG")
            .env("NO_COLOR", "1")
            .arg("install");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config("defaults: {}");
        assert!(fixture.path().join(".stackweave.yaml").exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [configs::VUE_JS, configs::ALTERNATE_LAYOUT, configs::WITH_TASK] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
