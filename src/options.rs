//! # User Options
//!
//! Options are declared once in [`OPTION_SPECS`] with their type and default,
//! collected as raw strings from the CLI and the project file
//! ([`RawOptions`]), and validated into a typed, immutable [`Options`] value
//! before any unit runs.
//!
//! Validation fails soft on cosmetic choices and hard on structural ones:
//!
//! - An unrecognized choice (e.g. `framework = angular`) becomes a warning and
//!   the declared default is used instead.
//! - A flag that is not a boolean is an error, because flags decide which
//!   units run and what they generate.
//! - An unknown option name is a warning and is ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mutation::{Diagnostic, DiagnosticKind};

/// Frontend framework the generated project targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    React,
    Vue,
    Svelte,
}

impl Framework {
    pub const NAMES: &'static [&'static str] = &["react", "vue", "svelte"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Vue => "vue",
            Framework::Svelte => "svelte",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Framework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "react" => Ok(Framework::React),
            "vue" => Ok(Framework::Vue),
            "svelte" => Ok(Framework::Svelte),
            other => Err(format!(
                "unknown framework '{}' (expected one of: {})",
                other,
                Framework::NAMES.join(", ")
            )),
        }
    }
}

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// One of a closed set of names.
    Choice(&'static [&'static str]),
    /// A boolean.
    Flag,
}

/// Declaration of one user option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
    pub help: &'static str,
}

/// Every option the pipeline understands.
pub const OPTION_SPECS: &[OptionSpec] = &[
    OptionSpec {
        name: "framework",
        kind: OptionKind::Choice(Framework::NAMES),
        default: "react",
        help: "Frontend framework to integrate",
    },
    OptionSpec {
        name: "typescript",
        kind: OptionKind::Flag,
        default: "true",
        help: "Generate TypeScript and compose type generation",
    },
    OptionSpec {
        name: "ssr",
        kind: OptionKind::Flag,
        default: "false",
        help: "Add a server-side rendering entrypoint",
    },
    OptionSpec {
        name: "yes",
        kind: OptionKind::Flag,
        default: "false",
        help: "Skip the confirmation prompt",
    },
];

/// Look up an option declaration by name.
pub fn spec(name: &str) -> Option<&'static OptionSpec> {
    OPTION_SPECS.iter().find(|spec| spec.name == name)
}

/// Parse a boolean the way people write them in flags and YAML.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Unvalidated option values, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOptions {
    values: BTreeMap<String, String>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder form of [`RawOptions::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Layer `overrides` on top of `self`; values in `overrides` win.
    pub fn overlay(mut self, overrides: &RawOptions) -> Self {
        for (name, value) in &overrides.values {
            self.values.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawOptions::new();
        for (k, v) in iter {
            raw.set(k, v);
        }
        raw
    }
}

/// Validated options for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub framework: Framework,
    pub typescript: bool,
    pub ssr: bool,
    pub yes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            framework: Framework::React,
            typescript: true,
            ssr: false,
            yes: false,
        }
    }
}

impl Options {
    /// Validate `raw` against [`OPTION_SPECS`].
    ///
    /// Always returns usable options; the diagnostics say what was
    /// substituted and whether anything was fatal.
    pub fn validate(raw: &RawOptions) -> (Options, Vec<Diagnostic>) {
        let mut options = Options::default();
        let mut diagnostics = Vec::new();

        for (name, value) in raw.iter() {
            let Some(spec) = spec(name) else {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::OptionValidation,
                    format!("unknown option '{}' ignored", name),
                ));
                continue;
            };

            match spec.kind {
                OptionKind::Choice(_) => match value.parse::<Framework>() {
                    Ok(framework) => options.framework = framework,
                    Err(reason) => diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::OptionValidation,
                        format!("{}; using default '{}'", reason, spec.default),
                    )),
                },
                OptionKind::Flag => match parse_flag(value) {
                    Some(flag) => options.set_flag(spec.name, flag),
                    None => diagnostics.push(Diagnostic::error(
                        DiagnosticKind::OptionValidation,
                        format!("option '{}' expects true or false, got '{}'", name, value),
                    )),
                },
            }
        }

        (options, diagnostics)
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        match name {
            "typescript" => self.typescript = value,
            "ssr" => self.ssr = value,
            "yes" => self.yes = value,
            _ => {}
        }
    }

    /// Flat flag list handed to root units, e.g.
    /// `["--framework=react", "--typescript", "--no-ssr"]`.
    pub fn to_args(&self) -> Vec<String> {
        let flag = |name: &str, on: bool| {
            if on {
                format!("--{}", name)
            } else {
                format!("--no-{}", name)
            }
        };
        vec![
            format!("--framework={}", self.framework),
            flag("typescript", self.typescript),
            flag("ssr", self.ssr),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::Severity;

    #[test]
    fn test_defaults() {
        let (options, diagnostics) = Options::validate(&RawOptions::new());
        assert_eq!(options, Options::default());
        assert_eq!(options.framework, Framework::React);
        assert!(options.typescript);
        assert!(!options.ssr);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_declared_defaults_match_options_default() {
        let raw: RawOptions = OPTION_SPECS.iter().map(|s| (s.name, s.default)).collect();
        let (options, diagnostics) = Options::validate(&raw);
        assert!(diagnostics.is_empty());
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_invalid_framework_warns_and_defaults() {
        let raw = RawOptions::new().with("framework", "angular");
        let (options, diagnostics) = Options::validate(&raw);
        assert_eq!(options.framework, Framework::React);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("angular"));
        assert!(diagnostics[0].message.contains("react"));
    }

    #[test]
    fn test_framework_is_case_insensitive() {
        let raw = RawOptions::new().with("framework", "Svelte");
        let (options, diagnostics) = Options::validate(&raw);
        assert_eq!(options.framework, Framework::Svelte);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_flag_is_an_error() {
        let raw = RawOptions::new().with("typescript", "maybe");
        let (options, diagnostics) = Options::validate(&raw);
        assert!(options.typescript);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn test_unknown_option_warns() {
        let raw = RawOptions::new().with("tailwind", "true");
        let (_, diagnostics) = Options::validate(&raw);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn test_overlay_prefers_overrides() {
        let base = RawOptions::new()
            .with("framework", "vue")
            .with("ssr", "true");
        let cli = RawOptions::new().with("framework", "svelte");
        let merged = base.overlay(&cli);
        assert_eq!(merged.get("framework"), Some("svelte"));
        assert_eq!(merged.get("ssr"), Some("true"));
    }

    #[test]
    fn test_to_args() {
        let options = Options {
            framework: Framework::Vue,
            typescript: false,
            ssr: true,
            yes: true,
        };
        assert_eq!(
            options.to_args(),
            vec!["--framework=vue", "--no-typescript", "--ssr"]
        );
    }

    #[test]
    fn test_parse_flag_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("sure"), None);
    }
}
