//! Patch transforms applied to existing file content.
//!
//! Transforms are plain data so that two runs with the same options produce
//! equal operation logs, and so that a dry run can print them. Every
//! transform is idempotent: applying it to its own output is a no-op, which
//! is what makes re-running an install against an already-patched tree safe.

use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A content transform for `PatchFile` operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Transform {
    /// Append `line` at the end of the file unless a line equal to it
    /// (ignoring surrounding whitespace) already exists.
    EnsureLine { line: String },

    /// Insert `text` on the line after the first line containing `anchor`,
    /// unless `text` is already present.
    InsertAfter { anchor: String, text: String },

    /// Replace every match of the regex `pattern` with `replacement`.
    ///
    /// Idempotent only when `replacement` does not itself match `pattern`,
    /// which units are expected to guarantee.
    ReplaceAll { pattern: String, replacement: String },
}

impl Transform {
    /// Check that the transform can be applied at all, independent of
    /// content. Used by finalize to reject broken operations early.
    pub fn validate(&self) -> Result<()> {
        match self {
            Transform::ReplaceAll { pattern, .. } => {
                Regex::new(pattern)?;
                Ok(())
            }
            Transform::InsertAfter { anchor, .. } if anchor.is_empty() => {
                Err(Error::Transform {
                    path: Path::new("").to_path_buf(),
                    message: "insert_after anchor must not be empty".to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Apply the transform to `content`, the current pending content of
    /// `path`.
    pub fn apply(&self, path: &Path, content: &str) -> Result<String> {
        match self {
            Transform::EnsureLine { line } => {
                if content.lines().any(|existing| existing.trim() == line.trim()) {
                    return Ok(content.to_string());
                }
                let mut out = content.to_string();
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(line);
                out.push('\n');
                Ok(out)
            }
            Transform::InsertAfter { anchor, text } => {
                if content.contains(text.as_str()) {
                    return Ok(content.to_string());
                }
                let mut out = String::with_capacity(content.len() + text.len() + 1);
                let mut inserted = false;
                for line in content.split_inclusive('\n') {
                    out.push_str(line);
                    if !inserted && line.contains(anchor.as_str()) {
                        if !line.ends_with('\n') {
                            out.push('\n');
                        }
                        out.push_str(text);
                        if !text.ends_with('\n') {
                            out.push('\n');
                        }
                        inserted = true;
                    }
                }
                if !inserted {
                    return Err(Error::Transform {
                        path: path.to_path_buf(),
                        message: format!("anchor '{}' not found", anchor),
                    });
                }
                Ok(out)
            }
            Transform::ReplaceAll {
                pattern,
                replacement,
            } => {
                let regex = Regex::new(pattern)?;
                Ok(regex
                    .replace_all(content, replacement.as_str())
                    .into_owned())
            }
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::EnsureLine { line } => write!(f, "ensure line `{}`", line),
            Transform::InsertAfter { anchor, .. } => write!(f, "insert after `{}`", anchor),
            Transform::ReplaceAll { pattern, .. } => write!(f, "replace /{}/", pattern),
        }
    }
}
