//! Structured documents patched during Commit.
//!
//! The dependency manifest and the configuration document are both kept in
//! memory as a `serde_json::Value` regardless of their on-disk format, so the
//! same navigation code serves every format. The format is chosen from the
//! file extension:
//!
//! - `.json` - JSON, key order preserved
//! - `.yaml` / `.yml` - YAML
//! - `.toml` - TOML
//!
//! ## Example
//!
//! ```
//! use stackweave::document::{parse_path, Document};
//! use serde_json::json;
//!
//! let mut doc = Document::parse("config/stackweave.json", None).unwrap();
//! doc.set(&parse_path("routing.style"), json!("camel")).unwrap();
//! assert_eq!(doc.get(&parse_path("routing.style")), Some(&json!("camel")));
//! ```

mod path;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub use path::{join_path, parse_path, PathSegment};

/// On-disk encoding of a structured document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("toml") => Ok(DocumentFormat::Toml),
            other => Err(Error::Document {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported document extension {:?} (expected json, yaml, yml or toml)",
                    other.unwrap_or("")
                ),
            }),
        }
    }
}

/// A structured document loaded into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: PathBuf,
    format: DocumentFormat,
    root: Value,
}

impl Document {
    /// Parse `content` as the document stored at `path`.
    ///
    /// `None` or blank content yields an empty document, so the first write
    /// to a missing manifest or config file creates it.
    pub fn parse<P: AsRef<Path>>(path: P, content: Option<&str>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = DocumentFormat::from_path(&path)?;

        let root = match content.map(str::trim) {
            None | Some("") => Value::Object(Map::new()),
            Some(text) => {
                let parsed = match format {
                    DocumentFormat::Json => serde_json::from_str::<Value>(text).map_err(Error::from),
                    DocumentFormat::Yaml => serde_yaml::from_str::<Value>(text).map_err(Error::from),
                    DocumentFormat::Toml => toml::from_str::<Value>(text).map_err(Error::from),
                };
                parsed.map_err(|e| Error::Document {
                    path: path.clone(),
                    message: e.to_string(),
                })?
            }
        };

        if !root.is_object() {
            return Err(Error::Document {
                path,
                message: "expected a mapping at the document root".to_string(),
            });
        }

        Ok(Self { path, format, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up the value at `segments`, if present.
    pub fn get(&self, segments: &[PathSegment]) -> Option<&Value> {
        lookup(&self.root, segments)
    }

    /// Set the value at `segments`, creating intermediate mappings.
    ///
    /// Returns the value previously stored there.
    pub fn set(&mut self, segments: &[PathSegment], value: Value) -> Result<Option<Value>> {
        let (last, parents) = segments.split_last().ok_or_else(|| Error::Document {
            path: self.path.clone(),
            message: "empty key path".to_string(),
        })?;

        let parent = navigate_mut(&mut self.root, parents).map_err(|message| Error::Document {
            path: self.path.clone(),
            message,
        })?;

        match (last, parent) {
            (PathSegment::Key(key), Value::Object(map)) => Ok(map.insert(key.clone(), value)),
            (PathSegment::Index(idx), Value::Array(items)) => {
                while items.len() <= *idx {
                    items.push(Value::Null);
                }
                Ok(Some(std::mem::replace(&mut items[*idx], value)))
            }
            (PathSegment::Key(_), _) => Err(Error::Document {
                path: self.path.clone(),
                message: format!("'{}' is not a mapping", join_path(parents)),
            }),
            (PathSegment::Index(_), _) => Err(Error::Document {
                path: self.path.clone(),
                message: format!("'{}' is not a sequence", join_path(parents)),
            }),
        }
    }

    /// Serialize back to the document's format, with a trailing newline.
    pub fn render(&self) -> Result<String> {
        let rendered = match self.format {
            DocumentFormat::Json => serde_json::to_string_pretty(&self.root)?,
            DocumentFormat::Yaml => serde_yaml::to_string(&self.root)?,
            DocumentFormat::Toml => toml::to_string_pretty(&self.root)?,
        };
        Ok(ensure_trailing_newline(rendered))
    }
}

/// Look up the value at `segments` inside `value`.
pub fn lookup<'a>(value: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.as_object()?.get(key),
        PathSegment::Index(idx) => current.as_array()?.get(*idx),
    })
}

/// Navigate to `segments` inside `value`, creating missing mappings and
/// sequences along the way.
///
/// Fails when an existing scalar sits where a container is needed; the error
/// message names the blocking segment.
pub fn navigate_mut<'a>(
    value: &'a mut Value,
    segments: &[PathSegment],
) -> std::result::Result<&'a mut Value, String> {
    let mut current = value;
    for (depth, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::Key(key) => {
                if current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let Value::Object(map) = current else {
                    return Err(format!(
                        "'{}' is not a mapping",
                        join_path(&segments[..depth])
                    ));
                };
                current = map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
            PathSegment::Index(idx) => {
                if current.is_null() {
                    *current = Value::Array(Vec::new());
                }
                let Value::Array(items) = current else {
                    return Err(format!(
                        "'{}' is not a sequence",
                        join_path(&segments[..depth])
                    ));
                };
                while items.len() <= *idx {
                    items.push(Value::Null);
                }
                current = &mut items[*idx];
            }
        }
    }
    Ok(current)
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
