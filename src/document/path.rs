//! Key path parsing for configuration assertions.
//!
//! A key path addresses a location inside a structured document:
//!
//! - Dot notation: `output.folder`
//! - Quoted bracket keys for keys containing dots: `aliases["@/routes"]`
//! - Array indices: `plugins[0]`
//! - Escaped dots: `file\.ext` (a single key `file.ext`)

use std::fmt;

/// One step of a parsed key path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named key for accessing object/map members
    Key(String),
    /// A numeric index for accessing array/sequence elements
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) if key.contains('.') || key.contains('[') => {
                write!(f, "[\"{}\"]", key)
            }
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Parse a key path into segments.
///
/// # Examples
///
/// ```
/// use stackweave::document::{parse_path, PathSegment};
///
/// let segments = parse_path("plugins[0].name");
/// assert_eq!(segments.len(), 3);
/// assert_eq!(segments[1], PathSegment::Index(0));
/// ```
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.trim().chars().peekable();

    let flush = |current: &mut String, segments: &mut Vec<PathSegment>| {
        if !current.is_empty() {
            segments.push(PathSegment::Key(std::mem::take(current)));
        }
    };

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '.' => flush(&mut current, &mut segments),
            '[' => {
                flush(&mut current, &mut segments);

                match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        let mut key = String::new();
                        while let Some(ch) = chars.next() {
                            if ch == '\\' {
                                if let Some(next) = chars.next() {
                                    key.push(next);
                                }
                            } else if ch == quote && chars.peek() == Some(&']') {
                                chars.next();
                                break;
                            } else {
                                key.push(ch);
                            }
                        }
                        segments.push(PathSegment::Key(key));
                    }
                    _ => {
                        let inner: String = chars.by_ref().take_while(|c| *c != ']').collect();
                        let inner = inner.trim();
                        match inner.parse::<usize>() {
                            Ok(idx) => segments.push(PathSegment::Index(idx)),
                            Err(_) if !inner.is_empty() => {
                                segments.push(PathSegment::Key(inner.to_string()))
                            }
                            Err(_) => {}
                        }
                    }
                }
            }
            _ => current.push(ch),
        }
    }

    flush(&mut current, &mut segments);
    segments
}

/// Render segments back to a canonical key path string.
pub fn join_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            PathSegment::Key(_) if !out.is_empty() && !segment.to_string().starts_with('[') => {
                out.push('.');
                out.push_str(&segment.to_string());
            }
            _ => out.push_str(&segment.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_simple_dot_notation() {
        let segments = parse_path("output.folder");
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("output".to_string()),
                PathSegment::Key("folder".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_path_array_index() {
        let segments = parse_path("plugins[1]");
        assert_eq!(
            segments,
            vec![PathSegment::Key("plugins".to_string()), PathSegment::Index(1)]
        );
    }

    #[test]
    fn test_parse_path_quoted_key() {
        let segments = parse_path(r#"aliases["@/routes.ts"]"#);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], PathSegment::Key("@/routes.ts".to_string()));
    }

    #[test]
    fn test_parse_path_escaped_dot() {
        let segments = parse_path(r"file\.ext.enabled");
        assert_eq!(segments[0], PathSegment::Key("file.ext".to_string()));
        assert_eq!(segments[1], PathSegment::Key("enabled".to_string()));
    }

    #[test]
    fn test_parse_path_empty() {
        assert!(parse_path("").is_empty());
        assert!(parse_path("   ").is_empty());
    }

    #[test]
    fn test_join_path_canonicalizes() {
        assert_eq!(join_path(&parse_path("a.b[2].c")), "a.b[2].c");
        assert_eq!(join_path(&parse_path(r#"a["x.y"]"#)), r#"a["x.y"]"#);
        assert_eq!(join_path(&parse_path("  camelize ")), "camelize");
    }
}
