//! # Configuration Coordinator
//!
//! Several units assert values into one shared configuration document, each
//! under its own namespace, and sometimes into another unit's namespace when
//! they depend on a convention it owns (for example, type generation must
//! agree with the serializer's key casing). The coordinator turns the ordered
//! list of those assertions into a single effective document.
//!
//! ## Rules
//!
//! - Assertions are visited in operation order.
//! - A second assertion of the same `(namespace, key_path)` with a
//!   structurally equal value is a harmless duplicate; it is reported so the
//!   caller can drop it.
//! - A second assertion with a different value is a [`ConfigConflict`]. The
//!   first value stays in the document and the conflict is reported once per
//!   key. Conflicts are never resolved automatically.
//! - Overlapping paths count as the same key: asserting `a = 1` and `a.b = 2`
//!   (in either order) conflicts, because one would silently clobber the
//!   other.

use std::fmt;

use serde_json::{Map, Value};

use crate::document::{join_path, lookup, navigate_mut, parse_path, PathSegment};
use crate::mutation::{Operation, PendingOperation};

/// One unit's contribution to a configuration key.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub unit: String,
    pub value: Value,
}

/// Two units asserted different values for the same configuration key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigConflict {
    pub namespace: String,
    pub key_path: String,
    pub first: Contribution,
    pub second: Contribution,
}

impl fmt::Display for ConfigConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}.{}` is set to {} by '{}' but to {} by '{}'",
            self.namespace,
            self.key_path,
            self.first.value,
            self.first.unit,
            self.second.value,
            self.second.unit
        )
    }
}

/// Result of merging every pending `SetConfig` operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Effective configuration, keyed by namespace.
    pub document: Value,
    /// True conflicts, in the order they were found.
    pub conflicts: Vec<ConfigConflict>,
    /// Indices (into the merged operation slice) of redundant duplicates.
    pub duplicates: Vec<usize>,
}

/// A recorded assertion, kept for duplicate and overlap checks.
struct Asserted {
    segments: Vec<PathSegment>,
    namespace: String,
    key_path: String,
    contribution: Contribution,
}

/// Merges `SetConfig` assertions into one effective document.
#[derive(Debug, Default)]
pub struct ConfigCoordinator;

impl ConfigCoordinator {
    /// Merge every `SetConfig` operation in `operations`, in order.
    ///
    /// Non-config operations are ignored, but indices in the outcome refer to
    /// positions in `operations`.
    pub fn merge(operations: &[PendingOperation]) -> MergeOutcome {
        let mut document = Value::Object(Map::new());
        let mut asserted: Vec<Asserted> = Vec::new();
        let mut conflicts: Vec<ConfigConflict> = Vec::new();
        let mut duplicates = Vec::new();

        for (index, pending) in operations.iter().enumerate() {
            let Operation::SetConfig {
                namespace,
                key_path,
                value,
            } = &pending.operation
            else {
                continue;
            };

            let segments = full_path(namespace, key_path);
            let contribution = Contribution {
                unit: pending.origin.clone(),
                value: value.clone(),
            };

            // An earlier assertion on this key, an ancestor of it, or a
            // descendant of it.
            let overlapping = asserted.iter().find(|earlier| {
                let shared = earlier.segments.len().min(segments.len());
                earlier.segments[..shared] == segments[..shared]
            });

            if let Some(earlier) = overlapping {
                if earlier.segments == segments && earlier.contribution.value == *value {
                    log::debug!(
                        "collapsing duplicate {}.{} from '{}'",
                        namespace,
                        key_path,
                        pending.origin
                    );
                    duplicates.push(index);
                    continue;
                }

                let already_reported = conflicts.iter().any(|c| {
                    c.namespace == earlier.namespace && c.key_path == earlier.key_path
                });
                if !already_reported {
                    conflicts.push(ConfigConflict {
                        namespace: earlier.namespace.clone(),
                        key_path: earlier.key_path.clone(),
                        first: earlier.contribution.clone(),
                        second: contribution,
                    });
                }
                continue;
            }

            match navigate_mut(&mut document, &segments) {
                Ok(slot) => *slot = value.clone(),
                Err(message) => {
                    // An index segment collided with a mapping (or the other
                    // way round); blame the closest earlier assertion.
                    log::warn!("cannot place {}.{}: {}", namespace, key_path, message);
                    let blocker = asserted
                        .iter()
                        .max_by_key(|earlier| common_prefix(&earlier.segments, &segments));
                    if let Some(earlier) = blocker {
                        conflicts.push(ConfigConflict {
                            namespace: earlier.namespace.clone(),
                            key_path: earlier.key_path.clone(),
                            first: earlier.contribution.clone(),
                            second: contribution,
                        });
                    }
                    continue;
                }
            }

            asserted.push(Asserted {
                segments,
                namespace: namespace.clone(),
                key_path: canonical_key(key_path),
                contribution,
            });
        }

        MergeOutcome {
            document,
            conflicts,
            duplicates,
        }
    }

    /// First value asserted for `(namespace, key_path)` among `operations`.
    ///
    /// Lets a unit read what earlier units configured without any shared
    /// global state.
    pub fn lookup<'a>(
        operations: &'a [PendingOperation],
        namespace: &str,
        key_path: &str,
    ) -> Option<&'a Value> {
        let wanted = full_path(namespace, key_path);
        operations.iter().find_map(|pending| match &pending.operation {
            Operation::SetConfig {
                namespace,
                key_path,
                value,
            } => {
                let segments = full_path(namespace, key_path);
                if segments == wanted {
                    Some(value)
                } else if wanted.starts_with(&segments) {
                    lookup(value, &wanted[segments.len()..])
                } else {
                    None
                }
            }
            _ => None,
        })
    }
}

/// Document path of a key inside its namespace.
pub(crate) fn full_path(namespace: &str, key_path: &str) -> Vec<PathSegment> {
    let mut segments = vec![PathSegment::Key(namespace.to_string())];
    segments.extend(parse_path(key_path));
    segments
}

fn common_prefix(a: &[PathSegment], b: &[PathSegment]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Canonical spelling of a key path, so `a .b` and `a.b` report alike.
pub(crate) fn canonical_key(key_path: &str) -> String {
    join_path(&parse_path(key_path))
}
