//! Property-based tests for the install pipeline.
//!
//! These tests use proptest to generate option combinations and operation
//! logs and verify that invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::Path;

    use crate::config::Layout;
    use crate::mutation::{DiagnosticKind, MutationSet, Operation, OperationKind};
    use crate::options::{Options, RawOptions};
    use crate::phases::{compose, orchestrator};
    use crate::store::MemoryStore;
    use crate::tasks::RecordingTaskRunner;
    use crate::transform::Transform;
    use crate::units::Registry;
    use proptest::prelude::*;

    fn raw_options() -> impl Strategy<Value = RawOptions> {
        (
            prop::sample::select(vec!["react", "vue", "svelte"]),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(framework, typescript, ssr)| {
                RawOptions::new()
                    .with("framework", framework)
                    .with("typescript", typescript.to_string())
                    .with("ssr", ssr.to_string())
            })
    }

    // ============================================================================
    // Composition
    // ============================================================================

    proptest! {
        /// Property: composing twice with the same options yields identical logs
        #[test]
        fn composition_is_deterministic(raw in raw_options()) {
            let registry = Registry::builtin();
            let (options, _) = Options::validate(&raw);

            let mut first = MutationSet::new();
            compose::execute(&registry, &options, &mut first);
            let mut second = MutationSet::new();
            compose::execute(&registry, &options, &mut second);

            prop_assert_eq!(first, second);
        }

        /// Property: every valid option combination finalizes without errors
        #[test]
        fn builtin_units_never_conflict(raw in raw_options()) {
            let registry = Registry::builtin();
            let (options, _) = Options::validate(&raw);
            let mut set = MutationSet::new();
            compose::execute(&registry, &options, &mut set);

            let finalized = set.finalize();
            prop_assert!(!finalized.has_errors(), "{:?}", finalized.first_error());
        }

        /// Property: type generation output appears iff typescript is on
        #[test]
        fn type_generation_follows_typescript(raw in raw_options()) {
            let registry = Registry::builtin();
            let (options, _) = Options::validate(&raw);
            let mut set = MutationSet::new();
            compose::execute(&registry, &options, &mut set);

            let typed = set.operations().iter().any(|p| {
                p.operation
                    .file_path()
                    .is_some_and(|path| path.starts_with("app/frontend/types/serializers"))
            });
            prop_assert_eq!(typed, options.typescript);
        }

        /// Property: a second install with unchanged options writes nothing
        #[test]
        fn reinstall_is_idempotent(raw in raw_options()) {
            let registry = Registry::builtin();
            let mut store = MemoryStore::new();
            let layout = Layout::default();

            let first = orchestrator::run(
                &registry, &raw, &layout, &mut store, &mut RecordingTaskRunner::new(),
            ).unwrap();
            prop_assert!(first.is_success());
            let installed = store.clone();

            let second = orchestrator::run(
                &registry, &raw, &layout, &mut store, &mut RecordingTaskRunner::new(),
            ).unwrap();
            prop_assert!(second.is_success());
            prop_assert!(!second
                .diagnostics
                .iter()
                .any(|d| d.kind == DiagnosticKind::ConfigConflict));
            prop_assert!(second.summary.unwrap().is_noop());
            prop_assert_eq!(store, installed);
        }
    }

    // ============================================================================
    // Finalize
    // ============================================================================

    fn assertions() -> impl Strategy<Value = Vec<(String, String, u8)>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["routing", "build"]),
                prop::sample::select(vec!["style", "plugin", "extension"]),
                0u8..3,
            )
                .prop_map(|(ns, key, value)| (ns.to_string(), key.to_string(), value)),
            0..12,
        )
    }

    proptest! {
        /// Property: one effective assignment per key, one conflict per
        /// disagreeing key
        #[test]
        fn finalize_collapses_and_reports_once(ops in assertions()) {
            let mut set = MutationSet::new();
            let mut values: BTreeMap<(String, String), BTreeSet<u8>> = BTreeMap::new();
            for (index, (ns, key, value)) in ops.iter().enumerate() {
                set.append(&format!("unit-{}", index), Operation::config(ns.as_str(), key.as_str(), *value));
                values.entry((ns.clone(), key.clone())).or_default().insert(*value);
            }

            let finalized = set.finalize();

            let conflicts = finalized
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::ConfigConflict)
                .count();
            let disagreeing = values.values().filter(|v| v.len() > 1).count();
            prop_assert_eq!(conflicts, disagreeing);

            let agreeing = values.values().filter(|v| v.len() == 1).count();
            let effective = finalized
                .operations
                .iter()
                .filter(|p| p.operation.kind() == OperationKind::SetConfig)
                .count();
            prop_assert!(effective >= agreeing);
            if disagreeing == 0 {
                prop_assert_eq!(effective, values.len());
            }
        }
    }

    // ============================================================================
    // Transforms
    // ============================================================================

    proptest! {
        /// Property: ensure_line is idempotent
        #[test]
        fn ensure_line_is_idempotent(content in "[a-z \n]{0,40}", line in "[a-z]{1,10}") {
            let transform = Transform::EnsureLine { line };
            let path = Path::new("app.ts");
            let once = transform.apply(path, &content).unwrap();
            let twice = transform.apply(path, &once).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Property: insert_after is idempotent once the anchor is present
        #[test]
        fn insert_after_is_idempotent(prefix in "[a-z\n]{0,20}", text in "[A-Z]{1,8}") {
            let content = format!("{}ANCHOR-line\n", prefix);
            let transform = Transform::InsertAfter { anchor: "ANCHOR".to_string(), text };
            let path = Path::new("app.ts");
            let once = transform.apply(path, &content).unwrap();
            let twice = transform.apply(path, &once).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
