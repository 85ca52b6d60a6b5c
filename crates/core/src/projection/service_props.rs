//! Property-based tests for the draft/apply protocol.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use crate::projection::service::ProjectionService;
use crate::projection::types::FieldOverrides;
use crate::test_support::FakeStore;
use crate::version::{CreateVersionInput, ScenarioType, VersionService};

fn arb_grade_edit() -> impl Strategy<Value = (bool, FieldOverrides)> {
    (
        any::<bool>(),
        proptest::option::of(0u32..10),
        proptest::option::of(1u32..35),
        proptest::option::of(1u32..5),
    )
        .prop_map(|(first, lateral_entry, class_size_ceiling, max_divisions)| {
            (
                first,
                FieldOverrides {
                    lateral_entry,
                    class_size_ceiling,
                    max_divisions,
                    ..FieldOverrides::default()
                },
            )
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    // Feature: enrollment-projection, Property 5: drafts never alter results

    /// Any sequence of draft writes leaves committed results unchanged.
    #[test]
    fn prop_draft_writes_never_alter_results(
        edits in prop::collection::vec(arb_grade_edit(), 1..8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let store = Arc::new(FakeStore::default());
            let versions = VersionService::new(store.clone(), Arc::new(store.adapters()));
            let version = versions
                .create(CreateVersionInput {
                    name: "Draft isolation".into(),
                    fiscal_year: 2026,
                    academic_year: "2025-2026".into(),
                    scenario_type: ScenarioType::Budget,
                    notes: None,
                })
                .await
                .unwrap();
            store.seed_grades(version.id, &[("CP", 48), ("CE1", 52)]);
            let first = store.level_id(version.id, "CP").unwrap();
            let second = store.level_id(version.id, "CE1").unwrap();
            let svc = ProjectionService::new(versions, store.clone());

            let before = svc.apply_and_calculate(version.id, None, None).await.unwrap();

            for (to_first, edit) in edits {
                let level = if to_first { first } else { second };
                svc.update_grade_overrides(version.id, BTreeMap::from([(level, edit)]))
                    .await
                    .unwrap();
                let after = svc.get_results(version.id).await.unwrap();
                assert_eq!(after, before);
            }
        });
    }
}
