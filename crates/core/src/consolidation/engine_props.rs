//! Property-based tests for the consolidation engine.

use proptest::prelude::*;
use rust_decimal::Decimal;

use schoolplan_shared::types::VersionId;

use crate::consolidation::engine::ConsolidationEngine;
use crate::consolidation::types::ConsolidationTotals;
use crate::planning::{PlanningModule, PlanningRecord};

const ACCOUNTS: [(&str, PlanningModule); 8] = [
    ("70610", PlanningModule::Revenue),
    ("74100", PlanningModule::Revenue),
    ("64110", PlanningModule::Dhg),
    ("64500", PlanningModule::Dhg),
    ("60610", PlanningModule::Costs),
    ("62600", PlanningModule::Costs),
    ("21830", PlanningModule::Capex),
    ("68110", PlanningModule::Capex),
];

fn arb_record() -> impl Strategy<Value = (PlanningModule, PlanningRecord)> {
    (
        0..ACCOUNTS.len(),
        (0i64..10_000_000).prop_map(|c| Decimal::new(c, 2)),
        proptest::option::of(1u32..10),
    )
        .prop_map(|(i, amount, life)| {
            let (code, module) = ACCOUNTS[i];
            let mut record = PlanningRecord::financial(code, format!("Compte {code}"), amount);
            if module == PlanningModule::Capex && code.starts_with('2')
                && let Some(years) = life
            {
                record = record.with_useful_life(years);
            }
            (module, record)
        })
}

fn group(records: Vec<(PlanningModule, PlanningRecord)>) -> Vec<(PlanningModule, Vec<PlanningRecord>)> {
    PlanningModule::ALL
        .into_iter()
        .map(|module| {
            let rows = records
                .iter()
                .filter(|(m, _)| *m == module)
                .map(|(_, r)| r.clone())
                .collect();
            (module, rows)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Feature: budget-consolidation, Property 1: operating result identity

    /// operating_result = revenue - personnel - operating, for any input,
    /// including empty modules.
    #[test]
    fn prop_operating_result_identity(
        records in prop::collection::vec(arb_record(), 0..30),
    ) {
        let pulled = group(records);
        let output = ConsolidationEngine::default()
            .consolidate(VersionId::new(), &pulled)
            .unwrap();
        let t = output.totals;
        prop_assert_eq!(
            t.operating_result,
            t.total_revenue - t.total_personnel_costs - t.total_operating_costs
        );
        prop_assert_eq!(t.net_result, t.operating_result - t.total_depreciation);
        prop_assert_eq!(t, ConsolidationTotals::from_line_items(&output.line_items));
    }

    // Feature: budget-consolidation, Property 2: idempotence

    /// Consolidating unchanged data twice yields identical line items and fingerprint.
    #[test]
    fn prop_consolidation_idempotent(
        records in prop::collection::vec(arb_record(), 0..30),
    ) {
        let pulled = group(records);
        let engine = ConsolidationEngine::default();
        let id = VersionId::new();
        let a = engine.consolidate(id, &pulled).unwrap();
        let b = engine.consolidate(id, &pulled).unwrap();
        prop_assert_eq!(&a.line_items, &b.line_items);
        prop_assert_eq!(a.fingerprint, b.fingerprint);
    }

    // Feature: budget-consolidation, Property 3: record order does not matter

    /// Reversing records within each module leaves the output unchanged.
    #[test]
    fn prop_order_independent(
        records in prop::collection::vec(arb_record(), 0..30),
    ) {
        let engine = ConsolidationEngine::default();
        let id = VersionId::new();
        let forward = group(records.clone());
        let mut reversed = records;
        reversed.reverse();
        let backward = group(reversed);

        let a = engine.consolidate(id, &forward).unwrap();
        let b = engine.consolidate(id, &backward).unwrap();
        prop_assert_eq!(a.totals, b.totals);
        prop_assert_eq!(a.fingerprint, b.fingerprint);
    }
}
