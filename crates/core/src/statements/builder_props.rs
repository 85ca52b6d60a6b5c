//! Property-based tests for statement rendering.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use schoolplan_shared::types::VersionId;

use crate::consolidation::{ConsolidatedBudget, ConsolidationEngine};
use crate::planning::{PlanningModule, PlanningRecord};
use crate::statements::builder::StatementBuilder;
use crate::statements::types::{StatementFormat, StatementPeriod, StatementType};

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_budget() -> impl Strategy<Value = ConsolidatedBudget> {
    (
        arb_amount(),
        arb_amount(),
        arb_amount(),
        arb_amount(),
        proptest::option::of(1u32..20),
    )
        .prop_map(|(revenue, personnel, operating, capex, life)| {
            let mut equipment = PlanningRecord::financial("21540", "Équipement", capex);
            if let Some(years) = life {
                equipment = equipment.with_useful_life(years);
            }
            let pulled = vec![
                (
                    PlanningModule::Revenue,
                    vec![PlanningRecord::financial("70610", "Scolarité", revenue)],
                ),
                (
                    PlanningModule::Dhg,
                    vec![PlanningRecord::financial("64110", "Salaires", personnel)],
                ),
                (
                    PlanningModule::Costs,
                    vec![PlanningRecord::financial("62600", "Télécom", operating)],
                ),
                (PlanningModule::Capex, vec![equipment]),
            ];
            let version_id = VersionId::new();
            let output = ConsolidationEngine::default()
                .consolidate(version_id, &pulled)
                .unwrap();
            ConsolidatedBudget {
                version_id,
                is_complete: false,
                fingerprint: output.fingerprint,
                consolidated_at: Utc::now(),
                line_items: output.line_items,
                totals: output.totals,
            }
        })
}

fn arb_period() -> impl Strategy<Value = StatementPeriod> {
    prop_oneof![
        Just(StatementPeriod::Annual),
        Just(StatementPeriod::T1),
        Just(StatementPeriod::T2),
        Just(StatementPeriod::T3),
    ]
}

fn arb_format() -> impl Strategy<Value = StatementFormat> {
    prop_oneof![Just(StatementFormat::Pcg), Just(StatementFormat::Ifrs)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Feature: financial-statements, Property 1: balance sheet balances

    /// Assets equal liabilities plus equity for every rendered balance sheet.
    #[test]
    fn prop_balance_sheet_balances(
        budget in arb_budget(),
        period in arb_period(),
        format in arb_format(),
        opening in (-10_000_000i64..10_000_000).prop_map(Decimal::from),
    ) {
        let st = StatementBuilder::default()
            .with_opening_cash(opening)
            .build(&budget, StatementType::Balance, format, period);
        let check = st.balance_check.unwrap();
        prop_assert_eq!(check.difference(), Decimal::ZERO);
        prop_assert!(check.total_liabilities >= Decimal::ZERO);
    }

    // Feature: financial-statements, Property 2: PCG and IFRS agree

    /// Both formats report the same net result for the same period.
    #[test]
    fn prop_formats_agree(budget in arb_budget(), period in arb_period()) {
        let builder = StatementBuilder::default();
        let pcg = builder.build(&budget, StatementType::Income, StatementFormat::Pcg, period);
        let ifrs = builder.build(&budget, StatementType::Income, StatementFormat::Ifrs, period);
        prop_assert_eq!(pcg.net_result, ifrs.net_result);
        prop_assert_eq!(pcg.lines.last().unwrap().amount, ifrs.lines.last().unwrap().amount);
    }

    // Feature: financial-statements, Property 3: trimesters add up

    /// T1 + T2 + T3 equals the annual net result exactly.
    #[test]
    fn prop_trimesters_sum_to_annual(budget in arb_budget()) {
        let builder = StatementBuilder::default();
        let net = |period| {
            builder
                .build(&budget, StatementType::Income, StatementFormat::Pcg, period)
                .net_result
        };
        prop_assert_eq!(
            net(StatementPeriod::T1) + net(StatementPeriod::T2) + net(StatementPeriod::T3),
            net(StatementPeriod::Annual)
        );
    }

    // Feature: financial-statements, Property 4: trimester cash chains to year end

    /// T3 closes at the annual closing cash whatever the opening position.
    #[test]
    fn prop_t3_closes_at_annual_cash(
        budget in arb_budget(),
        opening in (-10_000_000i64..10_000_000).prop_map(Decimal::from),
    ) {
        let builder = StatementBuilder::default().with_opening_cash(opening);
        let closing = |period| {
            builder
                .build(&budget, StatementType::Cashflow, StatementFormat::Ifrs, period)
                .lines
                .last()
                .and_then(|l| l.amount)
        };
        prop_assert_eq!(closing(StatementPeriod::T3), closing(StatementPeriod::Annual));
    }
}
