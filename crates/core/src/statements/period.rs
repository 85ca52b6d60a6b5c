//! Trimester slicing of annual amounts.

use rust_decimal::{Decimal, RoundingStrategy};

use schoolplan_shared::config::PeriodSplitConfig;

use crate::consolidation::ConsolidationLineItem;
use crate::planning::PeriodAmounts;
use crate::statements::types::StatementPeriod;

fn share(amount: Decimal, percent: Decimal) -> Decimal {
    (amount * percent / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Splits `amount` by the fixed percentages. T3 takes the remainder so the
/// three slices always add back to `amount`.
#[must_use]
pub fn split_fixed(amount: Decimal, split: &PeriodSplitConfig) -> PeriodAmounts {
    let t1 = share(amount, split.t1);
    let t2 = share(amount, split.t2);
    PeriodAmounts {
        t1,
        t2,
        t3: amount - t1 - t2,
    }
}

/// Amount of one line for `period`. A module-supplied breakdown wins over
/// the fixed split.
#[must_use]
pub fn slice_amount(
    amount: Decimal,
    breakdown: Option<PeriodAmounts>,
    period: StatementPeriod,
    split: &PeriodSplitConfig,
) -> Decimal {
    let periods = match period {
        StatementPeriod::Annual => return amount,
        _ => breakdown.unwrap_or_else(|| split_fixed(amount, split)),
    };
    match period {
        StatementPeriod::T1 => periods.t1,
        StatementPeriod::T2 => periods.t2,
        StatementPeriod::T3 | StatementPeriod::Annual => periods.t3,
    }
}

/// Line items restated for `period`.
#[must_use]
pub fn slice_line_items(
    items: &[ConsolidationLineItem],
    period: StatementPeriod,
    split: &PeriodSplitConfig,
) -> Vec<ConsolidationLineItem> {
    items
        .iter()
        .map(|item| ConsolidationLineItem {
            amount_sar: slice_amount(item.amount_sar, item.period_amounts, period, split),
            ..item.clone()
        })
        .collect()
}
