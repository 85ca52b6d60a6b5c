//! Pure consolidation: planning records in, line items and totals out.
//!
//! The engine performs no I/O. Given the same records it produces the same
//! line items in the same order, and therefore the same fingerprint.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use sha2::{Digest, Sha256};

use schoolplan_shared::types::VersionId;

use crate::consolidation::error::ConsolidationError;
use crate::consolidation::mapping::AccountMapping;
use crate::consolidation::types::{
    ConsolidationCategory, ConsolidationLineItem, ConsolidationStatus, ConsolidationTotals,
};
use crate::planning::{PeriodAmounts, PlanningModule, PlanningRecord};

/// Account used for engine-calculated straight-line depreciation.
pub const CALCULATED_DEPRECIATION_ACCOUNT: &str = "6811";

const CALCULATED_DEPRECIATION_NAME: &str = "Dotations aux amortissements (calculées)";

/// Result of one engine pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// Line items in deterministic order.
    pub line_items: Vec<ConsolidationLineItem>,
    /// Totals derived from the line items.
    pub totals: ConsolidationTotals,
    /// Per-module completeness of the input.
    pub status: ConsolidationStatus,
    /// SHA-256 over the canonical encoding of the line items.
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct LineKey {
    category: ConsolidationCategory,
    account_code: String,
    module: PlanningModule,
    is_calculated: bool,
}

#[derive(Debug)]
struct LineAccumulator {
    account_name: String,
    is_revenue: bool,
    affects_result: bool,
    amount: Decimal,
    periods: Option<PeriodAmounts>,
    count: u32,
}

impl LineAccumulator {
    fn add(&mut self, amount: Decimal, periods: Option<PeriodAmounts>) {
        self.amount += amount;
        // A single record without a breakdown drops the breakdown for the line.
        self.periods = match (self.periods, periods) {
            (Some(acc), Some(p)) => Some(acc + p),
            _ => None,
        };
        self.count += 1;
    }

    fn into_item(self, key: LineKey) -> ConsolidationLineItem {
        ConsolidationLineItem {
            account_code: key.account_code,
            account_name: self.account_name,
            consolidation_category: key.category,
            is_revenue: self.is_revenue,
            affects_result: self.affects_result,
            amount_sar: self.amount,
            period_amounts: self.periods,
            source_table: key.module.source_table().to_string(),
            source_module: key.module,
            source_count: self.count,
            is_calculated: key.is_calculated,
            notes: key
                .is_calculated
                .then(|| "Straight-line depreciation of CapEx acquisitions".to_string()),
        }
    }
}

struct Classification {
    category: ConsolidationCategory,
    is_revenue: bool,
    affects_result: bool,
    label: String,
}

/// Aggregates planning records into consolidation line items.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationEngine {
    mapping: Arc<AccountMapping>,
}

impl ConsolidationEngine {
    /// Creates an engine using the given mapping table.
    #[must_use]
    pub fn new(mapping: Arc<AccountMapping>) -> Self {
        Self { mapping }
    }

    /// The mapping table in use.
    #[must_use]
    pub fn mapping(&self) -> &AccountMapping {
        &self.mapping
    }

    /// Consolidates pulled module records.
    ///
    /// Missing modules are not an error: the output carries partial totals
    /// and an incomplete status.
    ///
    /// # Errors
    ///
    /// Returns an aggregation error for unmapped accounts without a hint,
    /// hints contradicting the mapping, and internally inconsistent records.
    pub fn consolidate(
        &self,
        version_id: VersionId,
        pulled: &[(PlanningModule, Vec<PlanningRecord>)],
    ) -> Result<EngineOutput, ConsolidationError> {
        let mut lines: BTreeMap<LineKey, LineAccumulator> = BTreeMap::new();

        for (module, records) in pulled {
            for record in records {
                self.accumulate(&mut lines, *module, record)?;
            }
        }

        let line_items: Vec<ConsolidationLineItem> = lines
            .into_iter()
            .map(|(key, acc)| acc.into_item(key))
            .collect();
        let totals = ConsolidationTotals::from_line_items(&line_items);
        let fingerprint = fingerprint(&line_items);

        Ok(EngineOutput {
            status: ConsolidationStatus::from_records(version_id, pulled),
            line_items,
            totals,
            fingerprint,
        })
    }

    fn accumulate(
        &self,
        lines: &mut BTreeMap<LineKey, LineAccumulator>,
        module: PlanningModule,
        record: &PlanningRecord,
    ) -> Result<(), ConsolidationError> {
        let malformed = |reason: String| ConsolidationError::MalformedRecord { module, reason };

        let Some(code) = record.account_code.as_deref().map(str::trim) else {
            if record.amount_sar.is_zero() {
                return Ok(());
            }
            return Err(malformed(format!(
                "'{}' carries {} SAR but no account code",
                record.account_name, record.amount_sar
            )));
        };

        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed(format!("invalid account code '{code}'")));
        }
        if let Some(periods) = record.period_amounts
            && periods.total() != record.amount_sar
        {
            return Err(malformed(format!(
                "account {code}: period breakdown totals {} but amount is {}",
                periods.total(),
                record.amount_sar
            )));
        }
        if record.useful_life_years == Some(0) {
            return Err(malformed(format!("account {code}: useful life of 0 years")));
        }

        let class = self.classify(module, code, record)?;
        let name = if record.account_name.trim().is_empty() {
            class.label.clone()
        } else {
            record.account_name.trim().to_string()
        };

        let acquisition = class.category == ConsolidationCategory::Capex && !class.affects_result;

        lines
            .entry(LineKey {
                category: class.category,
                account_code: code.to_string(),
                module,
                is_calculated: false,
            })
            .or_insert_with(|| LineAccumulator {
                account_name: name,
                is_revenue: class.is_revenue,
                affects_result: class.affects_result,
                amount: Decimal::ZERO,
                periods: Some(PeriodAmounts::default()),
                count: 0,
            })
            .add(record.amount_sar, record.period_amounts);

        if acquisition && let Some(years) = record.useful_life_years {
            let annual = (record.amount_sar / Decimal::from(years))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            lines
                .entry(LineKey {
                    category: ConsolidationCategory::Capex,
                    account_code: CALCULATED_DEPRECIATION_ACCOUNT.to_string(),
                    module,
                    is_calculated: true,
                })
                .or_insert_with(|| LineAccumulator {
                    account_name: CALCULATED_DEPRECIATION_NAME.to_string(),
                    is_revenue: false,
                    affects_result: true,
                    amount: Decimal::ZERO,
                    periods: Some(PeriodAmounts::default()),
                    count: 0,
                })
                .add(annual, None);
        }

        Ok(())
    }

    fn classify(
        &self,
        module: PlanningModule,
        code: &str,
        record: &PlanningRecord,
    ) -> Result<Classification, ConsolidationError> {
        match (self.mapping.classify(code), record.category) {
            (Some(rule), Some(hint)) if rule.category != hint => {
                Err(ConsolidationError::MalformedRecord {
                    module,
                    reason: format!(
                        "account {code} is {} in the mapping table but was tagged {hint}",
                        rule.category
                    ),
                })
            }
            (Some(rule), _) => Ok(Classification {
                category: rule.category,
                is_revenue: rule.is_revenue,
                affects_result: rule.affects_result,
                label: rule.label.clone(),
            }),
            (None, Some(hint)) => Ok(Classification {
                category: hint,
                is_revenue: hint == ConsolidationCategory::Revenue,
                // Unmapped CapEx is treated as an acquisition.
                affects_result: hint != ConsolidationCategory::Capex,
                label: format!("Compte {code}"),
            }),
            (None, None) => Err(ConsolidationError::UnmappedAccount {
                module,
                account_code: code.to_string(),
            }),
        }
    }

    /// Non-fatal observations about a consolidation.
    #[must_use]
    pub fn warnings(output: &EngineOutput) -> Vec<String> {
        let mut warnings = Vec::new();
        let totals = &output.totals;

        if output.status.capex && !output.line_items.iter().any(ConsolidationLineItem::is_acquisition)
        {
            warnings.push(
                "No CapEx acquisitions found; acceptable if the version has none".to_string(),
            );
        }

        let has_depreciation = output
            .line_items
            .iter()
            .any(ConsolidationLineItem::is_depreciation);
        if totals.total_acquisitions() > Decimal::ZERO && !has_depreciation {
            warnings.push(format!(
                "CapEx acquisitions of {} SAR have no depreciation; set a useful life",
                totals.total_acquisitions()
            ));
        }

        let explicit: BTreeSet<PlanningModule> = output
            .line_items
            .iter()
            .filter(|i| i.is_depreciation() && !i.is_calculated)
            .map(|i| i.source_module)
            .collect();
        for module in output
            .line_items
            .iter()
            .filter(|i| i.is_calculated && explicit.contains(&i.source_module))
            .map(|i| i.source_module)
        {
            warnings.push(format!(
                "{} module has both depreciation records and assets with a useful life; \
                 depreciation may be counted twice",
                module.label()
            ));
        }

        if output.status.revenue && totals.total_revenue.is_zero() {
            warnings.push("Revenue module has records but total revenue is zero".to_string());
        }

        if totals.net_result < Decimal::ZERO {
            warnings.push(format!("Net result is a deficit of {} SAR", -totals.net_result));
        }

        warnings
    }
}

/// SHA-256 over a canonical, field-separated encoding of the line items.
#[must_use]
pub fn fingerprint(items: &[ConsolidationLineItem]) -> String {
    let mut hasher = Sha256::new();
    for item in items {
        let periods = item
            .period_amounts
            .map(|p| format!("{}/{}/{}", p.t1, p.t2, p.t3))
            .unwrap_or_default();
        let line = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}\n",
            item.consolidation_category,
            item.account_code,
            item.account_name,
            item.is_revenue,
            item.affects_result,
            item.amount_sar,
            periods,
            item.source_table,
            item.source_count,
            item.is_calculated,
            item.notes.as_deref().unwrap_or(""),
        );
        hasher.update(line.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
