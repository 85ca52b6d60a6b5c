//! Consolidation domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use schoolplan_shared::types::VersionId;

use crate::planning::{PeriodAmounts, PlanningModule, PlanningRecord};

/// Consolidation category of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsolidationCategory {
    /// Tuition, fees, subsidies.
    Revenue,
    /// Salaries and social charges.
    Personnel,
    /// Other operating costs.
    Operating,
    /// Capital expenditure (acquisitions and depreciation).
    Capex,
}

impl ConsolidationCategory {
    /// Returns the string representation of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "REVENUE",
            Self::Personnel => "PERSONNEL",
            Self::Operating => "OPERATING",
            Self::Capex => "CAPEX",
        }
    }

    /// Parses a category (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "REVENUE" => Some(Self::Revenue),
            "PERSONNEL" => Some(Self::Personnel),
            "OPERATING" => Some(Self::Operating),
            "CAPEX" => Some(Self::Capex),
            _ => None,
        }
    }
}

impl fmt::Display for ConsolidationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aggregated line of a consolidated budget.
///
/// Contains no timestamps or generated ids so that identical module data
/// serializes to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationLineItem {
    /// PCG account code.
    pub account_code: String,
    /// Account label.
    pub account_name: String,
    /// Category.
    pub consolidation_category: ConsolidationCategory,
    /// True for revenue lines.
    pub is_revenue: bool,
    /// False for capitalised acquisitions.
    pub affects_result: bool,
    /// Aggregated annual amount.
    pub amount_sar: Decimal,
    /// Aggregated trimester breakdown, present only if every source had one.
    pub period_amounts: Option<PeriodAmounts>,
    /// Table of the producing module.
    pub source_table: String,
    /// Producing module.
    pub source_module: PlanningModule,
    /// Number of records aggregated into this line.
    pub source_count: u32,
    /// True when derived by the engine rather than read from a module.
    pub is_calculated: bool,
    /// Notes.
    pub notes: Option<String>,
}

impl ConsolidationLineItem {
    /// True for capitalised acquisitions (CapEx that does not hit the result).
    #[must_use]
    pub fn is_acquisition(&self) -> bool {
        self.consolidation_category == ConsolidationCategory::Capex && !self.affects_result
    }

    /// True for depreciation charges.
    #[must_use]
    pub fn is_depreciation(&self) -> bool {
        self.consolidation_category == ConsolidationCategory::Capex && self.affects_result
    }
}

/// Computed totals of a consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsolidationTotals {
    /// Sum of REVENUE lines.
    pub total_revenue: Decimal,
    /// Sum of PERSONNEL lines.
    pub total_personnel_costs: Decimal,
    /// Sum of OPERATING lines.
    pub total_operating_costs: Decimal,
    /// Sum of all CAPEX lines (acquisitions and depreciation).
    pub total_capex: Decimal,
    /// CAPEX lines that affect the result.
    pub total_depreciation: Decimal,
    /// Revenue minus personnel and operating costs.
    pub operating_result: Decimal,
    /// Operating result minus depreciation.
    pub net_result: Decimal,
}

impl ConsolidationTotals {
    /// Derives totals from line items. The only place totals are computed.
    #[must_use]
    pub fn from_line_items(items: &[ConsolidationLineItem]) -> Self {
        let mut totals = Self::default();
        for item in items {
            match item.consolidation_category {
                ConsolidationCategory::Revenue => totals.total_revenue += item.amount_sar,
                ConsolidationCategory::Personnel => {
                    totals.total_personnel_costs += item.amount_sar;
                }
                ConsolidationCategory::Operating => {
                    totals.total_operating_costs += item.amount_sar;
                }
                ConsolidationCategory::Capex => {
                    totals.total_capex += item.amount_sar;
                    if item.affects_result {
                        totals.total_depreciation += item.amount_sar;
                    }
                }
            }
        }
        totals.operating_result =
            totals.total_revenue - totals.total_personnel_costs - totals.total_operating_costs;
        totals.net_result = totals.operating_result - totals.total_depreciation;
        totals
    }

    /// Capitalised acquisitions (CapEx not charged to the result).
    #[must_use]
    pub fn total_acquisitions(&self) -> Decimal {
        self.total_capex - self.total_depreciation
    }
}

/// Metadata of the last consolidation run of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationRun {
    /// Version consolidated.
    pub version_id: VersionId,
    /// SHA-256 of the serialized line items.
    pub fingerprint: String,
    /// Completeness at the time of the run.
    pub is_complete: bool,
    /// Number of line items written.
    pub line_item_count: u32,
    /// When the run committed.
    pub consolidated_at: DateTime<Utc>,
}

/// A consolidated budget as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedBudget {
    /// Version consolidated.
    pub version_id: VersionId,
    /// Whether all six modules had records.
    pub is_complete: bool,
    /// Fingerprint of the line items.
    pub fingerprint: String,
    /// When the run committed.
    pub consolidated_at: DateTime<Utc>,
    /// Line items in deterministic order.
    pub line_items: Vec<ConsolidationLineItem>,
    /// Totals derived from the line items.
    pub totals: ConsolidationTotals,
}

impl ConsolidatedBudget {
    /// Assembles a budget from a stored run and its items.
    #[must_use]
    pub fn from_run(run: ConsolidationRun, line_items: Vec<ConsolidationLineItem>) -> Self {
        let totals = ConsolidationTotals::from_line_items(&line_items);
        Self {
            version_id: run.version_id,
            is_complete: run.is_complete,
            fingerprint: run.fingerprint,
            consolidated_at: run.consolidated_at,
            line_items,
            totals,
        }
    }
}

/// Per-module completeness. Always derived from live module data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationStatus {
    /// Version checked.
    pub version_id: VersionId,
    /// AND of the six module flags.
    pub is_complete: bool,
    /// Enrollment has records.
    pub enrollment: bool,
    /// Class structure has records.
    pub class_structure: bool,
    /// DHG has records.
    pub dhg: bool,
    /// Revenue has records.
    pub revenue: bool,
    /// Costs has records.
    pub costs: bool,
    /// CapEx has records.
    pub capex: bool,
}

impl ConsolidationStatus {
    /// Builds the status from a presence predicate.
    pub fn from_presence(version_id: VersionId, present: impl Fn(PlanningModule) -> bool) -> Self {
        let enrollment = present(PlanningModule::Enrollment);
        let class_structure = present(PlanningModule::ClassStructure);
        let dhg = present(PlanningModule::Dhg);
        let revenue = present(PlanningModule::Revenue);
        let costs = present(PlanningModule::Costs);
        let capex = present(PlanningModule::Capex);
        Self {
            version_id,
            is_complete: enrollment && class_structure && dhg && revenue && costs && capex,
            enrollment,
            class_structure,
            dhg,
            revenue,
            costs,
            capex,
        }
    }

    /// Builds the status from pulled module records.
    #[must_use]
    pub fn from_records(
        version_id: VersionId,
        pulled: &[(PlanningModule, Vec<PlanningRecord>)],
    ) -> Self {
        Self::from_presence(version_id, |module| {
            pulled
                .iter()
                .any(|(m, records)| *m == module && !records.is_empty())
        })
    }

    /// Flag for one module.
    #[must_use]
    pub const fn has(&self, module: PlanningModule) -> bool {
        match module {
            PlanningModule::Enrollment => self.enrollment,
            PlanningModule::ClassStructure => self.class_structure,
            PlanningModule::Dhg => self.dhg,
            PlanningModule::Revenue => self.revenue,
            PlanningModule::Costs => self.costs,
            PlanningModule::Capex => self.capex,
        }
    }

    /// Modules without committed records, in planning order.
    #[must_use]
    pub fn missing_modules(&self) -> Vec<PlanningModule> {
        PlanningModule::ALL
            .into_iter()
            .filter(|module| !self.has(*module))
            .collect()
    }
}

/// Human readable completeness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationValidation {
    /// Version checked.
    pub version_id: VersionId,
    /// AND of the six module flags.
    pub is_complete: bool,
    /// Modules without records.
    pub missing_modules: Vec<PlanningModule>,
    /// One message per blocking problem.
    pub errors: Vec<String>,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
    /// Totals of a dry-run consolidation over current data.
    pub totals: ConsolidationTotals,
}
