//! Planning module identities and the normalized record they expose.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consolidation::ConsolidationCategory;

/// The six sequential planning modules feeding consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningModule {
    /// Student enrollment plan.
    Enrollment,
    /// Divisions per grade.
    ClassStructure,
    /// Workforce hours (Dotation Horaire Globale).
    Dhg,
    /// Tuition and other revenue.
    Revenue,
    /// Personnel and operating costs.
    Costs,
    /// Capital expenditure.
    Capex,
}

impl PlanningModule {
    /// All modules in planning order.
    pub const ALL: [Self; 6] = [
        Self::Enrollment,
        Self::ClassStructure,
        Self::Dhg,
        Self::Revenue,
        Self::Costs,
        Self::Capex,
    ];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Enrollment => 0,
            Self::ClassStructure => 1,
            Self::Dhg => 2,
            Self::Revenue => 3,
            Self::Costs => 4,
            Self::Capex => 5,
        }
    }

    /// Returns the string representation of the module.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::ClassStructure => "class_structure",
            Self::Dhg => "dhg",
            Self::Revenue => "revenue",
            Self::Costs => "costs",
            Self::Capex => "capex",
        }
    }

    /// Parses a module from its string form (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "enrollment" => Some(Self::Enrollment),
            "class_structure" => Some(Self::ClassStructure),
            "dhg" | "workforce" => Some(Self::Dhg),
            "revenue" => Some(Self::Revenue),
            "costs" => Some(Self::Costs),
            "capex" => Some(Self::Capex),
            _ => None,
        }
    }

    /// Table the module's records come from; copied onto line items.
    #[must_use]
    pub const fn source_table(&self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment_plans",
            Self::ClassStructure => "class_structures",
            Self::Dhg => "dhg_allocations",
            Self::Revenue => "revenue_plans",
            Self::Costs => "cost_plans",
            Self::Capex => "capex_plans",
        }
    }

    /// Human readable label used in validation messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Enrollment => "Enrollment",
            Self::ClassStructure => "Class structure",
            Self::Dhg => "Workforce (DHG)",
            Self::Revenue => "Revenue",
            Self::Costs => "Costs",
            Self::Capex => "CapEx",
        }
    }
}

impl fmt::Display for PlanningModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trimester breakdown of an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodAmounts {
    /// First trimester.
    pub t1: Decimal,
    /// Second trimester.
    pub t2: Decimal,
    /// Third (summer) trimester.
    pub t3: Decimal,
}

impl PeriodAmounts {
    /// Sum of the three trimesters.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.t1 + self.t2 + self.t3
    }
}

impl std::ops::Add for PeriodAmounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            t1: self.t1 + rhs.t1,
            t2: self.t2 + rhs.t2,
            t3: self.t3 + rhs.t3,
        }
    }
}

/// A committed record exposed by a planning module.
///
/// Records without an account code are operational (headcounts, divisions):
/// they count towards completeness but produce no line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningRecord {
    /// PCG account code, absent for non-financial records.
    pub account_code: Option<String>,
    /// Account or record label.
    pub account_name: String,
    /// Category hint supplied by the module.
    #[serde(default)]
    pub category: Option<ConsolidationCategory>,
    /// Annual amount in SAR.
    pub amount_sar: Decimal,
    /// Trimester breakdown, when the module plans per period.
    #[serde(default)]
    pub period_amounts: Option<PeriodAmounts>,
    /// Straight-line depreciation life for CapEx acquisitions.
    #[serde(default)]
    pub useful_life_years: Option<u32>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl PlanningRecord {
    /// Builds a financial record with just a code, a name and an amount.
    #[must_use]
    pub fn financial(code: impl Into<String>, name: impl Into<String>, amount_sar: Decimal) -> Self {
        Self {
            account_code: Some(code.into()),
            account_name: name.into(),
            category: None,
            amount_sar,
            period_amounts: None,
            useful_life_years: None,
            notes: None,
        }
    }

    /// Builds a non-financial record.
    #[must_use]
    pub fn operational(name: impl Into<String>) -> Self {
        Self {
            account_code: None,
            account_name: name.into(),
            category: None,
            amount_sar: Decimal::ZERO,
            period_amounts: None,
            useful_life_years: None,
            notes: None,
        }
    }

    /// Sets the category hint.
    #[must_use]
    pub fn with_category(mut self, category: ConsolidationCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the trimester breakdown.
    #[must_use]
    pub fn with_periods(mut self, periods: PeriodAmounts) -> Self {
        self.period_amounts = Some(periods);
        self
    }

    /// Sets the depreciation life.
    #[must_use]
    pub fn with_useful_life(mut self, years: u32) -> Self {
        self.useful_life_years = Some(years);
        self
    }
}
