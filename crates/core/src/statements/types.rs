//! Financial statement types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use schoolplan_shared::types::VersionId;

/// Kind of statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    /// Compte de résultat / income statement.
    Income,
    /// Bilan / balance sheet.
    Balance,
    /// Tableau des flux / cash flow statement.
    Cashflow,
}

impl StatementType {
    /// Returns the string representation of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Balance => "BALANCE",
            Self::Cashflow => "CASHFLOW",
        }
    }

    /// Parses a type from a path segment.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "income" | "income_statement" => Some(Self::Income),
            "balance" | "balance_sheet" => Some(Self::Balance),
            "cashflow" | "cash_flow" => Some(Self::Cashflow),
            _ => None,
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation standard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementFormat {
    /// French Plan Comptable Général.
    #[default]
    Pcg,
    /// IFRS captions.
    Ifrs,
}

impl StatementFormat {
    /// Returns the string representation of the format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pcg => "PCG",
            Self::Ifrs => "IFRS",
        }
    }

    /// Parses a format, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pcg" => Some(Self::Pcg),
            "ifrs" => Some(Self::Ifrs),
            _ => None,
        }
    }
}

impl fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slice of the fiscal year a statement covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementPeriod {
    /// Whole year.
    #[default]
    Annual,
    /// First trimester (P1).
    T1,
    /// Second trimester (P2).
    T2,
    /// Summer trimester (P3 / SUMMER).
    T3,
}

impl StatementPeriod {
    /// Returns the string representation of the period.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "ANNUAL",
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
        }
    }

    /// Parses a period. Accepts the P1/P2/SUMMER aliases.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "annual" | "year" => Some(Self::Annual),
            "t1" | "p1" => Some(Self::T1),
            "t2" | "p2" => Some(Self::T2),
            "t3" | "p3" | "summer" => Some(Self::T3),
            _ => None,
        }
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// 1-based position.
    pub line_number: u32,
    /// Nesting depth for display.
    pub indent_level: u8,
    /// Caption.
    pub description: String,
    /// Amount in SAR. `None` for section headers.
    pub amount: Option<Decimal>,
    /// Total or subtotal line.
    pub is_total: bool,
    /// Rendered bold.
    pub is_bold: bool,
    /// Rendered underlined.
    pub is_underlined: bool,
}

/// Balance sheet equation, reported alongside the lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    /// Total assets.
    pub total_assets: Decimal,
    /// Total liabilities.
    pub total_liabilities: Decimal,
    /// Total equity (the residual).
    pub total_equity: Decimal,
}

impl BalanceCheck {
    /// Assets minus liabilities and equity. Zero by construction.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_assets - (self.total_liabilities + self.total_equity)
    }
}

/// A rendered statement. A read projection, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialStatement {
    /// Version rendered.
    pub version_id: VersionId,
    /// Statement kind.
    pub statement_type: StatementType,
    /// Presentation standard.
    pub format: StatementFormat,
    /// Period covered.
    pub period: StatementPeriod,
    /// Title.
    pub title: String,
    /// Always "SAR".
    pub currency: String,
    /// Ordered lines.
    pub lines: Vec<StatementLine>,
    /// Net result shown on the statement.
    pub net_result: Decimal,
    /// Present on balance sheets.
    pub balance_check: Option<BalanceCheck>,
    /// Fingerprint of the consolidation rendered.
    pub fingerprint: String,
    /// When rendered.
    pub generated_at: DateTime<Utc>,
}

impl FinancialStatement {
    /// First line with the given caption.
    #[must_use]
    pub fn line(&self, description: &str) -> Option<&StatementLine> {
        self.lines.iter().find(|l| l.description == description)
    }
}
