//! Statement rendering over consolidated line items.
//!
//! Every figure is derived from one [`ConsolidationTotals`] computed on the
//! period-sliced line items, so PCG and IFRS always show the same net
//! result. On the balance sheet equity is the residual of assets and
//! liabilities.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::Decimal;

use schoolplan_shared::config::PeriodSplitConfig;

use crate::consolidation::{
    ConsolidatedBudget, ConsolidationCategory, ConsolidationLineItem, ConsolidationTotals,
};
use crate::statements::period::slice_line_items;
use crate::statements::types::{
    BalanceCheck, FinancialStatement, StatementFormat, StatementLine, StatementPeriod,
    StatementType,
};

/// Reporting currency.
pub const CURRENCY: &str = "SAR";

#[derive(Default)]
struct LineWriter {
    lines: Vec<StatementLine>,
}

impl LineWriter {
    fn push(
        &mut self,
        indent_level: u8,
        description: &str,
        amount: Option<Decimal>,
        is_total: bool,
        is_bold: bool,
        is_underlined: bool,
    ) {
        let line_number = u32::try_from(self.lines.len() + 1).unwrap_or(u32::MAX);
        self.lines.push(StatementLine {
            line_number,
            indent_level,
            description: description.to_string(),
            amount,
            is_total,
            is_bold,
            is_underlined,
        });
    }

    fn header(&mut self, indent: u8, description: &str) {
        self.push(indent, description, None, false, true, false);
    }

    fn item(&mut self, indent: u8, description: &str, amount: Decimal) {
        self.push(indent, description, Some(amount), false, false, false);
    }

    fn subtotal(&mut self, indent: u8, description: &str, amount: Decimal) {
        self.push(indent, description, Some(amount), true, true, false);
    }

    fn grand_total(&mut self, description: &str, amount: Decimal) {
        self.push(0, description, Some(amount), true, true, true);
    }
}

/// Two-digit PCG class of an account code.
fn account_class(code: &str) -> &str {
    code.get(..2).unwrap_or(code)
}

/// French caption of a PCG account class.
#[must_use]
pub fn pcg_class_caption(class: &str) -> String {
    let caption = match class {
        "20" => "Immobilisations incorporelles",
        "21" => "Immobilisations corporelles",
        "23" => "Immobilisations en cours",
        "60" => "Achats",
        "61" => "Services extérieurs",
        "62" => "Autres services extérieurs",
        "63" => "Impôts, taxes et versements assimilés",
        "64" => "Charges de personnel",
        "65" => "Autres charges de gestion courante",
        "66" => "Charges financières",
        "67" => "Charges exceptionnelles",
        "68" => "Dotations aux amortissements",
        "70" => "Ventes de prestations",
        "71" => "Production stockée",
        "72" => "Production immobilisée",
        "74" => "Subventions d'exploitation",
        "75" => "Autres produits de gestion courante",
        "76" => "Produits financiers",
        "77" => "Produits exceptionnels",
        _ => return format!("{class} Autres comptes"),
    };
    format!("{class} {caption}")
}

fn by_class<'a>(
    items: &'a [ConsolidationLineItem],
    keep: impl Fn(&ConsolidationLineItem) -> bool,
) -> BTreeMap<&'a str, Decimal> {
    let mut classes: BTreeMap<&str, Decimal> = BTreeMap::new();
    for item in items.iter().filter(|i| keep(i)) {
        *classes.entry(account_class(&item.account_code)).or_default() += item.amount_sar;
    }
    classes
}

struct BalanceCaptions {
    assets: &'static str,
    fixed_assets: &'static str,
    gross_fixed: &'static str,
    accumulated_depreciation: &'static str,
    net_fixed: &'static str,
    cash: &'static str,
    total_assets: &'static str,
    equity_and_liabilities: &'static str,
    equity: &'static str,
    reserves: &'static str,
    result: &'static str,
    total_equity: &'static str,
    liabilities: &'static str,
    overdraft: &'static str,
    total_liabilities: &'static str,
    total_equity_and_liabilities: &'static str,
}

const PCG_BALANCE: BalanceCaptions = BalanceCaptions {
    assets: "Actif",
    fixed_assets: "Actif immobilisé",
    gross_fixed: "Immobilisations brutes",
    accumulated_depreciation: "Amortissements",
    net_fixed: "Immobilisations nettes",
    cash: "Disponibilités",
    total_assets: "Total actif",
    equity_and_liabilities: "Passif",
    equity: "Capitaux propres",
    reserves: "Réserves et report à nouveau",
    result: "Résultat de l'exercice",
    total_equity: "Total capitaux propres",
    liabilities: "Dettes",
    overdraft: "Concours bancaires courants",
    total_liabilities: "Total dettes",
    total_equity_and_liabilities: "Total passif",
};

const IFRS_BALANCE: BalanceCaptions = BalanceCaptions {
    assets: "Assets",
    fixed_assets: "Non-current assets",
    gross_fixed: "Property, plant and equipment at cost",
    accumulated_depreciation: "Accumulated depreciation",
    net_fixed: "Property, plant and equipment, net",
    cash: "Cash and cash equivalents",
    total_assets: "Total assets",
    equity_and_liabilities: "Equity and liabilities",
    equity: "Equity",
    reserves: "Retained earnings and reserves",
    result: "Profit for the period",
    total_equity: "Total equity",
    liabilities: "Current liabilities",
    overdraft: "Bank overdrafts",
    total_liabilities: "Total liabilities",
    total_equity_and_liabilities: "Total equity and liabilities",
};

struct CashflowCaptions {
    operating: &'static str,
    net_result: &'static str,
    depreciation: &'static str,
    net_operating: &'static str,
    investing: &'static str,
    acquisitions: &'static str,
    net_investing: &'static str,
    opening: &'static str,
    net_change: &'static str,
    closing: &'static str,
}

const PCG_CASHFLOW: CashflowCaptions = CashflowCaptions {
    operating: "Flux de trésorerie liés à l'activité",
    net_result: "Résultat net",
    depreciation: "Dotations aux amortissements",
    net_operating: "Flux net de trésorerie généré par l'activité",
    investing: "Flux de trésorerie liés aux investissements",
    acquisitions: "Acquisitions d'immobilisations",
    net_investing: "Flux net lié aux investissements",
    opening: "Trésorerie d'ouverture",
    net_change: "Variation de trésorerie",
    closing: "Trésorerie de clôture",
};

const IFRS_CASHFLOW: CashflowCaptions = CashflowCaptions {
    operating: "Cash flows from operating activities",
    net_result: "Profit for the period",
    depreciation: "Depreciation and amortisation",
    net_operating: "Net cash from operating activities",
    investing: "Cash flows from investing activities",
    acquisitions: "Purchase of property, plant and equipment",
    net_investing: "Net cash used in investing activities",
    opening: "Cash at beginning of period",
    net_change: "Net change in cash and cash equivalents",
    closing: "Cash at end of period",
};

/// Balance sheet figures derived from totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    acquisitions: Decimal,
    depreciation: Decimal,
    net_fixed: Decimal,
    cash: Decimal,
    overdraft: Decimal,
    reserves: Decimal,
    check: BalanceCheck,
}

/// Cash and fixed-asset movements of the trimesters that close before a
/// period opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CarriedForward {
    cash: Decimal,
    acquisitions: Decimal,
    depreciation: Decimal,
}

/// Trimesters that close before `period` opens.
const fn preceding(period: StatementPeriod) -> &'static [StatementPeriod] {
    match period {
        StatementPeriod::Annual | StatementPeriod::T1 => &[],
        StatementPeriod::T2 => &[StatementPeriod::T1],
        StatementPeriod::T3 => &[StatementPeriod::T1, StatementPeriod::T2],
    }
}

/// Renders statements for a consolidated budget.
///
/// Opening cash is the position at the start of the fiscal year. T2 and T3
/// open at the previous trimester's closing cash, and their balance sheets
/// carry fixed assets acquired earlier in the year.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    split: PeriodSplitConfig,
    opening_cash: Decimal,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new(PeriodSplitConfig::default())
    }
}

impl StatementBuilder {
    /// Creates a builder with the given trimester split and zero opening cash.
    #[must_use]
    pub fn new(split: PeriodSplitConfig) -> Self {
        Self {
            split,
            opening_cash: Decimal::ZERO,
        }
    }

    /// Sets the cash position at the start of the fiscal year.
    #[must_use]
    pub fn with_opening_cash(mut self, opening_cash: Decimal) -> Self {
        self.opening_cash = opening_cash;
        self
    }

    /// The trimester split in use.
    #[must_use]
    pub fn split(&self) -> &PeriodSplitConfig {
        &self.split
    }

    /// Renders one statement.
    #[must_use]
    pub fn build(
        &self,
        budget: &ConsolidatedBudget,
        statement_type: StatementType,
        format: StatementFormat,
        period: StatementPeriod,
    ) -> FinancialStatement {
        let items = slice_line_items(&budget.line_items, period, &self.split);
        let totals = ConsolidationTotals::from_line_items(&items);
        let carried = self.carried_forward(&budget.line_items, period);
        let mut writer = LineWriter::default();

        let balance_check = match statement_type {
            StatementType::Income => {
                match format {
                    StatementFormat::Pcg => Self::pcg_income(&mut writer, &items, &totals),
                    StatementFormat::Ifrs => Self::ifrs_income(&mut writer, &totals),
                }
                None
            }
            StatementType::Balance => {
                Some(self.balance_sheet(&mut writer, format, &totals, carried))
            }
            StatementType::Cashflow => {
                self.cash_flow(&mut writer, format, &totals, carried);
                None
            }
        };

        FinancialStatement {
            version_id: budget.version_id,
            statement_type,
            format,
            period,
            title: format!("{} ({period})", Self::title(statement_type, format)),
            currency: CURRENCY.to_string(),
            lines: writer.lines,
            net_result: totals.net_result,
            balance_check,
            fingerprint: budget.fingerprint.clone(),
            generated_at: Utc::now(),
        }
    }

    fn carried_forward(
        &self,
        items: &[ConsolidationLineItem],
        period: StatementPeriod,
    ) -> CarriedForward {
        preceding(period)
            .iter()
            .fold(CarriedForward::default(), |acc, earlier| {
                let totals = ConsolidationTotals::from_line_items(&slice_line_items(
                    items,
                    *earlier,
                    &self.split,
                ));
                let acquisitions = totals.total_acquisitions();
                CarriedForward {
                    cash: acc.cash + totals.net_result + totals.total_depreciation - acquisitions,
                    acquisitions: acc.acquisitions + acquisitions,
                    depreciation: acc.depreciation + totals.total_depreciation,
                }
            })
    }

    const fn title(statement_type: StatementType, format: StatementFormat) -> &'static str {
        match (statement_type, format) {
            (StatementType::Income, StatementFormat::Pcg) => "Compte de résultat",
            (StatementType::Income, StatementFormat::Ifrs) => "Statement of profit or loss",
            (StatementType::Balance, StatementFormat::Pcg) => "Bilan",
            (StatementType::Balance, StatementFormat::Ifrs) => "Statement of financial position",
            (StatementType::Cashflow, StatementFormat::Pcg) => "Tableau des flux de trésorerie",
            (StatementType::Cashflow, StatementFormat::Ifrs) => "Statement of cash flows",
        }
    }

    fn pcg_income(
        w: &mut LineWriter,
        items: &[ConsolidationLineItem],
        totals: &ConsolidationTotals,
    ) {
        w.header(0, "Produits d'exploitation");
        for (class, amount) in by_class(items, |i| {
            i.consolidation_category == ConsolidationCategory::Revenue
        }) {
            w.item(1, &pcg_class_caption(class), amount);
        }
        w.subtotal(0, "Total produits d'exploitation", totals.total_revenue);

        w.header(0, "Charges d'exploitation");
        for (class, amount) in by_class(items, |i| {
            matches!(
                i.consolidation_category,
                ConsolidationCategory::Personnel | ConsolidationCategory::Operating
            )
        }) {
            w.item(1, &pcg_class_caption(class), amount);
        }
        w.subtotal(
            0,
            "Total charges d'exploitation",
            totals.total_personnel_costs + totals.total_operating_costs,
        );
        w.subtotal(0, "Résultat d'exploitation", totals.operating_result);

        w.header(0, "Dotations aux amortissements");
        for (class, amount) in by_class(items, ConsolidationLineItem::is_depreciation) {
            w.item(1, &pcg_class_caption(class), amount);
        }
        w.subtotal(0, "Total dotations", totals.total_depreciation);

        w.grand_total("Résultat net", totals.net_result);
    }

    fn ifrs_income(w: &mut LineWriter, totals: &ConsolidationTotals) {
        w.item(0, "Revenue", totals.total_revenue);
        w.item(0, "Employee benefits expense", -totals.total_personnel_costs);
        w.item(0, "Other operating expenses", -totals.total_operating_costs);
        w.subtotal(0, "Operating profit", totals.operating_result);
        w.item(0, "Depreciation and amortisation", -totals.total_depreciation);
        w.grand_total("Profit for the period", totals.net_result);
    }

    fn position(&self, totals: &ConsolidationTotals, carried: CarriedForward) -> Position {
        let period_acquisitions = totals.total_acquisitions();
        let acquisitions = carried.acquisitions + period_acquisitions;
        let depreciation = carried.depreciation + totals.total_depreciation;
        let net_fixed = acquisitions - depreciation;
        let closing_cash = self.opening_cash + carried.cash + totals.net_result
            + totals.total_depreciation
            - period_acquisitions;
        let (cash, overdraft) = if closing_cash >= Decimal::ZERO {
            (closing_cash, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -closing_cash)
        };

        let total_assets = net_fixed + cash;
        let total_liabilities = overdraft;
        let total_equity = total_assets - total_liabilities;

        Position {
            acquisitions,
            depreciation,
            net_fixed,
            cash,
            overdraft,
            reserves: total_equity - totals.net_result,
            check: BalanceCheck {
                total_assets,
                total_liabilities,
                total_equity,
            },
        }
    }

    fn balance_sheet(
        &self,
        w: &mut LineWriter,
        format: StatementFormat,
        totals: &ConsolidationTotals,
        carried: CarriedForward,
    ) -> BalanceCheck {
        let c = match format {
            StatementFormat::Pcg => &PCG_BALANCE,
            StatementFormat::Ifrs => &IFRS_BALANCE,
        };
        let p = self.position(totals, carried);

        w.header(0, c.assets);
        w.header(1, c.fixed_assets);
        w.item(2, c.gross_fixed, p.acquisitions);
        w.item(2, c.accumulated_depreciation, -p.depreciation);
        w.subtotal(1, c.net_fixed, p.net_fixed);
        w.item(1, c.cash, p.cash);
        w.grand_total(c.total_assets, p.check.total_assets);

        w.header(0, c.equity_and_liabilities);
        w.header(1, c.equity);
        w.item(2, c.reserves, p.reserves);
        w.item(2, c.result, totals.net_result);
        w.subtotal(1, c.total_equity, p.check.total_equity);
        w.header(1, c.liabilities);
        w.item(2, c.overdraft, p.overdraft);
        w.subtotal(1, c.total_liabilities, p.check.total_liabilities);
        w.grand_total(
            c.total_equity_and_liabilities,
            p.check.total_liabilities + p.check.total_equity,
        );

        p.check
    }

    fn cash_flow(
        &self,
        w: &mut LineWriter,
        format: StatementFormat,
        totals: &ConsolidationTotals,
        carried: CarriedForward,
    ) {
        let c = match format {
            StatementFormat::Pcg => &PCG_CASHFLOW,
            StatementFormat::Ifrs => &IFRS_CASHFLOW,
        };
        let opening = self.opening_cash + carried.cash;
        let operating = totals.net_result + totals.total_depreciation;
        let investing = -totals.total_acquisitions();
        let net_change = operating + investing;

        w.header(0, c.operating);
        w.item(1, c.net_result, totals.net_result);
        w.item(1, c.depreciation, totals.total_depreciation);
        w.subtotal(0, c.net_operating, operating);
        w.header(0, c.investing);
        w.item(1, c.acquisitions, investing);
        w.subtotal(0, c.net_investing, investing);
        w.item(0, c.opening, opening);
        w.grand_total(c.net_change, net_change);
        w.subtotal(0, c.closing, opening + net_change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::ConsolidationEngine;
    use crate::planning::{PeriodAmounts, PlanningModule, PlanningRecord};
    use rust_decimal_macros::dec;
    use schoolplan_shared::types::VersionId;

    fn budget() -> ConsolidatedBudget {
        let pulled = vec![
            (
                PlanningModule::Revenue,
                vec![
                    PlanningRecord::financial("70610", "Frais de scolarité", dec!(1_000_000)),
                    PlanningRecord::financial("75800", "Cantine", dec!(50_000)),
                ],
            ),
            (
                PlanningModule::Dhg,
                vec![PlanningRecord::financial("64110", "Salaires enseignants", dec!(600_000))],
            ),
            (
                PlanningModule::Costs,
                vec![
                    PlanningRecord::financial("61320", "Loyers", dec!(120_000)).with_periods(
                        PeriodAmounts {
                            t1: dec!(40_000),
                            t2: dec!(40_000),
                            t3: dec!(40_000),
                        },
                    ),
                    PlanningRecord::financial("60610", "Électricité", dec!(30_000)),
                ],
            ),
            (
                PlanningModule::Capex,
                vec![
                    PlanningRecord::financial("21830", "Matériel informatique", dec!(90_000))
                        .with_useful_life(3),
                ],
            ),
        ];
        let version_id = VersionId::new();
        let output = ConsolidationEngine::default()
            .consolidate(version_id, &pulled)
            .unwrap();
        ConsolidatedBudget {
            version_id,
            is_complete: output.status.is_complete,
            fingerprint: output.fingerprint,
            consolidated_at: Utc::now(),
            line_items: output.line_items,
            totals: output.totals,
        }
    }

    #[test]
    fn test_pcg_income_groups_by_class() {
        let budget = budget();
        let st = StatementBuilder::default().build(
            &budget,
            StatementType::Income,
            StatementFormat::Pcg,
            StatementPeriod::Annual,
        );
        assert_eq!(
            st.line("70 Ventes de prestations").unwrap().amount,
            Some(dec!(1_000_000))
        );
        assert_eq!(
            st.line("64 Charges de personnel").unwrap().amount,
            Some(dec!(600_000))
        );
        // 1_050_000 - 600_000 - 150_000
        assert_eq!(
            st.line("Résultat d'exploitation").unwrap().amount,
            Some(dec!(300_000))
        );
        assert_eq!(
            st.line("68 Dotations aux amortissements").unwrap().amount,
            Some(dec!(30_000))
        );
        let net = st.lines.last().unwrap();
        assert_eq!(net.description, "Résultat net");
        assert_eq!(net.amount, Some(dec!(270_000)));
        assert!(net.is_total && net.is_underlined);
        // Acquisitions are capitalised, not charged.
        assert!(st.line("21 Immobilisations corporelles").is_none());
    }

    #[test]
    fn test_pcg_and_ifrs_agree_on_net_result() {
        let budget = budget();
        let builder = StatementBuilder::default();
        for period in [
            StatementPeriod::Annual,
            StatementPeriod::T1,
            StatementPeriod::T2,
            StatementPeriod::T3,
        ] {
            let pcg = builder.build(&budget, StatementType::Income, StatementFormat::Pcg, period);
            let ifrs = builder.build(&budget, StatementType::Income, StatementFormat::Ifrs, period);
            assert_eq!(pcg.net_result, ifrs.net_result);
            assert_eq!(
                ifrs.line("Profit for the period").unwrap().amount,
                Some(pcg.net_result)
            );
        }
    }

    #[test]
    fn test_periods_add_up_to_annual() {
        let budget = budget();
        let builder = StatementBuilder::default();
        let net = |period| {
            builder
                .build(&budget, StatementType::Income, StatementFormat::Ifrs, period)
                .net_result
        };
        assert_eq!(
            net(StatementPeriod::T1) + net(StatementPeriod::T2) + net(StatementPeriod::T3),
            net(StatementPeriod::Annual)
        );
    }

    #[test]
    fn test_module_breakdown_used_for_period() {
        let budget = budget();
        let st = StatementBuilder::default().build(
            &budget,
            StatementType::Income,
            StatementFormat::Pcg,
            StatementPeriod::T1,
        );
        // Rent carries its own 40k/40k/40k breakdown; electricity is split 40%.
        assert_eq!(
            st.line("61 Services extérieurs").unwrap().amount,
            Some(dec!(40_000))
        );
        assert_eq!(st.line("60 Achats").unwrap().amount, Some(dec!(12_000)));
    }

    #[test]
    fn test_balance_sheet_balances() {
        let budget = budget();
        for opening in [dec!(0), dec!(250_000), dec!(-400_000)] {
            let st = StatementBuilder::default().with_opening_cash(opening).build(
                &budget,
                StatementType::Balance,
                StatementFormat::Pcg,
                StatementPeriod::Annual,
            );
            let check = st.balance_check.unwrap();
            assert_eq!(check.difference(), Decimal::ZERO);
            assert_eq!(
                st.line("Total actif").unwrap().amount,
                st.line("Total passif").unwrap().amount
            );
        }
    }

    #[test]
    fn test_negative_cash_is_overdraft() {
        let budget = budget();
        let st = StatementBuilder::default()
            .with_opening_cash(dec!(-1_000_000))
            .build(
                &budget,
                StatementType::Balance,
                StatementFormat::Ifrs,
                StatementPeriod::Annual,
            );
        // -1_000_000 + 270_000 + 30_000 - 90_000
        assert_eq!(
            st.line("Bank overdrafts").unwrap().amount,
            Some(dec!(790_000))
        );
        assert_eq!(
            st.line("Cash and cash equivalents").unwrap().amount,
            Some(dec!(0))
        );
        assert_eq!(st.balance_check.unwrap().difference(), Decimal::ZERO);
    }

    #[test]
    fn test_cash_flow_closing_matches_balance_sheet_cash() {
        let budget = budget();
        let builder = StatementBuilder::default().with_opening_cash(dec!(100_000));
        let cf = builder.build(
            &budget,
            StatementType::Cashflow,
            StatementFormat::Ifrs,
            StatementPeriod::Annual,
        );
        let bs = builder.build(
            &budget,
            StatementType::Balance,
            StatementFormat::Ifrs,
            StatementPeriod::Annual,
        );
        assert_eq!(
            cf.line("Net cash from operating activities").unwrap().amount,
            Some(dec!(300_000))
        );
        assert_eq!(
            cf.line("Cash at end of period").unwrap().amount,
            bs.line("Cash and cash equivalents").unwrap().amount
        );
    }

    #[test]
    fn test_trimesters_chain_cash_and_fixed_assets() {
        let budget = budget();
        let builder = StatementBuilder::default().with_opening_cash(dec!(100_000));
        let amount = |statement_type, period, caption: &str| {
            builder
                .build(&budget, statement_type, StatementFormat::Ifrs, period)
                .line(caption)
                .and_then(|l| l.amount)
                .unwrap()
        };
        let opening = |period| amount(StatementType::Cashflow, period, "Cash at beginning of period");
        let closing = |period| amount(StatementType::Cashflow, period, "Cash at end of period");

        assert_eq!(opening(StatementPeriod::T1), dec!(100_000));
        assert_eq!(opening(StatementPeriod::T2), closing(StatementPeriod::T1));
        assert_eq!(opening(StatementPeriod::T3), closing(StatementPeriod::T2));
        assert_eq!(closing(StatementPeriod::T3), closing(StatementPeriod::Annual));

        let net_fixed = "Property, plant and equipment, net";
        assert_eq!(
            amount(StatementType::Balance, StatementPeriod::T3, net_fixed),
            amount(StatementType::Balance, StatementPeriod::Annual, net_fixed)
        );
        for period in [StatementPeriod::T1, StatementPeriod::T2, StatementPeriod::T3] {
            let st = builder.build(&budget, StatementType::Balance, StatementFormat::Ifrs, period);
            assert_eq!(st.balance_check.unwrap().difference(), Decimal::ZERO);
        }
    }

    #[test]
    fn test_empty_budget_renders_zeros() {
        let budget = ConsolidatedBudget {
            version_id: VersionId::new(),
            is_complete: false,
            fingerprint: String::new(),
            consolidated_at: Utc::now(),
            line_items: Vec::new(),
            totals: ConsolidationTotals::default(),
        };
        let st = StatementBuilder::default().build(
            &budget,
            StatementType::Balance,
            StatementFormat::Pcg,
            StatementPeriod::T2,
        );
        assert_eq!(st.net_result, Decimal::ZERO);
        assert_eq!(st.balance_check.unwrap().total_assets, Decimal::ZERO);
    }

    #[test]
    fn test_line_numbers_are_sequential() {
        let st = StatementBuilder::default().build(
            &budget(),
            StatementType::Cashflow,
            StatementFormat::Pcg,
            StatementPeriod::Annual,
        );
        for (i, line) in st.lines.iter().enumerate() {
            assert_eq!(line.line_number as usize, i + 1);
        }
        assert!(st.title.starts_with("Tableau des flux"));
    }
}
