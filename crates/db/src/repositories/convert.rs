//! Row ↔ domain conversions.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::Set;
use uuid::Uuid;

use schoolplan_core::consolidation::{ConsolidationCategory, ConsolidationLineItem};
use schoolplan_core::error::StoreError;
use schoolplan_core::planning::{PeriodAmounts, PlanningModule, PlanningRecord};
use schoolplan_core::version::{BudgetVersion, ScenarioType};
use schoolplan_core::workflow::VersionStatus;
use schoolplan_shared::types::VersionId;

use crate::entities::{budget_versions, consolidation_line_items, planning_records};

pub(crate) fn utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

pub(crate) fn to_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn to_u32(n: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(n).map_err(|_| StoreError::Corrupt(format!("negative {column}: {n}")))
}

fn periods(t1: Option<Decimal>, t2: Option<Decimal>, t3: Option<Decimal>) -> Option<PeriodAmounts> {
    Some(PeriodAmounts {
        t1: t1?,
        t2: t2?,
        t3: t3?,
    })
}

fn split_periods(p: Option<PeriodAmounts>) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    p.map_or((None, None, None), |p| (Some(p.t1), Some(p.t2), Some(p.t3)))
}

pub(crate) fn parse_status(s: &str) -> Result<VersionStatus, StoreError> {
    VersionStatus::parse(s).ok_or_else(|| StoreError::Corrupt(format!("unknown status {s}")))
}

pub(crate) fn parse_module(s: &str) -> Result<PlanningModule, StoreError> {
    PlanningModule::parse(s).ok_or_else(|| StoreError::Corrupt(format!("unknown module {s}")))
}

fn parse_category(s: &str) -> Result<ConsolidationCategory, StoreError> {
    ConsolidationCategory::parse(s)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown category {s}")))
}

pub(crate) fn version_from_model(m: budget_versions::Model) -> Result<BudgetVersion, StoreError> {
    Ok(BudgetVersion {
        id: VersionId::from_uuid(m.id),
        status: parse_status(&m.status)?,
        scenario_type: ScenarioType::parse(&m.scenario_type).ok_or_else(|| {
            StoreError::Corrupt(format!("unknown scenario type {}", m.scenario_type))
        })?,
        name: m.name,
        fiscal_year: m.fiscal_year,
        academic_year: m.academic_year,
        notes: m.notes,
        is_active: m.is_active,
        cloned_from: m.cloned_from.map(VersionId::from_uuid),
        submitted_at: m.submitted_at.map(utc),
        approved_at: m.approved_at.map(utc),
        rejected_at: m.rejected_at.map(utc),
        rejection_reason: m.rejection_reason,
        superseded_by: m.superseded_by.map(VersionId::from_uuid),
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    })
}

pub(crate) fn version_to_active(v: &BudgetVersion) -> budget_versions::ActiveModel {
    budget_versions::ActiveModel {
        id: Set(v.id.into_inner()),
        name: Set(v.name.clone()),
        fiscal_year: Set(v.fiscal_year),
        academic_year: Set(v.academic_year.clone()),
        status: Set(v.status.as_str().to_string()),
        scenario_type: Set(v.scenario_type.as_str().to_string()),
        notes: Set(v.notes.clone()),
        is_active: Set(v.is_active),
        cloned_from: Set(v.cloned_from.map(VersionId::into_inner)),
        submitted_at: Set(v.submitted_at.map(Into::into)),
        approved_at: Set(v.approved_at.map(Into::into)),
        rejected_at: Set(v.rejected_at.map(Into::into)),
        rejection_reason: Set(v.rejection_reason.clone()),
        superseded_by: Set(v.superseded_by.map(VersionId::into_inner)),
        created_at: Set(v.created_at.into()),
        updated_at: Set(v.updated_at.into()),
    }
}

pub(crate) fn record_from_model(m: planning_records::Model) -> Result<PlanningRecord, StoreError> {
    Ok(PlanningRecord {
        category: m.category.as_deref().map(parse_category).transpose()?,
        period_amounts: periods(m.amount_t1, m.amount_t2, m.amount_t3),
        useful_life_years: m
            .useful_life_years
            .map(|y| to_u32(y, "useful_life_years"))
            .transpose()?,
        account_code: m.account_code,
        account_name: m.account_name,
        amount_sar: m.amount_sar,
        notes: m.notes,
    })
}

pub(crate) fn record_to_active(
    version_id: VersionId,
    module: PlanningModule,
    position: u32,
    r: &PlanningRecord,
) -> planning_records::ActiveModel {
    let (t1, t2, t3) = split_periods(r.period_amounts);
    planning_records::ActiveModel {
        id: Set(Uuid::now_v7()),
        version_id: Set(version_id.into_inner()),
        module: Set(module.as_str().to_string()),
        position: Set(to_i32(position)),
        account_code: Set(r.account_code.clone()),
        account_name: Set(r.account_name.clone()),
        category: Set(r.category.map(|c| c.as_str().to_string())),
        amount_sar: Set(r.amount_sar),
        amount_t1: Set(t1),
        amount_t2: Set(t2),
        amount_t3: Set(t3),
        useful_life_years: Set(r.useful_life_years.map(to_i32)),
        notes: Set(r.notes.clone()),
    }
}

pub(crate) fn line_item_from_model(
    m: consolidation_line_items::Model,
) -> Result<ConsolidationLineItem, StoreError> {
    Ok(ConsolidationLineItem {
        consolidation_category: parse_category(&m.consolidation_category)?,
        period_amounts: periods(m.amount_t1, m.amount_t2, m.amount_t3),
        source_module: parse_module(&m.source_module)?,
        source_count: to_u32(m.source_count, "source_count")?,
        account_code: m.account_code,
        account_name: m.account_name,
        is_revenue: m.is_revenue,
        affects_result: m.affects_result,
        amount_sar: m.amount_sar,
        source_table: m.source_table,
        is_calculated: m.is_calculated,
        notes: m.notes,
    })
}

pub(crate) fn line_item_to_active(
    version_id: VersionId,
    position: u32,
    item: &ConsolidationLineItem,
) -> consolidation_line_items::ActiveModel {
    let (t1, t2, t3) = split_periods(item.period_amounts);
    consolidation_line_items::ActiveModel {
        id: Set(Uuid::now_v7()),
        version_id: Set(version_id.into_inner()),
        position: Set(to_i32(position)),
        account_code: Set(item.account_code.clone()),
        account_name: Set(item.account_name.clone()),
        consolidation_category: Set(item.consolidation_category.as_str().to_string()),
        is_revenue: Set(item.is_revenue),
        affects_result: Set(item.affects_result),
        amount_sar: Set(item.amount_sar),
        amount_t1: Set(t1),
        amount_t2: Set(t2),
        amount_t3: Set(t3),
        source_table: Set(item.source_table.clone()),
        source_module: Set(item.source_module.as_str().to_string()),
        source_count: Set(to_i32(item.source_count)),
        is_calculated: Set(item.is_calculated),
        notes: Set(item.notes.clone()),
    }
}
