//! `SeaORM` Entity for budget_versions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub fiscal_year: i32,
    pub academic_year: String,
    pub status: String,
    pub scenario_type: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub is_active: bool,
    pub cloned_from: Option<Uuid>,
    pub submitted_at: Option<DateTimeWithTimeZone>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    pub superseded_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::planning_records::Entity")]
    PlanningRecords,
    #[sea_orm(has_many = "super::consolidation_line_items::Entity")]
    ConsolidationLineItems,
}

impl Related<super::planning_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlanningRecords.def()
    }
}

impl Related<super::consolidation_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsolidationLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
