//! `SeaORM` Entity for planning_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "planning_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub version_id: Uuid,
    pub module: String,
    pub position: i32,
    pub account_code: Option<String>,
    pub account_name: String,
    pub category: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount_sar: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))", nullable)]
    pub amount_t1: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))", nullable)]
    pub amount_t2: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))", nullable)]
    pub amount_t3: Option<Decimal>,
    pub useful_life_years: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_versions::Entity",
        from = "Column::VersionId",
        to = "super::budget_versions::Column::Id",
        on_delete = "Cascade"
    )]
    BudgetVersions,
}

impl Related<super::budget_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetVersions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
