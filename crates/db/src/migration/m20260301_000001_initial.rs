//! Initial database migration.
//!
//! Creates the budget version, planning record, consolidation and
//! enrollment projection tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: BUDGET VERSIONS
        // ============================================================
        db.execute_unprepared(BUDGET_VERSIONS_SQL).await?;

        // ============================================================
        // PART 2: PLANNING MODULE RECORDS
        // ============================================================
        db.execute_unprepared(PLANNING_RECORDS_SQL).await?;

        // ============================================================
        // PART 3: CONSOLIDATION
        // ============================================================
        db.execute_unprepared(CONSOLIDATION_RUNS_SQL).await?;
        db.execute_unprepared(CONSOLIDATION_LINE_ITEMS_SQL).await?;

        // ============================================================
        // PART 4: GRADE CATALOGUE
        // ============================================================
        db.execute_unprepared(SCHOOL_CYCLES_SQL).await?;
        db.execute_unprepared(SCHOOL_GRADES_SQL).await?;
        db.execute_unprepared(BASE_ENROLLMENTS_SQL).await?;

        // ============================================================
        // PART 5: ENROLLMENT PROJECTION
        // ============================================================
        db.execute_unprepared(PROJECTION_CONFIGS_SQL).await?;
        db.execute_unprepared(PROJECTION_RESULTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const BUDGET_VERSIONS_SQL: &str = r"
CREATE TABLE budget_versions (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    fiscal_year INTEGER NOT NULL,
    academic_year VARCHAR(32) NOT NULL,
    status VARCHAR(16) NOT NULL DEFAULT 'WORKING'
        CHECK (status IN ('WORKING', 'SUBMITTED', 'APPROVED', 'REJECTED', 'SUPERSEDED')),
    scenario_type VARCHAR(16) NOT NULL DEFAULT 'BUDGET'
        CHECK (scenario_type IN ('BUDGET', 'FORECAST', 'STRATEGIC', 'WHAT_IF')),
    notes TEXT,
    is_active BOOLEAN NOT NULL DEFAULT false,
    cloned_from UUID REFERENCES budget_versions(id) ON DELETE SET NULL,
    submitted_at TIMESTAMPTZ,
    approved_at TIMESTAMPTZ,
    rejected_at TIMESTAMPTZ,
    rejection_reason TEXT,
    superseded_by UUID REFERENCES budget_versions(id) ON DELETE SET NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_budget_versions_year ON budget_versions(fiscal_year, created_at DESC);
CREATE UNIQUE INDEX idx_budget_versions_one_active
    ON budget_versions(fiscal_year) WHERE is_active;
";

const PLANNING_RECORDS_SQL: &str = r"
CREATE TABLE planning_records (
    id UUID PRIMARY KEY,
    version_id UUID NOT NULL REFERENCES budget_versions(id) ON DELETE CASCADE,
    module VARCHAR(32) NOT NULL
        CHECK (module IN ('enrollment', 'class_structure', 'dhg', 'revenue', 'costs', 'capex')),
    position INTEGER NOT NULL,
    account_code VARCHAR(16),
    account_name VARCHAR(255) NOT NULL,
    category VARCHAR(16),
    amount_sar NUMERIC(19, 2) NOT NULL DEFAULT 0,
    amount_t1 NUMERIC(19, 2),
    amount_t2 NUMERIC(19, 2),
    amount_t3 NUMERIC(19, 2),
    useful_life_years INTEGER CHECK (useful_life_years IS NULL OR useful_life_years > 0),
    notes TEXT,
    CHECK ((amount_t1 IS NULL) = (amount_t2 IS NULL) AND (amount_t2 IS NULL) = (amount_t3 IS NULL))
);

CREATE INDEX idx_planning_records_version_module
    ON planning_records(version_id, module, position);
";

const CONSOLIDATION_RUNS_SQL: &str = r"
CREATE TABLE consolidation_runs (
    version_id UUID PRIMARY KEY REFERENCES budget_versions(id) ON DELETE CASCADE,
    fingerprint CHAR(64) NOT NULL,
    is_complete BOOLEAN NOT NULL,
    line_item_count INTEGER NOT NULL,
    consolidated_at TIMESTAMPTZ NOT NULL
);
";

const CONSOLIDATION_LINE_ITEMS_SQL: &str = r"
CREATE TABLE consolidation_line_items (
    id UUID PRIMARY KEY,
    version_id UUID NOT NULL REFERENCES budget_versions(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    account_code VARCHAR(16) NOT NULL,
    account_name VARCHAR(255) NOT NULL,
    consolidation_category VARCHAR(16) NOT NULL
        CHECK (consolidation_category IN ('REVENUE', 'PERSONNEL', 'OPERATING', 'CAPEX')),
    is_revenue BOOLEAN NOT NULL,
    affects_result BOOLEAN NOT NULL,
    amount_sar NUMERIC(19, 2) NOT NULL,
    amount_t1 NUMERIC(19, 2),
    amount_t2 NUMERIC(19, 2),
    amount_t3 NUMERIC(19, 2),
    source_table VARCHAR(64) NOT NULL,
    source_module VARCHAR(32) NOT NULL,
    source_count INTEGER NOT NULL,
    is_calculated BOOLEAN NOT NULL DEFAULT false,
    notes TEXT,
    UNIQUE (version_id, position)
);

CREATE INDEX idx_consolidation_line_items_version ON consolidation_line_items(version_id);
";

const SCHOOL_CYCLES_SQL: &str = r"
CREATE TABLE school_cycles (
    version_id UUID NOT NULL REFERENCES budget_versions(id) ON DELETE CASCADE,
    id UUID NOT NULL,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    sort_order INTEGER NOT NULL,
    PRIMARY KEY (version_id, id),
    UNIQUE (version_id, code)
);
";

const SCHOOL_GRADES_SQL: &str = r"
CREATE TABLE school_grades (
    version_id UUID NOT NULL REFERENCES budget_versions(id) ON DELETE CASCADE,
    id UUID NOT NULL,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    cycle_id UUID,
    sort_order INTEGER NOT NULL,
    PRIMARY KEY (version_id, id),
    UNIQUE (version_id, code)
);
";

const BASE_ENROLLMENTS_SQL: &str = r"
CREATE TABLE base_enrollments (
    version_id UUID NOT NULL REFERENCES budget_versions(id) ON DELETE CASCADE,
    level_id UUID NOT NULL,
    student_count INTEGER NOT NULL CHECK (student_count >= 0),
    PRIMARY KEY (version_id, level_id)
);
";

const PROJECTION_CONFIGS_SQL: &str = r"
CREATE TABLE projection_configs (
    version_id UUID PRIMARY KEY REFERENCES budget_versions(id) ON DELETE CASCADE,
    overrides JSONB NOT NULL DEFAULT '{}',
    horizon_years SMALLINT NOT NULL DEFAULT 1 CHECK (horizon_years BETWEEN 1 AND 5),
    validated BOOLEAN NOT NULL DEFAULT false,
    validated_at TIMESTAMPTZ,
    stale_modules JSONB NOT NULL DEFAULT '[]',
    draft JSONB,
    draft_saved_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const PROJECTION_RESULTS_SQL: &str = r"
CREATE TABLE projection_results (
    version_id UUID PRIMARY KEY REFERENCES budget_versions(id) ON DELETE CASCADE,
    results JSONB NOT NULL,
    calculated_at TIMESTAMPTZ NOT NULL
);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS projection_results;
DROP TABLE IF EXISTS projection_configs;
DROP TABLE IF EXISTS base_enrollments;
DROP TABLE IF EXISTS school_grades;
DROP TABLE IF EXISTS school_cycles;
DROP TABLE IF EXISTS consolidation_line_items;
DROP TABLE IF EXISTS consolidation_runs;
DROP TABLE IF EXISTS planning_records;
DROP TABLE IF EXISTS budget_versions;
";
