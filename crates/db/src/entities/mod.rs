//! `SeaORM` entity definitions.
//!
//! Status-like columns are stored as text and parsed by the repositories.

pub mod base_enrollments;
pub mod budget_versions;
pub mod consolidation_line_items;
pub mod consolidation_runs;
pub mod planning_records;
pub mod projection_configs;
pub mod projection_results;
pub mod school_cycles;
pub mod school_grades;
