//! Multi-year cohort projection.
//!
//! Each grade is projected independently from its own base headcount, so
//! grades run in parallel. Year N+1 starts from year N's projected count.

use std::collections::HashMap;

use chrono::Utc;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::ToPrimitive;

use schoolplan_shared::types::{LevelId, VersionId};

use crate::projection::cascade::{OverrideCascade, validate_overrides};
use crate::projection::error::ProjectionError;
use crate::projection::types::{
    BaseEnrollment, GradeCatalog, GradeLevel, GradeProjection, OverrideSet, ProjectionResults,
    ResolvedParameters, YearSummary,
};
use crate::projection::MAX_HORIZON_YEARS;

/// Outcome of projecting one grade for one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortStep {
    /// `round(base × retention)`, half away from zero.
    pub retained: u32,
    /// Retained plus lateral.
    pub demand: u32,
    /// Seats available.
    pub capacity: u32,
    /// `min(demand, capacity)`.
    pub projected: u32,
    /// `max(0, demand - capacity)`.
    pub unmet_demand: u32,
    /// `ceil(projected / ceiling)`.
    pub divisions: u32,
}

/// Students retained from `count` at `rate`.
#[must_use]
pub fn retained(count: u32, rate: Decimal) -> u32 {
    (Decimal::from(count) * rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(u32::MAX)
}

/// Enrollment projection engine.
pub struct ProjectionEngine;

impl ProjectionEngine {
    /// Projects one grade for one year.
    #[must_use]
    pub fn step(base_count: u32, params: &ResolvedParameters) -> CohortStep {
        let retained = retained(base_count, params.retention_rate);
        let demand = retained.saturating_add(params.lateral_entry);
        let capacity = params.capacity();
        let projected = demand.min(capacity);
        CohortStep {
            retained,
            demand,
            capacity,
            projected,
            unmet_demand: demand.saturating_sub(capacity),
            divisions: projected.div_ceil(params.class_size_ceiling.max(1)),
        }
    }

    fn project_grade(
        level: &GradeLevel,
        base_count: u32,
        cascade: &OverrideCascade<'_>,
        horizon: u8,
    ) -> Result<Vec<GradeProjection>, ProjectionError> {
        let params = cascade.resolve_parameters(level.id)?;
        let cycle_id = level
            .cycle_id
            .ok_or(ProjectionError::UnmappedGrade(level.id))?;

        let mut rows = Vec::with_capacity(usize::from(horizon));
        let mut count = base_count;
        for year_offset in 1..=horizon {
            let step = Self::step(count, &params);
            let warning = (step.unmet_demand > 0).then(|| {
                format!(
                    "{}: demand of {} exceeds capacity of {} ({} x {}); {} students unplaced",
                    level.code,
                    step.demand,
                    step.capacity,
                    params.class_size_ceiling,
                    params.max_divisions,
                    step.unmet_demand
                )
            });
            rows.push(GradeProjection {
                level_id: level.id,
                level_code: level.code.clone(),
                cycle_id,
                year_offset,
                base_count: count,
                retained: step.retained,
                lateral_entry: params.lateral_entry,
                demand: step.demand,
                capacity: step.capacity,
                projected: step.projected,
                unmet_demand: step.unmet_demand,
                divisions: step.divisions,
                parameters: params,
                warning,
            });
            count = step.projected;
        }
        Ok(rows)
    }

    /// Projects every grade of the catalogue over `horizon` years.
    ///
    /// Grades without a base row start from zero.
    ///
    /// # Errors
    ///
    /// - `InvalidHorizon` outside `1..=MAX_HORIZON_YEARS`
    /// - `InvalidOverride`, `UnknownGrade`, `UnknownCycle` from override validation
    /// - `UnknownGrade` for a base row outside the catalogue
    /// - `UnmappedGrade` / `UnknownCycle` for a grade with a missing or dangling cycle
    pub fn calculate(
        version_id: VersionId,
        catalog: &GradeCatalog,
        base: &[BaseEnrollment],
        overrides: &OverrideSet,
        horizon: u8,
    ) -> Result<ProjectionResults, ProjectionError> {
        if !(1..=MAX_HORIZON_YEARS).contains(&horizon) {
            return Err(ProjectionError::InvalidHorizon {
                got: horizon,
                max: MAX_HORIZON_YEARS,
            });
        }
        validate_overrides(overrides, catalog)?;

        let mut base_counts: HashMap<LevelId, u32> = HashMap::with_capacity(base.len());
        for row in base {
            if catalog.level(row.level_id).is_none() {
                return Err(ProjectionError::UnknownGrade(row.level_id));
            }
            base_counts.insert(row.level_id, row.student_count);
        }

        let levels = catalog.ordered_levels();
        for level in &levels {
            if let Some(cycle) = level.cycle_id
                && !catalog.has_cycle(cycle)
            {
                return Err(ProjectionError::UnknownCycle(cycle));
            }
        }

        let cascade = OverrideCascade::new(catalog, overrides);
        let per_grade = levels
            .par_iter()
            .map(|level| {
                let base_count = base_counts.get(&level.id).copied().unwrap_or(0);
                Self::project_grade(level, base_count, &cascade, horizon)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut grades: Vec<GradeProjection> = Vec::with_capacity(levels.len() * usize::from(horizon));
        let mut years = Vec::with_capacity(usize::from(horizon));
        for year_offset in 1..=horizon {
            let mut summary = YearSummary {
                year_offset,
                projected: 0,
                unmet_demand: 0,
                divisions: 0,
            };
            for rows in &per_grade {
                let row = &rows[usize::from(year_offset - 1)];
                summary.projected += row.projected;
                summary.unmet_demand += row.unmet_demand;
                summary.divisions += row.divisions;
                grades.push(row.clone());
            }
            years.push(summary);
        }

        Ok(ProjectionResults {
            version_id,
            horizon_years: horizon,
            grades,
            years,
            calculated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::types::{Cycle, FieldOverrides, LevelOverride};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use schoolplan_shared::types::CycleId;

    fn one_grade() -> (GradeCatalog, CycleId, LevelId) {
        let cycle = CycleId::new();
        let level = LevelId::new();
        let catalog = GradeCatalog {
            cycles: vec![Cycle {
                id: cycle,
                code: "COL".into(),
                name: "Collège".into(),
                sort_order: 1,
            }],
            levels: vec![GradeLevel {
                id: level,
                code: "6EME".into(),
                name: "Sixième".into(),
                cycle_id: Some(cycle),
                sort_order: 1,
            }],
        };
        (catalog, cycle, level)
    }

    fn scenario_overrides(level: LevelId) -> OverrideSet {
        let mut overrides = OverrideSet::default();
        overrides.grade_overrides.insert(
            level,
            FieldOverrides {
                retention_rate: Some(dec!(0.9)),
                lateral_entry: Some(5),
                class_size_ceiling: Some(25),
                max_divisions: Some(2),
            },
        );
        overrides
    }

    #[test]
    fn test_demand_within_capacity() {
        let (catalog, _, level) = one_grade();
        let base = [BaseEnrollment {
            level_id: level,
            student_count: 40,
        }];
        let results = ProjectionEngine::calculate(
            VersionId::new(),
            &catalog,
            &base,
            &scenario_overrides(level),
            1,
        )
        .unwrap();

        let row = results.grade(level, 1).unwrap();
        assert_eq!(row.retained, 36);
        assert_eq!(row.demand, 41);
        assert_eq!(row.capacity, 50);
        assert_eq!(row.projected, 41);
        assert_eq!(row.unmet_demand, 0);
        assert_eq!(row.divisions, 2);
        assert!(row.warning.is_none());
    }

    #[test]
    fn test_demand_above_capacity_reports_unmet() {
        let (catalog, _, level) = one_grade();
        let base = [BaseEnrollment {
            level_id: level,
            student_count: 60,
        }];
        let results = ProjectionEngine::calculate(
            VersionId::new(),
            &catalog,
            &base,
            &scenario_overrides(level),
            1,
        )
        .unwrap();

        let row = results.grade(level, 1).unwrap();
        assert_eq!(row.retained, 54);
        assert_eq!(row.demand, 59);
        assert_eq!(row.projected, 50);
        assert_eq!(row.unmet_demand, 9);
        assert_eq!(row.divisions, 2);
        let warning = row.warning.as_deref().unwrap();
        assert!(warning.contains("6EME"));
        assert!(warning.contains("9 students unplaced"));
        assert_eq!(results.total_unmet_demand(), 9);
    }

    #[rstest]
    #[case(10, dec!(0.95), 10)] // 9.5 rounds away from zero
    #[case(30, dec!(0.95), 29)] // 28.5
    #[case(7, dec!(0.5), 4)] // 3.5
    #[case(40, dec!(1.1), 44)]
    #[case(0, dec!(0.9), 0)]
    fn test_retained_rounding(#[case] count: u32, #[case] rate: Decimal, #[case] expected: u32) {
        assert_eq!(retained(count, rate), expected);
    }

    #[test]
    fn test_multi_year_chains_projected_counts() {
        let (catalog, _, level) = one_grade();
        let base = [BaseEnrollment {
            level_id: level,
            student_count: 60,
        }];
        let results = ProjectionEngine::calculate(
            VersionId::new(),
            &catalog,
            &base,
            &scenario_overrides(level),
            3,
        )
        .unwrap();

        assert_eq!(results.years.len(), 3);
        let y1 = results.grade(level, 1).unwrap();
        let y2 = results.grade(level, 2).unwrap();
        assert_eq!(y2.base_count, y1.projected);
        // 50 × 0.9 = 45, + 5 = 50
        assert_eq!(y2.projected, 50);
        assert_eq!(y2.unmet_demand, 0);
    }

    #[test]
    fn test_cycle_override_applies_to_grade() {
        let (catalog, cycle, level) = one_grade();
        let mut overrides = OverrideSet::default();
        overrides.level_overrides.insert(
            cycle,
            LevelOverride {
                class_size_ceiling: Some(20),
                max_divisions: Some(1),
            },
        );
        let base = [BaseEnrollment {
            level_id: level,
            student_count: 30,
        }];
        let results =
            ProjectionEngine::calculate(VersionId::new(), &catalog, &base, &overrides, 1).unwrap();
        let row = results.grade(level, 1).unwrap();
        // 30 × 0.95 = 28.5 → 29, capacity 20
        assert_eq!(row.capacity, 20);
        assert_eq!(row.projected, 20);
        assert_eq!(row.unmet_demand, 9);
        assert_eq!(row.divisions, 1);
    }

    #[test]
    fn test_grade_without_base_row_starts_at_zero() {
        let (catalog, _, level) = one_grade();
        let results = ProjectionEngine::calculate(
            VersionId::new(),
            &catalog,
            &[],
            &OverrideSet::default(),
            1,
        )
        .unwrap();
        let row = results.grade(level, 1).unwrap();
        assert_eq!(row.projected, 0);
        assert_eq!(row.divisions, 0);
    }

    #[test]
    fn test_configuration_errors() {
        let (mut catalog, _, level) = one_grade();
        let base = [BaseEnrollment {
            level_id: LevelId::new(),
            student_count: 10,
        }];
        assert!(matches!(
            ProjectionEngine::calculate(VersionId::new(), &catalog, &base, &OverrideSet::default(), 1),
            Err(ProjectionError::UnknownGrade(_))
        ));

        catalog.levels[0].cycle_id = None;
        assert!(matches!(
            ProjectionEngine::calculate(VersionId::new(), &catalog, &[], &OverrideSet::default(), 1),
            Err(ProjectionError::UnmappedGrade(id)) if id == level
        ));

        catalog.levels[0].cycle_id = Some(CycleId::new());
        assert!(matches!(
            ProjectionEngine::calculate(VersionId::new(), &catalog, &[], &OverrideSet::default(), 1),
            Err(ProjectionError::UnknownCycle(_))
        ));
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    fn test_horizon_bounds(#[case] horizon: u8) {
        let (catalog, _, _) = one_grade();
        assert!(matches!(
            ProjectionEngine::calculate(
                VersionId::new(),
                &catalog,
                &[],
                &OverrideSet::default(),
                horizon
            ),
            Err(ProjectionError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_year_summary_sums_grades() {
        let (mut catalog, cycle, level) = one_grade();
        let other = LevelId::new();
        catalog.levels.push(GradeLevel {
            id: other,
            code: "5EME".into(),
            name: "Cinquième".into(),
            cycle_id: Some(cycle),
            sort_order: 2,
        });
        let base = [
            BaseEnrollment {
                level_id: level,
                student_count: 40,
            },
            BaseEnrollment {
                level_id: other,
                student_count: 20,
            },
        ];
        let results =
            ProjectionEngine::calculate(VersionId::new(), &catalog, &base, &OverrideSet::default(), 1)
                .unwrap();
        // 40 × 0.95 = 38, 20 × 0.95 = 19
        assert_eq!(results.years[0].projected, 57);
        assert_eq!(results.years[0].divisions, 2 + 1);
        assert_eq!(results.grades[0].level_code, "6EME");
        assert_eq!(results.grades[1].level_code, "5EME");
    }
}
