//! Lateral-entry recommendations against division capacity.

use schoolplan_shared::types::LevelId;

use crate::projection::cascade::OverrideCascade;
use crate::projection::engine::retained;
use crate::projection::error::ProjectionError;
use crate::projection::types::{BaseEnrollment, GradeCatalog, LateralOptimization, OverrideSet};

/// Computes, for each grade, how many lateral entries fit.
///
/// Two figures are offered: the seats left up to full capacity, and the
/// seats left in divisions the retained students already open.
///
/// # Errors
///
/// Cascade resolution errors for unmapped or unknown grades.
pub fn optimize_lateral_entry(
    catalog: &GradeCatalog,
    base: &[BaseEnrollment],
    overrides: &OverrideSet,
) -> Result<Vec<LateralOptimization>, ProjectionError> {
    let cascade = OverrideCascade::new(catalog, overrides);
    let count_of = |id: LevelId| {
        base.iter()
            .rev()
            .find(|b| b.level_id == id)
            .map_or(0, |b| b.student_count)
    };

    catalog
        .ordered_levels()
        .into_iter()
        .map(|level| {
            let params = cascade.resolve_parameters(level.id)?;
            let ceiling = params.class_size_ceiling.max(1);
            let capacity = params.capacity();
            let retained = retained(count_of(level.id), params.retention_rate);

            let open_divisions = retained.div_ceil(ceiling).min(params.max_divisions);
            let recommended_lateral = capacity.saturating_sub(retained);

            Ok(LateralOptimization {
                level_id: level.id,
                level_code: level.code.clone(),
                retained,
                current_lateral: params.lateral_entry,
                class_size_ceiling: params.class_size_ceiling,
                max_divisions: params.max_divisions,
                capacity,
                recommended_lateral,
                fill_open_divisions_lateral: open_divisions
                    .saturating_mul(ceiling)
                    .saturating_sub(retained),
                divisions_at_recommended: retained
                    .saturating_add(recommended_lateral)
                    .min(capacity)
                    .div_ceil(ceiling),
                current_unmet_demand: retained
                    .saturating_add(params.lateral_entry)
                    .saturating_sub(capacity),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::types::{Cycle, FieldOverrides, GradeLevel};
    use rust_decimal_macros::dec;
    use schoolplan_shared::types::CycleId;

    fn setup(count: u32, lateral: u32) -> (GradeCatalog, Vec<BaseEnrollment>, OverrideSet, LevelId) {
        let cycle = CycleId::new();
        let level = LevelId::new();
        let catalog = GradeCatalog {
            cycles: vec![Cycle {
                id: cycle,
                code: "ELEM".into(),
                name: "Élémentaire".into(),
                sort_order: 1,
            }],
            levels: vec![GradeLevel {
                id: level,
                code: "CP".into(),
                name: "CP".into(),
                cycle_id: Some(cycle),
                sort_order: 1,
            }],
        };
        let mut overrides = OverrideSet::default();
        overrides.grade_overrides.insert(
            level,
            FieldOverrides {
                retention_rate: Some(dec!(1)),
                lateral_entry: Some(lateral),
                class_size_ceiling: Some(24),
                max_divisions: Some(3),
            },
        );
        let base = vec![BaseEnrollment {
            level_id: level,
            student_count: count,
        }];
        (catalog, base, overrides, level)
    }

    #[test]
    fn test_recommendation_fills_capacity_and_open_divisions() {
        let (catalog, base, overrides, level) = setup(50, 0);
        let rows = optimize_lateral_entry(&catalog, &base, &overrides).unwrap();
        let row = &rows[0];
        assert_eq!(row.level_id, level);
        assert_eq!(row.retained, 50);
        assert_eq!(row.capacity, 72);
        assert_eq!(row.recommended_lateral, 22);
        // 50 students open 3 divisions of 24.
        assert_eq!(row.fill_open_divisions_lateral, 22);
        assert_eq!(row.divisions_at_recommended, 3);
        assert_eq!(row.current_unmet_demand, 0);
    }

    #[test]
    fn test_open_divisions_below_max() {
        let (catalog, base, overrides, _) = setup(30, 0);
        let row = &optimize_lateral_entry(&catalog, &base, &overrides).unwrap()[0];
        assert_eq!(row.recommended_lateral, 42);
        assert_eq!(row.fill_open_divisions_lateral, 18);
    }

    #[test]
    fn test_over_capacity_recommends_nothing() {
        let (catalog, base, overrides, _) = setup(80, 4);
        let row = &optimize_lateral_entry(&catalog, &base, &overrides).unwrap()[0];
        assert_eq!(row.recommended_lateral, 0);
        assert_eq!(row.fill_open_divisions_lateral, 0);
        assert_eq!(row.divisions_at_recommended, 3);
        assert_eq!(row.current_unmet_demand, 12);
    }
}
