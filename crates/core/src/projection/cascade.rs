//! Three-tier override cascade: grade → cycle → global → system default.
//!
//! Resolution is an ordered list of resolvers queried most specific first.
//! Each field resolves independently, so a grade may take its ceiling from
//! its cycle and its retention rate from the global tier.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use schoolplan_shared::types::{CycleId, LevelId};

use crate::projection::error::ProjectionError;
use crate::projection::types::{
    FieldOverrides, FieldValue, GradeCatalog, LevelOverride, OverrideField, OverrideSet,
    OverrideSource, ResolvedParameters,
};

/// Default retention rate (0.95).
pub const DEFAULT_RETENTION_RATE: Decimal = Decimal::from_parts(95, 0, 0, false, 2);
/// Default lateral entries per grade.
pub const DEFAULT_LATERAL_ENTRY: u32 = 0;
/// Default class size ceiling.
pub const DEFAULT_CLASS_SIZE_CEILING: u32 = 25;
/// Default max divisions per grade.
pub const DEFAULT_MAX_DIVISIONS: u32 = 2;

/// Upper bound of the retention rate.
pub const MAX_RETENTION_RATE: Decimal = Decimal::TWO;

impl FieldValue {
    /// The value as a rate.
    #[must_use]
    pub fn as_rate(self) -> Decimal {
        match self {
            Self::Rate(r) => r,
            Self::Count(c) => Decimal::from(c),
        }
    }

    /// The value as a count.
    #[must_use]
    pub fn as_count(self) -> u32 {
        match self {
            Self::Count(c) => c,
            Self::Rate(r) => r.trunc().to_u32().unwrap_or(0),
        }
    }
}

/// One tier of the cascade.
pub trait OverrideResolver: Send + Sync {
    /// Tier reported alongside resolved values.
    fn source(&self) -> OverrideSource;

    /// Value for `field` at this tier, if set.
    fn lookup(&self, field: OverrideField, level: LevelId, cycle: CycleId) -> Option<FieldValue>;
}

struct GradeTier<'a>(&'a BTreeMap<LevelId, FieldOverrides>);

impl OverrideResolver for GradeTier<'_> {
    fn source(&self) -> OverrideSource {
        OverrideSource::Grade
    }

    fn lookup(&self, field: OverrideField, level: LevelId, _cycle: CycleId) -> Option<FieldValue> {
        self.0.get(&level).and_then(|o| o.get(field))
    }
}

struct CycleTier<'a>(&'a BTreeMap<CycleId, LevelOverride>);

impl OverrideResolver for CycleTier<'_> {
    fn source(&self) -> OverrideSource {
        OverrideSource::Level
    }

    fn lookup(&self, field: OverrideField, _level: LevelId, cycle: CycleId) -> Option<FieldValue> {
        self.0.get(&cycle).and_then(|o| o.get(field))
    }
}

struct GlobalTier<'a>(&'a FieldOverrides);

impl OverrideResolver for GlobalTier<'_> {
    fn source(&self) -> OverrideSource {
        OverrideSource::Global
    }

    fn lookup(&self, field: OverrideField, _level: LevelId, _cycle: CycleId) -> Option<FieldValue> {
        self.0.get(field)
    }
}

/// System default for a field.
#[must_use]
pub const fn default_value(field: OverrideField) -> FieldValue {
    match field {
        OverrideField::RetentionRate => FieldValue::Rate(DEFAULT_RETENTION_RATE),
        OverrideField::LateralEntry => FieldValue::Count(DEFAULT_LATERAL_ENTRY),
        OverrideField::ClassSizeCeiling => FieldValue::Count(DEFAULT_CLASS_SIZE_CEILING),
        OverrideField::MaxDivisions => FieldValue::Count(DEFAULT_MAX_DIVISIONS),
    }
}

/// Resolves projection parameters for grades of one catalogue.
pub struct OverrideCascade<'a> {
    catalog: &'a GradeCatalog,
    resolvers: Vec<Box<dyn OverrideResolver + 'a>>,
}

impl<'a> OverrideCascade<'a> {
    /// Builds the cascade in specificity order.
    #[must_use]
    pub fn new(catalog: &'a GradeCatalog, overrides: &'a OverrideSet) -> Self {
        Self {
            catalog,
            resolvers: vec![
                Box::new(GradeTier(&overrides.grade_overrides)),
                Box::new(CycleTier(&overrides.level_overrides)),
                Box::new(GlobalTier(&overrides.global_overrides)),
            ],
        }
    }

    fn cycle_of(&self, level_id: LevelId) -> Result<CycleId, ProjectionError> {
        self.catalog
            .level(level_id)
            .ok_or(ProjectionError::UnknownGrade(level_id))?
            .cycle_id
            .ok_or(ProjectionError::UnmappedGrade(level_id))
    }

    /// Resolves one field for one grade, falling through to the default.
    ///
    /// # Errors
    ///
    /// `UnknownGrade` if the grade is not in the catalogue, `UnmappedGrade`
    /// if it has no cycle.
    pub fn resolve(
        &self,
        field: OverrideField,
        level_id: LevelId,
    ) -> Result<(FieldValue, OverrideSource), ProjectionError> {
        let cycle = self.cycle_of(level_id)?;
        Ok(self
            .resolvers
            .iter()
            .find_map(|r| r.lookup(field, level_id, cycle).map(|v| (v, r.source())))
            .unwrap_or((default_value(field), OverrideSource::Default)))
    }

    /// Resolves all four fields for one grade.
    pub fn resolve_parameters(
        &self,
        level_id: LevelId,
    ) -> Result<ResolvedParameters, ProjectionError> {
        Ok(ResolvedParameters {
            retention_rate: self.resolve(OverrideField::RetentionRate, level_id)?.0.as_rate(),
            lateral_entry: self.resolve(OverrideField::LateralEntry, level_id)?.0.as_count(),
            class_size_ceiling: self
                .resolve(OverrideField::ClassSizeCeiling, level_id)?
                .0
                .as_count(),
            max_divisions: self.resolve(OverrideField::MaxDivisions, level_id)?.0.as_count(),
        })
    }
}

fn check_fields(overrides: &FieldOverrides, target: &str) -> Result<(), ProjectionError> {
    let invalid = |field, reason: &str| ProjectionError::InvalidOverride {
        field,
        target: target.to_string(),
        reason: reason.to_string(),
    };
    if let Some(rate) = overrides.retention_rate
        && (rate < Decimal::ZERO || rate > MAX_RETENTION_RATE)
    {
        return Err(invalid(
            OverrideField::RetentionRate,
            "must be between 0 and 2",
        ));
    }
    if overrides.class_size_ceiling == Some(0) {
        return Err(invalid(OverrideField::ClassSizeCeiling, "must be at least 1"));
    }
    if overrides.max_divisions == Some(0) {
        return Err(invalid(OverrideField::MaxDivisions, "must be at least 1"));
    }
    Ok(())
}

/// Checks override values and that every key exists in the catalogue.
///
/// # Errors
///
/// `InvalidOverride` for out-of-range values; `UnknownGrade` /
/// `UnknownCycle` for dangling keys.
pub fn validate_overrides(
    overrides: &OverrideSet,
    catalog: &GradeCatalog,
) -> Result<(), ProjectionError> {
    check_fields(&overrides.global_overrides, "global")?;

    for (cycle_id, level_override) in &overrides.level_overrides {
        let cycle = catalog
            .cycles
            .iter()
            .find(|c| c.id == *cycle_id)
            .ok_or(ProjectionError::UnknownCycle(*cycle_id))?;
        check_fields(
            &FieldOverrides {
                class_size_ceiling: level_override.class_size_ceiling,
                max_divisions: level_override.max_divisions,
                ..FieldOverrides::default()
            },
            &format!("cycle {}", cycle.code),
        )?;
    }

    for (level_id, grade_override) in &overrides.grade_overrides {
        let level = catalog
            .level(*level_id)
            .ok_or(ProjectionError::UnknownGrade(*level_id))?;
        check_fields(grade_override, &format!("grade {}", level.code))?;
    }

    Ok(())
}
