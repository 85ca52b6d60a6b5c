//! Enrollment projection domain types.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use schoolplan_shared::types::{CycleId, LevelId, VersionId};

use crate::planning::PlanningModule;

/// A school cycle (Maternelle, Élémentaire, Collège, Lycée).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    /// Identity.
    pub id: CycleId,
    /// Short code (e.g. "COL").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Display order.
    pub sort_order: i32,
}

/// A grade level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeLevel {
    /// Identity.
    pub id: LevelId,
    /// Short code (e.g. "6EME").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Owning cycle. `None` is a configuration error at projection time.
    pub cycle_id: Option<CycleId>,
    /// Display and progression order.
    pub sort_order: i32,
}

/// Cycles and grade levels of one budget version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCatalog {
    /// Cycles.
    pub cycles: Vec<Cycle>,
    /// Grade levels.
    pub levels: Vec<GradeLevel>,
}

impl GradeCatalog {
    /// Finds a level.
    #[must_use]
    pub fn level(&self, id: LevelId) -> Option<&GradeLevel> {
        self.levels.iter().find(|l| l.id == id)
    }

    /// True if the cycle exists.
    #[must_use]
    pub fn has_cycle(&self, id: CycleId) -> bool {
        self.cycles.iter().any(|c| c.id == id)
    }

    /// Levels ordered by `sort_order`, then code.
    #[must_use]
    pub fn ordered_levels(&self) -> Vec<&GradeLevel> {
        let mut levels: Vec<_> = self.levels.iter().collect();
        levels.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.code.cmp(&b.code)));
        levels
    }
}

/// Starting headcount of a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseEnrollment {
    /// Grade.
    pub level_id: LevelId,
    /// Students enrolled.
    pub student_count: u32,
}

/// An overridable projection parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideField {
    /// Share of students continuing into the next period.
    RetentionRate,
    /// Students joining mid-cohort.
    LateralEntry,
    /// Maximum students per division.
    ClassSizeCeiling,
    /// Maximum divisions per grade.
    MaxDivisions,
}

impl OverrideField {
    /// All fields.
    pub const ALL: [Self; 4] = [
        Self::RetentionRate,
        Self::LateralEntry,
        Self::ClassSizeCeiling,
        Self::MaxDivisions,
    ];

    /// Returns the string representation of the field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RetentionRate => "retention_rate",
            Self::LateralEntry => "lateral_entry",
            Self::ClassSizeCeiling => "class_size_ceiling",
            Self::MaxDivisions => "max_divisions",
        }
    }
}

impl fmt::Display for OverrideField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A rate (retention).
    Rate(Decimal),
    /// A count (lateral entry, ceiling, divisions).
    Count(u32),
}

/// Overrides carrying all four fields (global and grade tiers).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverrides {
    /// Retention rate override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_rate: Option<Decimal>,
    /// Lateral entry override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lateral_entry: Option<u32>,
    /// Class size ceiling override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_size_ceiling: Option<u32>,
    /// Max divisions override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_divisions: Option<u32>,
}

impl FieldOverrides {
    /// Value of one field, if set.
    #[must_use]
    pub fn get(&self, field: OverrideField) -> Option<FieldValue> {
        match field {
            OverrideField::RetentionRate => self.retention_rate.map(FieldValue::Rate),
            OverrideField::LateralEntry => self.lateral_entry.map(FieldValue::Count),
            OverrideField::ClassSizeCeiling => self.class_size_ceiling.map(FieldValue::Count),
            OverrideField::MaxDivisions => self.max_divisions.map(FieldValue::Count),
        }
    }

    /// True if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        OverrideField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// Overrides of the cycle tier. Only capacity fields apply per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelOverride {
    /// Class size ceiling override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_size_ceiling: Option<u32>,
    /// Max divisions override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_divisions: Option<u32>,
}

impl LevelOverride {
    /// Value of one field, if set. Rate fields never resolve at this tier.
    #[must_use]
    pub fn get(&self, field: OverrideField) -> Option<FieldValue> {
        match field {
            OverrideField::ClassSizeCeiling => self.class_size_ceiling.map(FieldValue::Count),
            OverrideField::MaxDivisions => self.max_divisions.map(FieldValue::Count),
            OverrideField::RetentionRate | OverrideField::LateralEntry => None,
        }
    }
}

/// The three override tiers of a projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSet {
    /// Applies to every grade.
    #[serde(default)]
    pub global_overrides: FieldOverrides,
    /// Keyed by cycle.
    #[serde(default)]
    pub level_overrides: BTreeMap<CycleId, LevelOverride>,
    /// Keyed by grade.
    #[serde(default)]
    pub grade_overrides: BTreeMap<LevelId, FieldOverrides>,
}

/// Committed projection configuration of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Version.
    pub version_id: VersionId,
    /// Committed overrides.
    pub overrides: OverrideSet,
    /// Years projected on apply (1..=5).
    pub horizon_years: u8,
    /// Set by an explicit, confirmed validate.
    pub validated: bool,
    /// When last validated.
    pub validated_at: Option<DateTime<Utc>>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl ProjectionConfig {
    /// An empty, unvalidated config.
    #[must_use]
    pub fn empty(version_id: VersionId, now: DateTime<Utc>) -> Self {
        Self {
            version_id,
            overrides: OverrideSet::default(),
            horizon_years: super::DEFAULT_HORIZON_YEARS,
            validated: false,
            validated_at: None,
            updated_at: now,
        }
    }
}

/// Uncommitted override edits. Saved wholesale; last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionDraft {
    /// Version.
    pub version_id: VersionId,
    /// The whole override document being edited.
    pub overrides: OverrideSet,
    /// When saved.
    pub saved_at: DateTime<Utc>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideSource {
    /// Grade override.
    Grade,
    /// Cycle override.
    Level,
    /// Global override.
    Global,
    /// System default.
    Default,
}

/// Parameters of one grade after cascade resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParameters {
    /// Retention rate.
    pub retention_rate: Decimal,
    /// Lateral entries.
    pub lateral_entry: u32,
    /// Class size ceiling.
    pub class_size_ceiling: u32,
    /// Max divisions.
    pub max_divisions: u32,
}

impl ResolvedParameters {
    /// Seats available: ceiling × max divisions.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.class_size_ceiling.saturating_mul(self.max_divisions)
    }
}

/// One grade in one projected year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeProjection {
    /// Grade.
    pub level_id: LevelId,
    /// Grade code.
    pub level_code: String,
    /// Owning cycle.
    pub cycle_id: CycleId,
    /// 1 for the first projected year.
    pub year_offset: u8,
    /// Headcount the year started from.
    pub base_count: u32,
    /// `round(base × retention)`.
    pub retained: u32,
    /// Lateral entries applied.
    pub lateral_entry: u32,
    /// Retained plus lateral.
    pub demand: u32,
    /// Ceiling × max divisions.
    pub capacity: u32,
    /// `min(demand, capacity)`.
    pub projected: u32,
    /// Demand above capacity. Reported, never dropped.
    pub unmet_demand: u32,
    /// `ceil(projected / ceiling)`.
    pub divisions: u32,
    /// Parameters used.
    pub parameters: ResolvedParameters,
    /// Capacity warning when demand exceeds capacity.
    pub warning: Option<String>,
}

/// Totals of one projected year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    /// 1 for the first projected year.
    pub year_offset: u8,
    /// Sum of projected headcounts.
    pub projected: u32,
    /// Sum of unmet demand.
    pub unmet_demand: u32,
    /// Sum of divisions.
    pub divisions: u32,
}

/// Full projection snapshot of a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionResults {
    /// Version.
    pub version_id: VersionId,
    /// Years projected.
    pub horizon_years: u8,
    /// Ordered by year, then grade order.
    pub grades: Vec<GradeProjection>,
    /// One entry per projected year.
    pub years: Vec<YearSummary>,
    /// When calculated.
    pub calculated_at: DateTime<Utc>,
}

impl ProjectionResults {
    /// Projection of one grade in one year.
    #[must_use]
    pub fn grade(&self, level_id: LevelId, year_offset: u8) -> Option<&GradeProjection> {
        self.grades
            .iter()
            .find(|g| g.level_id == level_id && g.year_offset == year_offset)
    }

    /// Unmet demand over the whole horizon.
    #[must_use]
    pub fn total_unmet_demand(&self) -> u32 {
        self.years.iter().map(|y| y.unmet_demand).sum()
    }
}

/// Everything the configuration screen needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionConfigView {
    /// Committed config.
    pub config: ProjectionConfig,
    /// Pending draft, if any.
    pub draft: Option<ProjectionDraft>,
    /// Grade catalogue.
    pub catalog: GradeCatalog,
    /// Base enrollment.
    pub base_enrollment: Vec<BaseEnrollment>,
    /// Whether results exist.
    pub has_results: bool,
    /// Downstream modules flagged for recomputation.
    pub stale_modules: Vec<PlanningModule>,
}

/// Lateral-entry recommendation for one grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateralOptimization {
    /// Grade.
    pub level_id: LevelId,
    /// Grade code.
    pub level_code: String,
    /// Students retained from the base count.
    pub retained: u32,
    /// Lateral entries currently configured.
    pub current_lateral: u32,
    /// Class size ceiling.
    pub class_size_ceiling: u32,
    /// Max divisions.
    pub max_divisions: u32,
    /// Ceiling × max divisions.
    pub capacity: u32,
    /// Laterals filling every seat up to capacity.
    pub recommended_lateral: u32,
    /// Laterals completing the divisions retained students already open.
    pub fill_open_divisions_lateral: u32,
    /// Divisions after taking the recommended laterals.
    pub divisions_at_recommended: u32,
    /// Current configuration's demand above capacity.
    pub current_unmet_demand: u32,
}
