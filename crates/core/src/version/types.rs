//! Budget version domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use schoolplan_shared::types::VersionId;

use crate::workflow::{VersionStatus, WorkflowAction};

/// Purpose of a budget version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    /// The annual budget.
    #[default]
    Budget,
    /// An in-year forecast revision.
    Forecast,
    /// Multi-year strategic plan.
    Strategic,
    /// Exploratory scenario.
    WhatIf,
}

impl ScenarioType {
    /// Returns the string representation of the scenario type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "BUDGET",
            Self::Forecast => "FORECAST",
            Self::Strategic => "STRATEGIC",
            Self::WhatIf => "WHAT_IF",
        }
    }

    /// Parses a scenario type (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUDGET" => Some(Self::Budget),
            "FORECAST" => Some(Self::Forecast),
            "STRATEGIC" => Some(Self::Strategic),
            "WHAT_IF" | "WHATIF" => Some(Self::WhatIf),
            _ => None,
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned budget container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetVersion {
    /// Identity.
    pub id: VersionId,
    /// Display name.
    pub name: String,
    /// Fiscal year (e.g. 2026).
    pub fiscal_year: i32,
    /// Academic year label (e.g. "2025-2026").
    pub academic_year: String,
    /// Lifecycle status.
    pub status: VersionStatus,
    /// Purpose of the version.
    pub scenario_type: ScenarioType,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Active planning target for its fiscal year.
    pub is_active: bool,
    /// Source version when created by clone.
    pub cloned_from: Option<VersionId>,
    /// When last submitted.
    pub submitted_at: Option<DateTime<Utc>>,
    /// When approved.
    pub approved_at: Option<DateTime<Utc>>,
    /// When last rejected.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Reason given on last rejection.
    pub rejection_reason: Option<String>,
    /// Revision that replaced this version.
    pub superseded_by: Option<VersionId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl BudgetVersion {
    /// Creates a fresh WORKING version.
    #[must_use]
    pub fn new(input: CreateVersionInput, now: DateTime<Utc>) -> Self {
        Self {
            id: VersionId::new(),
            name: input.name.trim().to_string(),
            fiscal_year: input.fiscal_year,
            academic_year: input.academic_year.trim().to_string(),
            status: VersionStatus::Working,
            scenario_type: input.scenario_type,
            notes: input.notes,
            is_active: false,
            cloned_from: None,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            superseded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates the WORKING clone of `self`.
    #[must_use]
    pub fn clone_as(&self, name: Option<String>, now: DateTime<Utc>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{} (copy)", self.name));
        Self {
            cloned_from: Some(self.id),
            notes: self.notes.clone(),
            ..Self::new(
                CreateVersionInput {
                    name,
                    fiscal_year: self.fiscal_year,
                    academic_year: self.academic_year.clone(),
                    scenario_type: self.scenario_type,
                    notes: None,
                },
                now,
            )
        }
    }

    /// Applies a validated workflow action to the in-memory record.
    ///
    /// Stores call this after their compare-and-swap succeeded.
    pub fn apply_action(&mut self, action: &WorkflowAction, now: DateTime<Utc>) {
        self.status = action.new_status();
        self.updated_at = now;
        match action {
            WorkflowAction::Submit { submitted_at, .. } => {
                self.submitted_at = Some(*submitted_at);
            }
            WorkflowAction::Approve { approved_at, .. } => {
                self.approved_at = Some(*approved_at);
            }
            WorkflowAction::Reject {
                rejection_reason,
                rejected_at,
                ..
            } => {
                self.rejected_at = Some(*rejected_at);
                self.rejection_reason = Some(rejection_reason.clone());
            }
            WorkflowAction::Reopen { .. } => {}
            WorkflowAction::Supersede { superseded_by, .. } => {
                self.superseded_by = *superseded_by;
                self.is_active = false;
            }
        }
    }
}

/// Input for creating a version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateVersionInput {
    /// Display name.
    pub name: String,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Academic year label.
    pub academic_year: String,
    /// Purpose.
    #[serde(default)]
    pub scenario_type: ScenarioType,
    /// Notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Field edits allowed while WORKING.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateVersionInput {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New academic year label.
    #[serde(default)]
    pub academic_year: Option<String>,
    /// New notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateVersionInput {
    /// Applies the edits to a version.
    pub fn apply_to(&self, version: &mut BudgetVersion, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            version.name = name.trim().to_string();
        }
        if let Some(academic_year) = &self.academic_year {
            version.academic_year = academic_year.trim().to_string();
        }
        if let Some(notes) = &self.notes {
            version.notes = Some(notes.clone()).filter(|n| !n.trim().is_empty());
        }
        version.updated_at = now;
    }
}

/// List filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VersionFilter {
    /// Only this fiscal year.
    #[serde(default)]
    pub fiscal_year: Option<i32>,
    /// Only this status.
    #[serde(default)]
    pub status: Option<VersionStatus>,
}

impl VersionFilter {
    /// Returns true if the version passes the filter.
    #[must_use]
    pub fn matches(&self, version: &BudgetVersion) -> bool {
        self.fiscal_year.is_none_or(|y| version.fiscal_year == y)
            && self.status.is_none_or(|s| version.status == s)
    }
}
