//! Workflow domain types for budget version lifecycle management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use schoolplan_shared::types::VersionId;

/// Budget version status in the approval workflow.
///
/// The valid transitions are:
/// - Working → Submitted (submit)
/// - Rejected → Submitted (submit)
/// - Submitted → Approved (approve)
/// - Submitted → Rejected (reject)
/// - Rejected → Working (reopen)
/// - Approved → Superseded (supersede)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// Version is being planned and accepts module writes.
    Working,
    /// Version has been submitted for approval and is read-only.
    Submitted,
    /// Version has been approved.
    Approved,
    /// Version was sent back; a fresh submit or a reopen is required.
    Rejected,
    /// Version was replaced by a newer approved revision. Kept for audit.
    Superseded,
}

impl VersionStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Working,
        Self::Submitted,
        Self::Approved,
        Self::Rejected,
        Self::Superseded,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "WORKING",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Superseded => "SUPERSEDED",
        }
    }

    /// Parses a status from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "WORKING" => Some(Self::Working),
            "SUBMITTED" => Some(Self::Submitted),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "SUPERSEDED" => Some(Self::Superseded),
            _ => None,
        }
    }

    /// Returns true if planning modules may write to the version.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self, Self::Working)
    }

    /// Returns true if consolidation results are frozen.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        matches!(self, Self::Submitted | Self::Approved | Self::Superseded)
    }

    /// Returns true if the version may be physically deleted.
    #[must_use]
    pub const fn is_deletable(&self) -> bool {
        matches!(self, Self::Working | Self::Rejected)
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verb a caller asks the state machine to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowCommand {
    /// Send for approval.
    Submit,
    /// Accept a submitted version.
    Approve,
    /// Send a submitted version back.
    Reject,
    /// Make a rejected version editable again.
    Reopen,
    /// Retire an approved version in favour of a newer one.
    Supersede,
}

impl WorkflowCommand {
    /// Returns the string representation of the command.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reopen => "reopen",
            Self::Supersede => "supersede",
        }
    }
}

impl fmt::Display for WorkflowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow action representing a validated state transition with audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Version sent for approval.
    Submit {
        /// The new status after submission.
        new_status: VersionStatus,
        /// When the version was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// Version approved.
    Approve {
        /// The new status after approval.
        new_status: VersionStatus,
        /// When the version was approved.
        approved_at: DateTime<Utc>,
    },
    /// Version rejected.
    Reject {
        /// The new status after rejection.
        new_status: VersionStatus,
        /// The reason for rejection.
        rejection_reason: String,
        /// When the version was rejected.
        rejected_at: DateTime<Utc>,
    },
    /// Rejected version returned to planning.
    Reopen {
        /// The new status after reopening.
        new_status: VersionStatus,
    },
    /// Approved version retired.
    Supersede {
        /// The new status after superseding.
        new_status: VersionStatus,
        /// The revision that replaces this version, when known.
        superseded_by: Option<VersionId>,
    },
}

impl WorkflowAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> VersionStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Reopen { new_status }
            | Self::Supersede { new_status, .. } => *new_status,
        }
    }

    /// Returns the command that produced this action.
    #[must_use]
    pub const fn command(&self) -> WorkflowCommand {
        match self {
            Self::Submit { .. } => WorkflowCommand::Submit,
            Self::Approve { .. } => WorkflowCommand::Approve,
            Self::Reject { .. } => WorkflowCommand::Reject,
            Self::Reopen { .. } => WorkflowCommand::Reopen,
            Self::Supersede { .. } => WorkflowCommand::Supersede,
        }
    }
}

/// A compare-and-swap request handed to the version store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    /// Version to move.
    pub version_id: VersionId,
    /// Status the caller last read; the store refuses the change otherwise.
    pub expected: VersionStatus,
    /// Validated action to record.
    pub action: WorkflowAction,
}
