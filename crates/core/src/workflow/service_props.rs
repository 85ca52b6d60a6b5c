//! Property-based tests for WorkflowService.

use proptest::prelude::*;

use schoolplan_shared::types::VersionId;

use crate::consolidation::ConsolidationStatus;
use crate::planning::PlanningModule;
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{VersionStatus, WorkflowCommand};

fn arb_status() -> impl Strategy<Value = VersionStatus> {
    prop::sample::select(VersionStatus::ALL.to_vec())
}

fn arb_command() -> impl Strategy<Value = WorkflowCommand> {
    prop_oneof![
        Just(WorkflowCommand::Submit),
        Just(WorkflowCommand::Approve),
        Just(WorkflowCommand::Reject),
        Just(WorkflowCommand::Reopen),
        Just(WorkflowCommand::Supersede),
    ]
}

/// Six presence flags with at least one module absent.
fn arb_incomplete_presence() -> impl Strategy<Value = [bool; 6]> {
    any::<[bool; 6]>().prop_filter("at least one module missing", |flags| {
        flags.iter().any(|present| !present)
    })
}

fn status_from_flags(flags: [bool; 6]) -> ConsolidationStatus {
    ConsolidationStatus::from_presence(VersionId::new(), |module| flags[module.index()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Feature: version-workflow, Property 1: incomplete submit is a validation error

    /// Submitting an incomplete version fails with the missing modules, from any status.
    #[test]
    fn prop_incomplete_submit_names_missing_modules(
        status in arb_status(),
        flags in arb_incomplete_presence(),
    ) {
        let completeness = status_from_flags(flags);
        let result = WorkflowService::submit(status, &completeness);

        match result {
            Err(WorkflowError::IncompleteModules(modules)) => {
                prop_assert!(!modules.is_empty());
                for module in &modules {
                    prop_assert!(!flags[module.index()]);
                }
                let expected = PlanningModule::ALL
                    .iter()
                    .filter(|m| !flags[m.index()])
                    .count();
                prop_assert_eq!(modules.len(), expected);
            }
            other => prop_assert!(false, "expected IncompleteModules, got {:?}", other),
        }
    }

    // Feature: version-workflow, Property 2: the table is the only source of transitions

    /// Every command either follows the table or fails with InvalidTransition.
    #[test]
    fn prop_next_status_matches_validity(
        from in arb_status(),
        command in arb_command(),
    ) {
        match WorkflowService::next_status(from, command) {
            Ok(to) => prop_assert!(WorkflowService::is_valid_transition(from, to)),
            Err(WorkflowError::InvalidTransition { from: f, command: c }) => {
                prop_assert_eq!(f, from);
                prop_assert_eq!(c, command);
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    // Feature: version-workflow, Property 3: nothing leaves SUPERSEDED

    #[test]
    fn prop_superseded_is_terminal(command in arb_command()) {
        prop_assert!(WorkflowService::next_status(VersionStatus::Superseded, command).is_err());
    }

    // Feature: version-workflow, Property 4: blank reasons are refused before the state check

    #[test]
    fn prop_blank_reason_rejected(status in arb_status(), spaces in " {0,10}") {
        let result = WorkflowService::reject(status, spaces);
        prop_assert!(matches!(result, Err(WorkflowError::RejectionReasonRequired)));
    }

    // Feature: version-workflow, Property 5: the resulting action carries the new status

    #[test]
    fn prop_action_status_equals_table(from in arb_status()) {
        if let Ok(action) = WorkflowService::approve(from) {
            prop_assert_eq!(
                action.new_status(),
                WorkflowService::next_status(from, WorkflowCommand::Approve).unwrap()
            );
            prop_assert_eq!(action.command(), WorkflowCommand::Approve);
        }
    }
}
