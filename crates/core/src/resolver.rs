//! Per-viewer action resolution for collaboration summary rows.
//!
//! A pure decision table: given the relationship a row represents and the
//! viewer-relative lock status of its package, produce the ordered set of
//! actions the viewer may take plus a display status for the presentation
//! layer. No cell ever yields more than two actions.

use serde::Serialize;

use crate::lease::LockStatus;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The relationship a summary row represents, from the viewer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollabCase {
    /// Viewer owns the package; the row is an individual collaborator.
    OwnerWithUser,
    /// Viewer owns the package; the row is a collaborating group.
    OwnerWithGroup,
    /// Viewer is an individual collaborator on someone else's package.
    CollaboratorOfUser,
    /// Viewer is a member of a group collaborating on someone else's package.
    MemberOfGroup,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// An action a viewer may take on a collaboration summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Open,
    ReleaseIndividualLock,
    ReleaseGroupLock,
    ApplyGroupLock,
    EndCollaboration,
    EndGroupCollaboration,
}

/// Human-facing lock state of a summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayStatus {
    /// Nobody is editing the package.
    Available,
    /// The viewer holds the individual lock.
    EditedByYou,
    /// Another user holds the individual lock.
    EditedBy { holder: String },
    /// A group lock is in place and nobody is editing.
    HeldByGroup { group: String },
    /// A group lock is in place and the viewer is editing under it.
    HeldByGroupEditedByYou { group: String },
    /// A group lock is in place and another member is editing under it.
    HeldByGroupEditedBy { group: String, holder: String },
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::EditedByYou => write!(f, "being edited by you"),
            Self::EditedBy { holder } => write!(f, "being edited by {holder}"),
            Self::HeldByGroup { group } => write!(f, "held by group {group}"),
            Self::HeldByGroupEditedByYou { group } => {
                write!(f, "held by group {group}, being edited by you")
            }
            Self::HeldByGroupEditedBy { group, holder } => {
                write!(f, "held by group {group}, being edited by {holder}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// The decision table
// ---------------------------------------------------------------------------

/// Resolve the ordered action set for one summary row.
///
/// Owners may only mutate the collaboration graph from a row whose lock
/// state involves them (ending a collaboration releases the counterpart's
/// lock, so a disengaged owner gets no graph actions while a stranger
/// holds the package). Group-side rows gate `Open` behind the group lock:
/// a member first applies the group lock, then edits under its protection.
pub fn resolve_actions(case: CollabCase, status: LockStatus) -> Vec<Action> {
    use Action::*;
    use CollabCase::*;
    use LockStatus::*;

    match (case, status) {
        // Owner looking at an individual collaborator of their package.
        (OwnerWithUser, NotLocked) => vec![Open],
        (OwnerWithUser, LockedBySelf) => vec![ReleaseIndividualLock, EndCollaboration],
        (OwnerWithUser, LockedByOther) => vec![EndCollaboration],
        (OwnerWithUser, LockedByGroupOnly) => vec![],
        (OwnerWithUser, LockedByGroupAndSelf) => vec![ReleaseIndividualLock],
        (OwnerWithUser, LockedByGroupAndOther) => vec![],

        // Owner looking at a group collaborating on their package. The owner
        // administers the group lock even when not a member.
        (OwnerWithGroup, NotLocked) => vec![Open, ApplyGroupLock],
        (OwnerWithGroup, LockedBySelf) => vec![ReleaseIndividualLock, EndGroupCollaboration],
        (OwnerWithGroup, LockedByOther) => vec![EndGroupCollaboration],
        (OwnerWithGroup, LockedByGroupOnly) => vec![ReleaseGroupLock],
        (OwnerWithGroup, LockedByGroupAndSelf) => vec![ReleaseIndividualLock, ReleaseGroupLock],
        (OwnerWithGroup, LockedByGroupAndOther) => vec![ReleaseGroupLock],

        // Individual collaborator looking at a package shared with them.
        (CollaboratorOfUser, NotLocked) => vec![Open],
        (CollaboratorOfUser, LockedBySelf) => vec![ReleaseIndividualLock, EndCollaboration],
        (CollaboratorOfUser, LockedByOther) => vec![],
        (CollaboratorOfUser, LockedByGroupOnly) => vec![],
        (CollaboratorOfUser, LockedByGroupAndSelf) => vec![ReleaseIndividualLock],
        (CollaboratorOfUser, LockedByGroupAndOther) => vec![],

        // Group member looking at the group's own row. Editing goes through
        // the group lock.
        (MemberOfGroup, NotLocked) => vec![ApplyGroupLock],
        (MemberOfGroup, LockedBySelf) => vec![ReleaseIndividualLock],
        (MemberOfGroup, LockedByOther) => vec![],
        (MemberOfGroup, LockedByGroupOnly) => vec![Open, ReleaseGroupLock],
        (MemberOfGroup, LockedByGroupAndSelf) => vec![ReleaseIndividualLock, ReleaseGroupLock],
        (MemberOfGroup, LockedByGroupAndOther) => vec![ReleaseGroupLock],
    }
}

/// Build the display status for a row.
///
/// `holder` is the login of the individual lock holder (when one exists),
/// `group` the name of the group holding the group lock (when one exists).
/// Missing names degrade to a placeholder rather than failing the build.
pub fn display_status(
    status: LockStatus,
    holder: Option<&str>,
    group: Option<&str>,
) -> DisplayStatus {
    let holder = || holder.unwrap_or("another user").to_string();
    let group = || group.unwrap_or("a group").to_string();

    match status {
        LockStatus::NotLocked => DisplayStatus::Available,
        LockStatus::LockedBySelf => DisplayStatus::EditedByYou,
        LockStatus::LockedByOther => DisplayStatus::EditedBy { holder: holder() },
        LockStatus::LockedByGroupOnly => DisplayStatus::HeldByGroup { group: group() },
        LockStatus::LockedByGroupAndSelf => {
            DisplayStatus::HeldByGroupEditedByYou { group: group() }
        }
        LockStatus::LockedByGroupAndOther => DisplayStatus::HeldByGroupEditedBy {
            group: group(),
            holder: holder(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CASES: [CollabCase; 4] = [
        CollabCase::OwnerWithUser,
        CollabCase::OwnerWithGroup,
        CollabCase::CollaboratorOfUser,
        CollabCase::MemberOfGroup,
    ];

    const ALL_STATUSES: [LockStatus; 6] = [
        LockStatus::NotLocked,
        LockStatus::LockedBySelf,
        LockStatus::LockedByOther,
        LockStatus::LockedByGroupOnly,
        LockStatus::LockedByGroupAndSelf,
        LockStatus::LockedByGroupAndOther,
    ];

    // -----------------------------------------------------------------------
    // Whole-table properties
    // -----------------------------------------------------------------------

    #[test]
    fn no_cell_has_more_than_two_actions() {
        for case in ALL_CASES {
            for status in ALL_STATUSES {
                let actions = resolve_actions(case, status);
                assert!(
                    actions.len() <= 2,
                    "{case:?}/{status:?} yields {actions:?}"
                );
            }
        }
    }

    #[test]
    fn no_cell_repeats_an_action() {
        for case in ALL_CASES {
            for status in ALL_STATUSES {
                let actions = resolve_actions(case, status);
                let mut dedup = actions.clone();
                dedup.dedup();
                assert_eq!(actions, dedup);
            }
        }
    }

    #[test]
    fn release_individual_lock_requires_holding_it() {
        for case in ALL_CASES {
            for status in ALL_STATUSES {
                if resolve_actions(case, status).contains(&Action::ReleaseIndividualLock) {
                    assert!(status.held_by_viewer(), "{case:?}/{status:?}");
                }
            }
        }
    }

    #[test]
    fn release_group_lock_requires_a_group_lock() {
        for case in ALL_CASES {
            for status in ALL_STATUSES {
                if resolve_actions(case, status).contains(&Action::ReleaseGroupLock) {
                    assert!(status.group_locked(), "{case:?}/{status:?}");
                }
            }
        }
    }

    #[test]
    fn apply_group_lock_only_when_none_exists() {
        for case in ALL_CASES {
            for status in ALL_STATUSES {
                if resolve_actions(case, status).contains(&Action::ApplyGroupLock) {
                    assert!(!status.group_locked(), "{case:?}/{status:?}");
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Individual cells
    // -----------------------------------------------------------------------

    #[test]
    fn owner_with_idle_collaborator_can_only_open() {
        assert_eq!(
            resolve_actions(CollabCase::OwnerWithUser, LockStatus::NotLocked),
            vec![Action::Open]
        );
    }

    #[test]
    fn owner_editing_can_release_or_end_collaboration() {
        assert_eq!(
            resolve_actions(CollabCase::OwnerWithUser, LockStatus::LockedBySelf),
            vec![Action::ReleaseIndividualLock, Action::EndCollaboration]
        );
    }

    #[test]
    fn group_member_applies_group_lock_on_idle_package() {
        assert_eq!(
            resolve_actions(CollabCase::MemberOfGroup, LockStatus::NotLocked),
            vec![Action::ApplyGroupLock]
        );
    }

    #[test]
    fn group_member_opens_under_group_protection() {
        assert_eq!(
            resolve_actions(CollabCase::MemberOfGroup, LockStatus::LockedByGroupOnly),
            vec![Action::Open, Action::ReleaseGroupLock]
        );
    }

    #[test]
    fn collaborator_waits_while_someone_else_edits() {
        assert!(resolve_actions(CollabCase::CollaboratorOfUser, LockStatus::LockedByOther)
            .is_empty());
    }

    #[test]
    fn owner_administers_group_lock_without_membership() {
        assert_eq!(
            resolve_actions(CollabCase::OwnerWithGroup, LockStatus::LockedByGroupOnly),
            vec![Action::ReleaseGroupLock]
        );
    }

    // -----------------------------------------------------------------------
    // Display status
    // -----------------------------------------------------------------------

    #[test]
    fn display_status_uses_holder_and_group_names() {
        let status = display_status(
            LockStatus::LockedByGroupAndOther,
            Some("carol"),
            Some("Curators"),
        );
        assert_eq!(
            status,
            DisplayStatus::HeldByGroupEditedBy {
                group: "Curators".to_string(),
                holder: "carol".to_string(),
            }
        );
        assert_eq!(
            status.to_string(),
            "held by group Curators, being edited by carol"
        );
    }

    #[test]
    fn display_status_degrades_missing_names() {
        let status = display_status(LockStatus::LockedByOther, None, None);
        assert_eq!(status.to_string(), "being edited by another user");
    }

    #[test]
    fn display_status_serializes_with_a_state_tag() {
        let json = serde_json::to_string(&DisplayStatus::EditedByYou).unwrap();
        assert!(json.contains(r#""state":"EDITED_BY_YOU"#), "{json}");
    }
}
