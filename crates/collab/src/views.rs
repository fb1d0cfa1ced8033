//! UI-ready records for the collaboration summary page.
//!
//! Pure builders: entities in, display rows out. The presentation layer
//! renders these without touching the store again. Document titles come
//! from the out-of-scope document-tree module through [`DocumentTitles`];
//! a missing title degrades to the raw package name.

use packshare_core::lease::LockStatus;
use packshare_core::resolver::{
    display_status, resolve_actions, Action, CollabCase, DisplayStatus,
};
use packshare_core::types::{DbId, Timestamp};
use packshare_db::models::collaboration::{CollaborationDetail, GroupCollaborationDetail};
use packshare_db::models::invitation::InvitationDetail;
use serde::Serialize;

/// Resolves a display title for a package from the document tree.
///
/// Implemented by the out-of-scope document-tree module; `None` is always
/// tolerated.
pub trait DocumentTitles: Send + Sync {
    fn title(&self, owner_login: &str, package_name: &str) -> Option<String>;
}

/// Default resolver for deployments without a document tree.
pub struct NoDocumentTitles;

impl DocumentTitles for NoDocumentTitles {
    fn title(&self, _owner_login: &str, _package_name: &str) -> Option<String> {
        None
    }
}

/// One row of the collaboration summary page.
#[derive(Debug, Clone, Serialize)]
pub struct CollaborationRow {
    /// `collab_id` or `group_collab_id`, depending on `case`.
    pub id: DbId,
    pub case: CollabCase,
    pub package_id: DbId,
    pub package_name: String,
    /// Document title, falling back to the package name.
    pub title: String,
    pub owner_login: String,
    /// Collaborator login or group name, depending on `case`.
    pub counterpart: String,
    pub status: LockStatus,
    pub display_status: DisplayStatus,
    pub actions: Vec<Action>,
}

/// One row of the pending-invitations listing.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationRow {
    pub invitation_id: DbId,
    pub package_name: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub code: String,
    pub date: Timestamp,
}

/// Build a summary row for an individual collaboration.
pub(crate) fn user_row(
    case: CollabCase,
    detail: CollaborationDetail,
    status: LockStatus,
    holder: Option<String>,
    group: Option<String>,
    titles: &dyn DocumentTitles,
) -> CollaborationRow {
    let title = titles
        .title(&detail.owner_login, &detail.package_name)
        .unwrap_or_else(|| detail.package_name.clone());
    CollaborationRow {
        id: detail.collab_id,
        case,
        package_id: detail.package_id,
        title,
        owner_login: detail.owner_login,
        counterpart: detail.collaborator_login,
        status,
        display_status: display_status(status, holder.as_deref(), group.as_deref()),
        actions: resolve_actions(case, status),
        package_name: detail.package_name,
    }
}

/// Build a summary row for a group collaboration.
pub(crate) fn group_row(
    case: CollabCase,
    detail: GroupCollaborationDetail,
    status: LockStatus,
    holder: Option<String>,
    group: Option<String>,
    titles: &dyn DocumentTitles,
) -> CollaborationRow {
    let title = titles
        .title(&detail.owner_login, &detail.package_name)
        .unwrap_or_else(|| detail.package_name.clone());
    CollaborationRow {
        id: detail.group_collab_id,
        case,
        package_id: detail.package_id,
        title,
        owner_login: detail.owner_login,
        counterpart: detail.user_group_name,
        status,
        display_status: display_status(status, holder.as_deref(), group.as_deref()),
        actions: resolve_actions(case, status),
        package_name: detail.package_name,
    }
}

/// Build a listing row for a pending invitation.
pub(crate) fn invitation_row(detail: InvitationDetail) -> InvitationRow {
    InvitationRow {
        invitation_id: detail.invitation_id,
        package_name: detail.package_name,
        invitee_name: detail.invitee_name,
        invitee_email: detail.invitee_email,
        code: detail.invitation_code,
        date: detail.date,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
