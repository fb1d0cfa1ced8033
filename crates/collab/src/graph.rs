//! The collaboration graph: standing collaborations, group
//! collaborations, and code-based invitations.

use std::sync::Arc;

use chrono::Utc;
use packshare_core::error::CollabError;
use packshare_core::invite_code::generate_code;
use packshare_core::resolver::CollabCase;
use packshare_core::types::DbId;
use packshare_db::models::invitation::{Invitation, NewInvitation};
use packshare_db::repositories::{
    CollaborationRepo, GroupCollaborationRepo, InvitationRepo, LockRepo, MembershipRepo,
    PackageRepo, UserGroupRepo,
};
use packshare_db::uow::UnitOfWork;
use packshare_db::DbPool;
use sqlx::PgConnection;

use crate::config::CollabConfig;
use crate::error::{rollback_quietly, soften, ServiceError, ServiceResult};
use crate::lease::{collect_garbage, package_lock_view, release_group_lock_on};
use crate::mailer::Mailer;
use crate::registry::{require_user, resolve_package, resolve_user};
use crate::views::{self, CollaborationRow, DocumentTitles, InvitationRow, NoDocumentTitles};

/// How many random codes to try before giving up. The 4-consonant space
/// holds 160,000 codes, so hitting this means the table is badly clogged.
const MAX_CODE_ATTEMPTS: u32 = 64;

/// Result of creating an invitation: the code to hand out and whether the
/// notification email went through.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InvitationCreated {
    pub code: String,
    pub email_sent: bool,
}

/// Result of accepting an invitation, for the confirmation message.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InvitationAccepted {
    pub package_name: String,
    pub inviter_name: String,
}

/// Maintains who is permitted to collaborate with whom on which package.
pub struct CollaborationGraph {
    pool: DbPool,
    config: Arc<CollabConfig>,
    mailer: Option<Mailer>,
    titles: Arc<dyn DocumentTitles>,
}

impl CollaborationGraph {
    pub fn new(pool: DbPool, config: Arc<CollabConfig>) -> Self {
        Self {
            pool,
            config,
            mailer: None,
            titles: Arc::new(NoDocumentTitles),
        }
    }

    /// Attach an SMTP mailer for fire-and-forget notifications.
    pub fn with_mailer(mut self, mailer: Mailer) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Attach the document-tree title resolver.
    pub fn with_document_titles(mut self, titles: Arc<dyn DocumentTitles>) -> Self {
        self.titles = titles;
        self
    }

    // -----------------------------------------------------------------------
    // Invitations
    // -----------------------------------------------------------------------

    /// Create an invitation to collaborate on the inviter's package,
    /// returning the code to hand out. The notification email is sent
    /// after commit; its failure only affects the confirmation message.
    pub async fn create_invitation(
        &self,
        inviter_login: &str,
        package_name: &str,
        inviter_name: &str,
        inviter_email: &str,
        invitee_name: &str,
        invitee_email: &str,
    ) -> ServiceResult<InvitationCreated> {
        soften(
            self.config.fail_soft,
            self.create_invitation_tx(
                inviter_login,
                package_name,
                inviter_name,
                inviter_email,
                invitee_name,
                invitee_email,
            )
            .await,
        )
    }

    async fn create_invitation_tx(
        &self,
        inviter_login: &str,
        package_name: &str,
        inviter_name: &str,
        inviter_email: &str,
        invitee_name: &str,
        invitee_email: &str,
    ) -> ServiceResult<InvitationCreated> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let invitation = match create_invitation_in(
            uow.conn(),
            inviter_login,
            package_name,
            inviter_name,
            inviter_email,
            invitee_name,
            invitee_email,
        )
        .await
        {
            Ok(invitation) => {
                uow.commit().await?;
                invitation
            }
            Err(err) => {
                rollback_quietly(uow).await;
                return Err(err);
            }
        };

        let email_sent = match &self.mailer {
            Some(mailer) => mailer.send_invitation(&invitation, package_name).await,
            None => false,
        };
        Ok(InvitationCreated {
            code: invitation.invitation_code.trim().to_string(),
            email_sent,
        })
    }

    /// Accept an invitation by code, converting it into a collaboration.
    pub async fn accept_invitation(
        &self,
        user_login: &str,
        code: &str,
    ) -> ServiceResult<InvitationAccepted> {
        soften(
            self.config.fail_soft,
            self.accept_invitation_tx(user_login, code).await,
        )
    }

    async fn accept_invitation_tx(
        &self,
        user_login: &str,
        code: &str,
    ) -> ServiceResult<InvitationAccepted> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        let (invitation, package_name) =
            match accept_invitation_in(uow.conn(), user_login, code).await {
                Ok(accepted) => {
                    uow.commit().await?;
                    accepted
                }
                Err(err) => {
                    rollback_quietly(uow).await;
                    return Err(err);
                }
            };

        if let Some(mailer) = &self.mailer {
            mailer
                .send_acceptance(&invitation, user_login, &package_name)
                .await;
        }
        Ok(InvitationAccepted {
            package_name,
            inviter_name: invitation.inviter_name,
        })
    }

    /// Withdraw a pending invitation. Only the inviter may cancel.
    pub async fn cancel_invitation(
        &self,
        user_login: &str,
        invitation_id: DbId,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.cancel_invitation_tx(user_login, invitation_id).await,
        )
    }

    async fn cancel_invitation_tx(
        &self,
        user_login: &str,
        invitation_id: DbId,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match cancel_invitation_in(uow.conn(), user_login, invitation_id).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Group collaborations
    // -----------------------------------------------------------------------

    /// Grant a whole group access to one of the owner's packages,
    /// expanding into one collaboration per current member.
    pub async fn add_group_collaboration(
        &self,
        owner_login: &str,
        group_name: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.add_group_collaboration_tx(owner_login, group_name, package_name)
                .await,
        )
    }

    async fn add_group_collaboration_tx(
        &self,
        owner_login: &str,
        group_name: &str,
        package_name: &str,
    ) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match add_group_collaboration_in(uow.conn(), owner_login, group_name, package_name).await {
            Ok(()) => {
                uow.commit().await?;
                Ok(())
            }
            Err(err) => {
                rollback_quietly(uow).await;
                Err(err)
            }
        }
    }

    /// End an individual collaboration, releasing the collaborator's lock
    /// on the package if they hold it.
    pub async fn remove_collaboration(&self, collab_id: DbId) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.remove_collaboration_tx(collab_id).await,
        )
    }

    async fn remove_collaboration_tx(&self, collab_id: DbId) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match remove_collaboration_in(uow.conn(), collab_id).await {
            Ok(()) => uow.commit().await?,
            Err(err) => {
                rollback_quietly(uow).await;
                return Err(err);
            }
        }
        collect_garbage(&self.pool).await;
        Ok(())
    }

    /// End a group collaboration: member-level cleanup first, then the
    /// package's lock if a member holds it, then the group lock, then the
    /// row itself. The order avoids dangling references.
    pub async fn remove_group_collaboration(&self, group_collab_id: DbId) -> ServiceResult<()> {
        soften(
            self.config.fail_soft,
            self.remove_group_collaboration_tx(group_collab_id).await,
        )
    }

    async fn remove_group_collaboration_tx(&self, group_collab_id: DbId) -> ServiceResult<()> {
        let mut uow = UnitOfWork::begin(&self.pool).await?;
        match remove_group_collaboration_in(uow.conn(), group_collab_id).await {
            Ok(()) => uow.commit().await?,
            Err(err) => {
                rollback_quietly(uow).await;
                return Err(err);
            }
        }
        collect_garbage(&self.pool).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    /// All collaboration rows visible to a viewer, annotated with lock
    /// status and permitted actions. An unknown viewer sees nothing.
    pub async fn get_collaborations(
        &self,
        viewer_login: &str,
    ) -> ServiceResult<Vec<CollaborationRow>> {
        soften(
            self.config.fail_soft,
            self.get_collaborations_inner(viewer_login).await,
        )
    }

    async fn get_collaborations_inner(
        &self,
        viewer_login: &str,
    ) -> ServiceResult<Vec<CollaborationRow>> {
        let mut conn = self.pool.acquire().await?;
        let conn = &mut *conn;
        let Some(viewer) = resolve_user(conn, viewer_login, false).await? else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::new();

        for detail in CollaborationRepo::list_by_owner(conn, viewer.user_id).await? {
            let (status, holder, group) =
                package_lock_view(conn, viewer.user_id, detail.package_id).await?;
            rows.push(views::user_row(
                CollabCase::OwnerWithUser,
                detail,
                status,
                holder,
                group,
                &*self.titles,
            ));
        }
        for detail in GroupCollaborationRepo::list_by_owner(conn, viewer.user_id).await? {
            let (status, holder, group) =
                package_lock_view(conn, viewer.user_id, detail.package_id).await?;
            rows.push(views::group_row(
                CollabCase::OwnerWithGroup,
                detail,
                status,
                holder,
                group,
                &*self.titles,
            ));
        }
        for detail in CollaborationRepo::list_by_collaborator(conn, viewer.user_id).await? {
            let (status, holder, group) =
                package_lock_view(conn, viewer.user_id, detail.package_id).await?;
            rows.push(views::user_row(
                CollabCase::CollaboratorOfUser,
                detail,
                status,
                holder,
                group,
                &*self.titles,
            ));
        }
        for detail in GroupCollaborationRepo::list_by_member(conn, viewer.user_id).await? {
            let (status, holder, group) =
                package_lock_view(conn, viewer.user_id, detail.package_id).await?;
            rows.push(views::group_row(
                CollabCase::MemberOfGroup,
                detail,
                status,
                holder,
                group,
                &*self.titles,
            ));
        }

        Ok(rows)
    }

    /// All pending invitations created by a viewer, newest first.
    pub async fn get_invitations(&self, viewer_login: &str) -> ServiceResult<Vec<InvitationRow>> {
        soften(
            self.config.fail_soft,
            self.get_invitations_inner(viewer_login).await,
        )
    }

    async fn get_invitations_inner(
        &self,
        viewer_login: &str,
    ) -> ServiceResult<Vec<InvitationRow>> {
        let mut conn = self.pool.acquire().await?;
        let conn = &mut *conn;
        let Some(viewer) = resolve_user(conn, viewer_login, false).await? else {
            return Ok(Vec::new());
        };
        let details = InvitationRepo::list_by_inviter(conn, viewer.user_id).await?;
        Ok(details.into_iter().map(views::invitation_row).collect())
    }
}

// ---------------------------------------------------------------------------
// Transaction bodies
// ---------------------------------------------------------------------------

async fn create_invitation_in(
    conn: &mut PgConnection,
    inviter_login: &str,
    package_name: &str,
    inviter_name: &str,
    inviter_email: &str,
    invitee_name: &str,
    invitee_email: &str,
) -> ServiceResult<Invitation> {
    let inviter = resolve_user(conn, inviter_login, true)
        .await?
        .ok_or_else(|| CollabError::UserNotFound(inviter_login.to_string()))?;
    let package = resolve_package(conn, inviter_login, package_name, true)
        .await?
        .ok_or_else(|| {
            ServiceError::inconsistency(format!(
                "package '{package_name}' could not be resolved for '{inviter_login}'"
            ))
        })?;

    let mut code = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = generate_code();
        if !InvitationRepo::code_exists(conn, &candidate).await? {
            code = Some(candidate);
            break;
        }
    }
    let code = code.ok_or_else(|| {
        ServiceError::inconsistency("no free invitation code after repeated attempts")
    })?;

    let input = NewInvitation {
        inviter_id: inviter.user_id,
        inviter_name: inviter_name.to_string(),
        inviter_email: inviter_email.to_string(),
        invitee_name: invitee_name.to_string(),
        invitee_email: invitee_email.to_string(),
        package_id: package.package_id,
    };
    Ok(InvitationRepo::insert(conn, &input, &code, Utc::now()).await?)
}

async fn accept_invitation_in(
    conn: &mut PgConnection,
    user_login: &str,
    code: &str,
) -> ServiceResult<(Invitation, String)> {
    // First-time collaborators are created on acceptance.
    let user = resolve_user(conn, user_login, true)
        .await?
        .ok_or_else(|| CollabError::UserNotFound(user_login.to_string()))?;
    let invitation = InvitationRepo::find_by_code(conn, code)
        .await?
        .ok_or_else(|| CollabError::InvitationNotFound(code.to_string()))?;

    if invitation.inviter_id == user.user_id {
        return Err(CollabError::InvitationBeingAcceptedByOwner.into());
    }

    CollaborationRepo::try_insert(
        conn,
        invitation.inviter_id,
        user.user_id,
        invitation.package_id,
    )
    .await?;
    InvitationRepo::delete(conn, invitation.invitation_id).await?;

    let package_name = PackageRepo::find_by_id(conn, invitation.package_id)
        .await?
        .map(|p| p.package_name)
        .unwrap_or_default();
    Ok((invitation, package_name))
}

async fn cancel_invitation_in(
    conn: &mut PgConnection,
    user_login: &str,
    invitation_id: DbId,
) -> ServiceResult<()> {
    let user = require_user(conn, user_login).await?;
    let invitation = InvitationRepo::find_by_id(conn, invitation_id)
        .await?
        .ok_or_else(|| CollabError::InvitationNotFound(invitation_id.to_string()))?;

    if invitation.inviter_id != user.user_id {
        let package = PackageRepo::find_by_id(conn, invitation.package_id)
            .await?
            .map(|p| p.package_name)
            .unwrap_or_default();
        return Err(CollabError::UserIsNotTheOwner {
            login: user_login.to_string(),
            package,
        }
        .into());
    }

    InvitationRepo::delete(conn, invitation.invitation_id).await?;
    Ok(())
}

async fn add_group_collaboration_in(
    conn: &mut PgConnection,
    owner_login: &str,
    group_name: &str,
    package_name: &str,
) -> ServiceResult<()> {
    let owner = require_user(conn, owner_login).await?;
    let package = PackageRepo::find_by_owner_and_name(conn, owner.user_id, package_name)
        .await?
        .ok_or_else(|| CollabError::UserIsNotTheOwner {
            login: owner_login.to_string(),
            package: package_name.to_string(),
        })?;
    let group = UserGroupRepo::find_by_name(conn, group_name)
        .await?
        .ok_or_else(|| ServiceError::inconsistency(format!("unknown group '{group_name}'")))?;

    if GroupCollaborationRepo::try_insert(conn, owner.user_id, group.user_group_id, package.package_id)
        .await?
        .is_none()
    {
        return Err(CollabError::CollaboratingWithGroupAlready(group.user_group_name).into());
    }

    // Expand to the current membership. Later joins are not propagated.
    for member_id in MembershipRepo::member_ids(conn, group.user_group_id).await? {
        if member_id != owner.user_id {
            CollaborationRepo::try_insert(conn, owner.user_id, member_id, package.package_id)
                .await?;
        }
    }
    Ok(())
}

async fn remove_collaboration_in(conn: &mut PgConnection, collab_id: DbId) -> ServiceResult<()> {
    let collaboration = CollaborationRepo::find_by_id(conn, collab_id)
        .await?
        .ok_or_else(|| {
            ServiceError::inconsistency(format!("no collaboration with id {collab_id}"))
        })?;

    LockRepo::delete_by_package_and_holder(
        conn,
        collaboration.package_id,
        collaboration.collaborator_id,
    )
    .await?;
    CollaborationRepo::delete(conn, collab_id).await?;
    Ok(())
}

async fn remove_group_collaboration_in(
    conn: &mut PgConnection,
    group_collab_id: DbId,
) -> ServiceResult<()> {
    let group_collab = GroupCollaborationRepo::find_by_id(conn, group_collab_id)
        .await?
        .ok_or_else(|| {
            ServiceError::inconsistency(format!(
                "no group collaboration with id {group_collab_id}"
            ))
        })?;
    let members = MembershipRepo::member_ids(conn, group_collab.user_group_id).await?;

    // Member-level cleanup strictly before the group-level lock release.
    for member_id in &members {
        if let Some(collaboration) =
            CollaborationRepo::find_by_collaborator_and_package(conn, *member_id, group_collab.package_id)
                .await?
        {
            CollaborationRepo::delete(conn, collaboration.collab_id).await?;
        }
    }

    if let Some(lock) = LockRepo::find_by_package(conn, group_collab.package_id).await? {
        if members.contains(&lock.locked_by) {
            LockRepo::delete(conn, lock.lock_id).await?;
        }
    }
    release_group_lock_on(conn, group_collab.package_id).await?;

    GroupCollaborationRepo::delete(conn, group_collab.group_collab_id).await?;
    Ok(())
}
