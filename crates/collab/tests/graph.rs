//! Integration tests for the collaboration graph: invitations, group
//! collaborations, cascading removal, and the annotated summary views.

use std::sync::Arc;

use assert_matches::assert_matches;
use packshare_collab::seed::seed_groups;
use packshare_collab::views::CollaborationRow;
use packshare_collab::{CollabConfig, CollaborationGraph, GroupSeed, LeaseManager, ServiceError};
use packshare_core::error::CollabError;
use packshare_core::invite_code::is_valid_code;
use packshare_core::lease::LockStatus;
use packshare_core::resolver::{Action, CollabCase};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn graph(pool: &PgPool) -> CollaborationGraph {
    CollaborationGraph::new(pool.clone(), Arc::new(CollabConfig::default()))
}

fn lease(pool: &PgPool) -> LeaseManager {
    LeaseManager::new(pool.clone(), Arc::new(CollabConfig::default()))
}

async fn seed_curators(pool: &PgPool, members: &[&str]) {
    let seed = GroupSeed {
        name: "Curators".to_string(),
        members: members.iter().map(|m| m.to_string()).collect(),
    };
    seed_groups(pool, &[seed]).await.unwrap();
}

async fn invite(pool: &PgPool, inviter: &str, package: &str, invitee: &str) -> String {
    graph(pool)
        .create_invitation(
            inviter,
            package,
            inviter,
            &format!("{inviter}@example.org"),
            invitee,
            &format!("{invitee}@example.org"),
        )
        .await
        .unwrap()
        .code
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

fn row_for<'a>(
    rows: &'a [CollaborationRow],
    case: CollabCase,
    counterpart: &str,
) -> &'a CollaborationRow {
    rows.iter()
        .find(|r| r.case == case && r.counterpart == counterpart)
        .unwrap_or_else(|| panic!("no {case:?} row for {counterpart}"))
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn invitation_codes_have_the_advertised_shape(pool: PgPool) {
    let code = invite(&pool, "alice", "birds", "Bob").await;
    assert!(is_valid_code(&code), "bad code: {code}");
    assert_eq!(count(&pool, "invitation").await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn accepting_converts_the_invitation_into_a_collaboration(pool: PgPool) {
    let code = invite(&pool, "alice", "birds", "Bob").await;

    let accepted = graph(&pool).accept_invitation("bob", &code).await.unwrap();
    assert_eq!(accepted.package_name, "birds");
    assert_eq!(accepted.inviter_name, "alice");

    assert_eq!(count(&pool, "collaboration").await, 1);
    assert_eq!(count(&pool, "invitation").await, 0);

    // The code was consumed with the invitation.
    let err = graph(&pool).accept_invitation("carol", &code).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::Domain(CollabError::InvitationNotFound(_))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn the_inviter_cannot_accept_their_own_invitation(pool: PgPool) {
    let code = invite(&pool, "alice", "birds", "Bob").await;

    let err = graph(&pool).accept_invitation("alice", &code).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::Domain(CollabError::InvitationBeingAcceptedByOwner)
    );
    // Rejected atomically: the invitation is still pending.
    assert_eq!(count(&pool, "invitation").await, 1);
    assert_eq!(count(&pool, "collaboration").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_inviter_may_cancel(pool: PgPool) {
    invite(&pool, "alice", "birds", "Bob").await;
    // "mallory" must exist to attempt the cancel at all.
    invite(&pool, "mallory", "weeds", "Eve").await;

    let (id,): (i64,) = sqlx::query_as(
        "SELECT invitation_id FROM invitation i \
         JOIN \"user\" u ON u.user_id = i.inviter_id WHERE u.user_login = 'alice'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let err = graph(&pool).cancel_invitation("mallory", id).await.unwrap_err();
    assert_matches!(
        err,
        ServiceError::Domain(CollabError::UserIsNotTheOwner { .. })
    );

    graph(&pool).cancel_invitation("alice", id).await.unwrap();
    assert_eq!(count(&pool, "invitation").await, 1); // only mallory's left
}

// ---------------------------------------------------------------------------
// Group collaborations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn group_collaboration_expands_to_current_members_except_the_owner(pool: PgPool) {
    seed_curators(&pool, &["alice", "bob", "carol"]).await;
    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();

    graph(&pool)
        .add_group_collaboration("alice", "Curators", "birds")
        .await
        .unwrap();

    assert_eq!(count(&pool, "group_collaboration").await, 1);
    // bob and carol, but not the owner alice.
    assert_eq!(count(&pool, "collaboration").await, 2);

    // A later join is not retroactively granted.
    seed_curators(&pool, &["alice", "bob", "carol", "dave"]).await;
    assert_eq!(count(&pool, "collaboration").await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn a_second_group_collaboration_on_the_same_package_is_rejected(pool: PgPool) {
    seed_curators(&pool, &["bob"]).await;
    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();

    graph(&pool)
        .add_group_collaboration("alice", "Curators", "birds")
        .await
        .unwrap();
    let err = graph(&pool)
        .add_group_collaboration("alice", "Curators", "birds")
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Domain(CollabError::CollaboratingWithGroupAlready(ref group))
            if group == "Curators"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn group_collaboration_requires_package_ownership(pool: PgPool) {
    seed_curators(&pool, &["bob"]).await;
    lease(&pool).open_package("alice", "birds", "alice").await.unwrap();
    lease(&pool).open_package("mallory", "weeds", "mallory").await.unwrap();

    // mallory owns no package called "birds".
    let err = graph(&pool)
        .add_group_collaboration("mallory", "Curators", "birds")
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::Domain(CollabError::UserIsNotTheOwner { ref login, ref package })
            if login == "mallory" && package == "birds"
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn removing_a_collaboration_releases_the_collaborators_lock(pool: PgPool) {
    let code = invite(&pool, "alice", "birds", "Bob").await;
    graph(&pool).accept_invitation("bob", &code).await.unwrap();
    lease(&pool).open_package("bob", "birds", "alice").await.unwrap();

    let (collab_id,): (i64,) = sqlx::query_as("SELECT collab_id FROM collaboration")
        .fetch_one(&pool)
        .await
        .unwrap();
    graph(&pool).remove_collaboration(collab_id).await.unwrap();

    assert_eq!(count(&pool, "collaboration").await, 0);
    assert_eq!(count(&pool, "\"lock\"").await, 0);
    // Nothing references the package any more: garbage-collected.
    assert_eq!(count(&pool, "package").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn removing_a_group_collaboration_cascades_cleanly(pool: PgPool) {
    seed_curators(&pool, &["bob", "carol"]).await;
    let lease = lease(&pool);
    lease.open_package("alice", "birds", "alice").await.unwrap();
    graph(&pool)
        .add_group_collaboration("alice", "Curators", "birds")
        .await
        .unwrap();
    lease.release_lock("alice", "alice", "birds").await.unwrap();
    lease.add_group_lock("alice", "birds", "Curators").await.unwrap();
    lease.open_package("bob", "birds", "alice").await.unwrap();

    let (id,): (i64,) = sqlx::query_as("SELECT group_collab_id FROM group_collaboration")
        .fetch_one(&pool)
        .await
        .unwrap();
    graph(&pool).remove_group_collaboration(id).await.unwrap();

    assert_eq!(count(&pool, "group_collaboration").await, 0);
    assert_eq!(count(&pool, "collaboration").await, 0);
    assert_eq!(count(&pool, "group_lock").await, 0);
    assert_eq!(count(&pool, "\"lock\"").await, 0);
}

// ---------------------------------------------------------------------------
// Summary views
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn summary_rows_carry_status_and_actions_for_both_sides(pool: PgPool) {
    let code = invite(&pool, "alice", "birds", "Bob").await;
    graph(&pool).accept_invitation("bob", &code).await.unwrap();

    // Nobody edits yet.
    let alice_rows = graph(&pool).get_collaborations("alice").await.unwrap();
    let row = row_for(&alice_rows, CollabCase::OwnerWithUser, "bob");
    assert_eq!(row.status, LockStatus::NotLocked);
    assert_eq!(row.actions, vec![Action::Open]);

    // Bob opens the package: both sides see the changed state.
    lease(&pool).open_package("bob", "birds", "alice").await.unwrap();

    let alice_rows = graph(&pool).get_collaborations("alice").await.unwrap();
    let row = row_for(&alice_rows, CollabCase::OwnerWithUser, "bob");
    assert_eq!(row.status, LockStatus::LockedByOther);
    assert_eq!(row.actions, vec![Action::EndCollaboration]);

    let bob_rows = graph(&pool).get_collaborations("bob").await.unwrap();
    let row = row_for(&bob_rows, CollabCase::CollaboratorOfUser, "bob");
    assert_eq!(row.status, LockStatus::LockedBySelf);
    assert_eq!(
        row.actions,
        vec![Action::ReleaseIndividualLock, Action::EndCollaboration]
    );
    assert_eq!(row.owner_login, "alice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn group_members_see_the_group_row_with_group_actions(pool: PgPool) {
    seed_curators(&pool, &["bob", "carol"]).await;
    let lease = lease(&pool);
    lease.open_package("alice", "birds", "alice").await.unwrap();
    graph(&pool)
        .add_group_collaboration("alice", "Curators", "birds")
        .await
        .unwrap();
    lease.close_package("alice").await.unwrap();

    let bob_rows = graph(&pool).get_collaborations("bob").await.unwrap();
    let row = row_for(&bob_rows, CollabCase::MemberOfGroup, "Curators");
    assert_eq!(row.status, LockStatus::NotLocked);
    assert_eq!(row.actions, vec![Action::ApplyGroupLock]);

    lease.add_group_lock("alice", "birds", "Curators").await.unwrap();

    let bob_rows = graph(&pool).get_collaborations("bob").await.unwrap();
    let row = row_for(&bob_rows, CollabCase::MemberOfGroup, "Curators");
    assert_eq!(row.status, LockStatus::LockedByGroupOnly);
    assert_eq!(row.actions, vec![Action::Open, Action::ReleaseGroupLock]);

    let alice_rows = graph(&pool).get_collaborations("alice").await.unwrap();
    let row = row_for(&alice_rows, CollabCase::OwnerWithGroup, "Curators");
    assert_eq!(row.status, LockStatus::LockedByGroupOnly);
    assert_eq!(row.actions, vec![Action::ReleaseGroupLock]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pending_invitations_are_listed_for_the_inviter(pool: PgPool) {
    invite(&pool, "alice", "birds", "Bob").await;
    invite(&pool, "alice", "mammals", "Carol").await;

    let rows = graph(&pool).get_invitations("alice").await.unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(is_valid_code(&row.code));
    }

    let none = graph(&pool).get_invitations("bob").await.unwrap();
    assert!(none.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn an_unknown_viewer_sees_no_rows(pool: PgPool) {
    let rows = graph(&pool).get_collaborations("nobody").await.unwrap();
    assert!(rows.is_empty());
}
