/// Domain errors raised by the collaboration core.
///
/// All variants are surfaced to the route layer for user-facing handling;
/// the messages of the two lock variants are shown to end users verbatim.
#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    /// The package is covered by a group lock and the caller is not a member.
    #[error("Package '{package}' is locked by the group '{group}'")]
    LockOwnedByAGroup { package: String, group: String },

    /// Another user holds an unexpired individual lock on the package.
    #[error("Package '{package}' is locked by {holder}")]
    LockOwnedByAnotherUser { package: String, holder: String },

    /// An internal invariant does not hold, e.g. a package-open request
    /// arrived without an owner login.
    #[error("Collaboration database inconsistency: {0}")]
    DatabaseInconsistency(String),

    /// No pending invitation matches the supplied code.
    #[error("No pending invitation matches code '{0}'")]
    InvitationNotFound(String),

    /// The accepting user is the one who created the invitation.
    #[error("An invitation cannot be accepted by the user who created it")]
    InvitationBeingAcceptedByOwner,

    /// The login does not resolve to a known user.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The caller does not own the package they tried to administer.
    #[error("User '{login}' is not the owner of package '{package}'")]
    UserIsNotTheOwner { login: String, package: String },

    /// A group collaboration already exists for this (group, package) pair.
    #[error("Already collaborating with group '{0}' on this package")]
    CollaboratingWithGroupAlready(String),
}
