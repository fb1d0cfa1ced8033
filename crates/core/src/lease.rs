//! Lock status vocabulary and lease timing.

use serde::Serialize;

use crate::types::Timestamp;

/// Default individual-lock inactivity timeout in minutes.
pub const DEFAULT_LOCK_TIMEOUT_MINS: i64 = 30;

/// The lock state of a package as seen by one viewer.
///
/// The two lock dimensions (individual lock, group lock) collapse into six
/// viewer-relative states; the resolver matches on these exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    NotLocked,
    LockedBySelf,
    LockedByOther,
    LockedByGroupOnly,
    LockedByGroupAndSelf,
    LockedByGroupAndOther,
}

impl LockStatus {
    /// Combine the two lock dimensions into a viewer-relative status.
    ///
    /// `individual` is `None` when no individual lock exists, otherwise
    /// `Some(held_by_viewer)`.
    pub fn derive(group_locked: bool, individual: Option<bool>) -> Self {
        match (group_locked, individual) {
            (false, None) => Self::NotLocked,
            (false, Some(true)) => Self::LockedBySelf,
            (false, Some(false)) => Self::LockedByOther,
            (true, None) => Self::LockedByGroupOnly,
            (true, Some(true)) => Self::LockedByGroupAndSelf,
            (true, Some(false)) => Self::LockedByGroupAndOther,
        }
    }

    /// Returns `true` if a group lock is part of this status.
    pub fn group_locked(self) -> bool {
        matches!(
            self,
            Self::LockedByGroupOnly | Self::LockedByGroupAndSelf | Self::LockedByGroupAndOther
        )
    }

    /// Returns `true` if the viewer holds the individual lock.
    pub fn held_by_viewer(self) -> bool {
        matches!(self, Self::LockedBySelf | Self::LockedByGroupAndSelf)
    }
}

/// Returns `true` if a lock stamped at `timestamp` has outlived the
/// inactivity timeout at instant `now`.
///
/// The boundary is exclusive: a lock aged exactly `timeout_mins` is still
/// held; reclamation requires strictly more.
pub fn is_expired(timestamp: Timestamp, now: Timestamp, timeout_mins: i64) -> bool {
    now - timestamp > chrono::Duration::minutes(timeout_mins)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
