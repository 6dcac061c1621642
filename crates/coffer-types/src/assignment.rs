//! permission assignments: the single edge type of the permission graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AssignmentId, Identity, Permission, Pid, PidKind, Resource};

/// grants one identity one permission level on one resource.
///
/// at most one assignment exists per (identity, resource) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAssignment {
    /// internal key.
    pub id: AssignmentId,

    /// public identifier.
    pub pid: Pid,

    /// the holder.
    pub identity: Identity,

    /// public identifier of the holder.
    pub identity_pid: Pid,

    /// the target.
    pub resource: Resource,

    /// public identifier of the target.
    pub resource_pid: Pid,

    /// the level held.
    pub permission: Permission,

    /// when the assignment was created.
    pub created_at: DateTime<Utc>,

    /// when the level last changed.
    pub updated_at: DateTime<Utc>,
}

impl PermissionAssignment {
    /// create a new, unsaved assignment with a fresh pid.
    pub fn new(
        identity: Identity,
        identity_pid: Pid,
        resource: Resource,
        resource_pid: Pid,
        permission: Permission,
    ) -> Self {
        Self::with_pid(
            Pid::generate(PidKind::Assignment),
            identity,
            identity_pid,
            resource,
            resource_pid,
            permission,
        )
    }

    /// create a new, unsaved assignment with the given pid.
    pub fn with_pid(
        pid: Pid,
        identity: Identity,
        identity_pid: Pid,
        resource: Resource,
        resource_pid: Pid,
        permission: Permission,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AssignmentId(0),
            pid,
            identity,
            identity_pid,
            resource,
            resource_pid,
            permission,
            created_at: now,
            updated_at: now,
        }
    }
}
