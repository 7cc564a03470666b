//! Requester identity and role checks
//!
//! Both permission predicates are pure functions of the requester and the
//! timesheet owner.

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    SchoolAdmin,
    HqStaff,
    CentreLead,
    CentreManager,
    CentreStaff,
    Teacher,
}

impl_domain_status_conversions!(Role {
    SchoolAdmin => "USER_GROUP_SCHOOL_ADMIN",
    HqStaff => "ROLE_HQ_STAFF",
    CentreLead => "ROLE_CENTRE_LEAD",
    CentreManager => "ROLE_CENTRE_MANAGER",
    CentreStaff => "ROLE_CENTRE_STAFF",
    Teacher => "ROLE_TEACHER",
});

impl Role {
    /// Roles allowed to approve and confirm timesheets.
    pub const ELEVATED: [Self; 2] = [Self::SchoolAdmin, Self::HqStaff];

    #[must_use]
    pub fn is_elevated(&self) -> bool {
        Self::ELEVATED.contains(self)
    }
}

/// Authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl Requester {
    #[must_use]
    pub fn new(user_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self { user_id: user_id.into(), roles }
    }

    /// Identity used for system-initiated work such as lesson reconciliation.
    #[must_use]
    pub fn system(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Vec::new())
    }

    #[must_use]
    pub fn is_owner(&self, staff_id: &str) -> bool {
        !self.user_id.is_empty() && self.user_id == staff_id
    }

    /// Holds an approver/confirmer role.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        self.roles.iter().any(Role::is_elevated)
    }
}
