use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when interpreting role values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

//
// ─── ROLE ─────────────────────────────────────────────────────────────────────
//

/// Organizational role carried by an authenticated caller.
///
/// Roles are flat labels; what a caller may do is decided by [`Capability`]
/// predicates, never by comparing roles against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Mentor,
    Employee,
    TeamLead,
    LdManager,
}

impl Role {
    /// Canonical string form, as persisted and exchanged with collaborators.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Mentor => "MENTOR",
            Role::Employee => "EMPLOYEE",
            Role::TeamLead => "TEAM_LEAD",
            Role::LdManager => "LD_MANAGER",
        }
    }

    /// Parses the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::UnknownRole` for any other input.
    pub fn parse(value: &str) -> Result<Self, RoleError> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "MENTOR" => Ok(Role::Mentor),
            "EMPLOYEE" => Ok(Role::Employee),
            "TEAM_LEAD" => Ok(Role::TeamLead),
            "LD_MANAGER" => Ok(Role::LdManager),
            other => Err(RoleError::UnknownRole(other.to_string())),
        }
    }
}

//
// ─── CAPABILITIES ─────────────────────────────────────────────────────────────
//

/// Named permission sets checked by service operations.
///
/// Each capability is a predicate over [`Role`]. There is no inheritance:
/// an admin can take courses because `TakeCourses` lists every role, not
/// because Admin outranks anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Enroll in courses, watch lessons, record progress.
    TakeCourses,
    /// Assign courses to other users.
    AssignCourses,
    /// Create courses and author lessons.
    ManageCourses,
}

impl Capability {
    /// Returns true when the given role is in this capability's set.
    #[must_use]
    pub fn allows(self, role: Role) -> bool {
        match self {
            Capability::TakeCourses => true,
            Capability::AssignCourses => matches!(role, Role::Admin),
            Capability::ManageCourses => matches!(role, Role::Admin | Role::LdManager),
        }
    }
}

//
// ─── AUTHENTICATED USER ───────────────────────────────────────────────────────
//

/// Identity handed in by the authentication collaborator.
///
/// This is the only caller identity the engine accepts; a bare user id is
/// never treated as equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub role: Role,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Returns true when this caller holds the capability.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        capability.allows(self.role)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_string_roundtrip() {
        for role in [
            Role::Admin,
            Role::Mentor,
            Role::Employee,
            Role::TeamLead,
            Role::LdManager,
        ] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn role_parse_rejects_unknown() {
        let err = Role::parse("SUPERUSER").unwrap_err();
        assert!(matches!(err, RoleError::UnknownRole(_)));
    }

    #[test]
    fn every_role_can_take_courses() {
        for role in [
            Role::Admin,
            Role::Mentor,
            Role::Employee,
            Role::TeamLead,
            Role::LdManager,
        ] {
            assert!(Capability::TakeCourses.allows(role));
        }
    }

    #[test]
    fn only_admin_assigns_courses() {
        assert!(Capability::AssignCourses.allows(Role::Admin));
        assert!(!Capability::AssignCourses.allows(Role::Mentor));
        assert!(!Capability::AssignCourses.allows(Role::Employee));
        assert!(!Capability::AssignCourses.allows(Role::TeamLead));
        assert!(!Capability::AssignCourses.allows(Role::LdManager));
    }

    #[test]
    fn course_management_is_admin_or_ld_manager() {
        assert!(Capability::ManageCourses.allows(Role::Admin));
        assert!(Capability::ManageCourses.allows(Role::LdManager));
        assert!(!Capability::ManageCourses.allows(Role::Employee));
        assert!(!Capability::ManageCourses.allows(Role::TeamLead));
    }

    #[test]
    fn authenticated_user_checks_capability() {
        let admin = AuthenticatedUser::new(UserId::new(1), Role::Admin);
        assert!(admin.can(Capability::AssignCourses));

        let employee = AuthenticatedUser::new(UserId::new(2), Role::Employee);
        assert!(employee.can(Capability::TakeCourses));
        assert!(!employee.can(Capability::ManageCourses));
    }
}
