//! Role-based landing and dashboard access.

use crate::models::{Role, Session};

pub const LOGIN_PATH: &str = "/login";

pub fn dashboard_path(role: Role) -> String {
    format!("/dashboard/{}", role)
}

/// Landing path for a (possibly absent) session.
pub fn resolve_dashboard(session: Option<&Session>) -> String {
    match session {
        Some(session) => dashboard_path(session.user.role),
        None => LOGIN_PATH.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAccess {
    Allow,
    Redirect(String),
}

/// Only the matching role may view a dashboard; everyone else is sent to
/// their own landing path.
pub fn guard_dashboard(session: Option<&Session>, requested: Role) -> DashboardAccess {
    match session {
        Some(session) if session.user.role == requested => DashboardAccess::Allow,
        other => DashboardAccess::Redirect(resolve_dashboard(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionUser;

    fn session(role: Role) -> Session {
        Session {
            user: SessionUser {
                id: Some("acc".to_string()),
                name: None,
                email: Some("x@example.com".to_string()),
                image: None,
                role,
                fees_are_current: None,
            },
            expires: None,
        }
    }

    #[test]
    fn test_resolve_dashboard() {
        assert_eq!(resolve_dashboard(None), "/login");
        assert_eq!(resolve_dashboard(Some(&session(Role::Teacher))), "/dashboard/teacher");
        assert_eq!(resolve_dashboard(Some(&session(Role::Owner))), "/dashboard/owner");
    }

    #[test]
    fn test_guard_dashboard() {
        let student = session(Role::Student);

        assert_eq!(guard_dashboard(Some(&student), Role::Student), DashboardAccess::Allow);
        assert_eq!(
            guard_dashboard(Some(&student), Role::Admin),
            DashboardAccess::Redirect("/dashboard/student".to_string())
        );
        assert_eq!(
            guard_dashboard(None, Role::Teacher),
            DashboardAccess::Redirect("/login".to_string())
        );
    }
}
