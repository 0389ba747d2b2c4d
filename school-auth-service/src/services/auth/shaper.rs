use chrono::{DateTime, Utc};

use crate::models::{Session, SessionToken, SessionUser};

/// Project a session token onto the client-visible session.
pub fn shape(token: &SessionToken, expires: Option<DateTime<Utc>>) -> Session {
    Session {
        user: SessionUser {
            id: token.account_id.clone(),
            name: token.name.clone(),
            email: token.email.clone(),
            image: token.avatar_url.clone(),
            role: token.role.unwrap_or_default(),
            fees_are_current: token.fees_are_current,
        },
        expires,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_role_defaults_to_student() {
        let session = shape(&SessionToken::default(), None);
        assert_eq!(session.user.role, Role::Student);
        assert!(session.user.id.is_none());
    }

    #[test]
    fn test_fields_renamed_for_client() {
        let token = SessionToken {
            name: Some("Olga".to_string()),
            email: Some("olga@example.com".to_string()),
            account_id: Some("acc-9".to_string()),
            role: Some(Role::Owner),
            avatar_url: Some("https://img/o.png".to_string()),
            fees_are_current: Some(false),
        };

        let json = serde_json::to_value(shape(&token, None)).unwrap();
        assert_eq!(json["user"]["id"], "acc-9");
        assert_eq!(json["user"]["image"], "https://img/o.png");
        assert_eq!(json["user"]["role"], "owner");
        assert_eq!(json["user"]["feesAreCurrent"], false);
        assert!(json["user"].get("passwordHash").is_none());
    }
}
