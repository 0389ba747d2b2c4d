/// Canonical form used for every account lookup and insert.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
