//! Username / password gate against the `users` table.
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::predicate::Predicate;
use crate::db::store::DataStore;
use crate::error::AuthError;
use crate::model::columns::USERS;
use crate::model::{from_rows, UserRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_lowercase()).as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AuthError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::NotAdmin(self.username.clone()))
        }
    }
}

/// Lowercase hex SHA-256 of the password, as stored in `password_hash`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(stored_hash.trim())
}

/// Checks credentials against active users. Any mismatch, unknown user or
/// inactive account yields the same `InvalidCredentials` error.
pub fn authenticate(
    store: &dyn DataStore,
    username: &str,
    password: &str,
) -> Result<AuthenticatedUser, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let rows = store
        .fetch(
            USERS,
            &["username", "email", "password_hash", "role", "is_active"],
            &[Predicate::eq("username", username)],
        )
        .map_err(|e| AuthError::Backend(e.to_string()))?;
    let users: Vec<UserRecord> =
        from_rows(rows).map_err(|e| AuthError::Backend(e.to_string()))?;

    let user = users
        .into_iter()
        .filter(|u| u.is_active)
        .find(|u| {
            u.password_hash
                .as_deref()
                .is_some_and(|h| verify_password(password, h))
        })
        .ok_or(AuthError::InvalidCredentials)?;

    log::info!("User {username} signed in");
    Ok(AuthenticatedUser {
        username: user.username.unwrap_or_else(|| username.to_string()),
        email: user.email,
        role: Role::from_raw(user.role.as_deref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::queries::fixtures::*;

    #[test]
    fn test_hash_password_known_vector() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_authenticate_success_and_role() {
        let store = empty_store();
        insert_user(store.connection(), "admin", "s3cret", "admin", true);
        insert_user(store.connection(), "viewer", "pass", "user", true);

        let admin = authenticate(&store, "admin", "s3cret").unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.email.as_deref(), Some("admin@example.com"));

        let viewer = authenticate(&store, " viewer ", "pass").unwrap();
        assert_eq!(viewer.role, Role::User);
        assert!(matches!(viewer.require_admin(), Err(AuthError::NotAdmin(_))));
    }

    #[test]
    fn test_wrong_password_unknown_user_and_inactive_look_the_same() {
        let store = empty_store();
        insert_user(store.connection(), "admin", "s3cret", "admin", true);
        insert_user(store.connection(), "gone", "pw", "user", false);

        for (u, p) in [("admin", "nope"), ("ghost", "s3cret"), ("gone", "pw")] {
            let err = authenticate(&store, u, p).unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "Invalid username or password.");
        }
    }

    #[test]
    fn test_empty_fields() {
        let store = empty_store();
        assert!(matches!(
            authenticate(&store, "", "x"),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            authenticate(&store, "admin", ""),
            Err(AuthError::MissingCredentials)
        ));
    }
}
