use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::check_text;
use crate::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Staff,
    Superuser,
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Staff | Role::Superuser)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Superuser => "superuser",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "superuser" => Ok(Role::Superuser),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    /// bcrypt hash.
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

/// Account fields shared by registration and the users API.
pub(crate) fn validate_account(username: &str, email: &str) -> Result<(), AppError> {
    check_text("username", username, 150)?;
    if username.contains(char::is_whitespace) {
        return Err(AppError::Validation(
            "username must not contain spaces".to_string(),
        ));
    }
    check_text("email", email, 254)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(AppError::Validation("email is not valid".to_string())),
    }
}

pub(crate) fn validate_password(password: &str, username: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "password must contain at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "password must not be entirely numeric".to_string(),
        ));
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        return Err(AppError::Validation(
            "password is too similar to the username".to_string(),
        ));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Plain user when absent.
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserInput {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_account(&self.username, &self.email)?;
        validate_password(&self.password, &self.username)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Left unchanged when absent.
    #[serde(default)]
    pub role: Option<Role>,
    /// Left unchanged when absent.
    #[serde(default)]
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_account(&self.username, &self.email)?;
        match &self.password {
            Some(password) => validate_password(password, &self.username),
            None => Ok(()),
        }
    }
}

/// Role an account ends up with when `actor` asks for `requested`.
///
/// Omitting the role keeps `current`; only superusers may grant or revoke
/// roles.
pub fn assign_role(requested: Option<Role>, current: Role, actor: Role) -> Result<Role, AppError> {
    match requested {
        None => Ok(current),
        Some(role) if role == current => Ok(current),
        Some(role) if actor == Role::Superuser => Ok(role),
        Some(_) => Err(AppError::Forbidden),
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserResponse {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_counts_as_staff() {
        assert!(Role::Superuser.is_staff());
        assert!(Role::Staff.is_staff());
        assert!(!Role::User.is_staff());
        assert_eq!("Staff".parse::<Role>(), Ok(Role::Staff));
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn staff_cannot_promote_anyone() {
        assert!(matches!(
            assign_role(Some(Role::Superuser), Role::Staff, Role::Staff),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            assign_role(Some(Role::Staff), Role::User, Role::User),
            Err(AppError::Forbidden)
        ));
        assert_eq!(
            assign_role(Some(Role::Staff), Role::Staff, Role::Staff).unwrap(),
            Role::Staff
        );
        assert_eq!(
            assign_role(Some(Role::Staff), Role::User, Role::Superuser).unwrap(),
            Role::Staff
        );
    }

    #[test]
    fn omitted_role_keeps_the_stored_one() {
        assert_eq!(assign_role(None, Role::Superuser, Role::Superuser).unwrap(), Role::Superuser);
        assert_eq!(assign_role(None, Role::Staff, Role::User).unwrap(), Role::Staff);

        let update: UserUpdate =
            serde_json::from_str(r#"{"username": "ivan", "email": "ivan@example.com"}"#).unwrap();
        assert_eq!(update.role, None);
        let input: UserInput = serde_json::from_str(
            r#"{"username": "ivan", "email": "ivan@example.com", "password": "tula-bus-2024"}"#,
        )
        .unwrap();
        assert_eq!(input.role, None);
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("short", "ivan").is_err());
        assert!(validate_password("1234567890", "ivan").is_err());
        assert!(validate_password("ivanivan", "IvanIvan").is_err());
        assert!(validate_password("tula-bus-2024", "ivan").is_ok());
    }

    #[test]
    fn account_rules() {
        assert!(validate_account("ivan", "ivan@example.com").is_ok());
        assert!(validate_account("ivan petrov", "ivan@example.com").is_err());
        assert!(validate_account("ivan", "not-an-email").is_err());
    }
}
