//! JWT issuing/decoding and the role checks guarding the API and pages.

use actix_web::HttpRequest;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use std::str::FromStr;

use crate::config::Config;
use crate::db::MongoDB;
use crate::error::AppError;
use crate::models::{Claims, Role, User};

/// Cookie carrying the token for the HTML pages.
pub const AUTH_COOKIE: &str = "auth_token";

/// Who may send non-safe requests to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Authenticated,
    Staff,
    Superuser,
}

impl WritePolicy {
    pub fn allows(self, role: Role) -> bool {
        match self {
            WritePolicy::Authenticated => true,
            WritePolicy::Staff => role.is_staff(),
            WritePolicy::Superuser => role == Role::Superuser,
        }
    }
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authenticated" => Ok(WritePolicy::Authenticated),
            "staff" => Ok(WritePolicy::Staff),
            "superuser" => Ok(WritePolicy::Superuser),
            other => Err(format!(
                "unknown policy {other:?}, expected authenticated, staff or superuser"
            )),
        }
    }
}

pub fn issue_token(
    user_id: &str,
    username: &str,
    role: Role,
    config: &Config,
) -> Result<String, AppError> {
    let expiration = chrono::Utc::now() + chrono::Duration::hours(config.token_ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        role,
        exp: expiration.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )?;
    Ok(token)
}

pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    ) {
        Ok(token_data) => {
            debug!("Token decoded successfully for user: {}", token_data.claims.sub);
            Some(token_data.claims)
        }
        Err(e) => {
            debug!("Token decoding failed: {:?}", e);
            None
        }
    }
}

// Bearer header wins over the page cookie.
fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(header) = req.headers().get("Authorization") {
        return match header.to_str() {
            Ok(value) if value.starts_with("Bearer ") => Some(value[7..].to_string()),
            _ => {
                debug!("Invalid Authorization header format");
                None
            }
        };
    }
    req.cookie(AUTH_COOKIE).map(|c| c.value().to_string())
}

/// Claims carried by the request, without consulting the store.
pub fn current_user(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = request_token(req)?;
    decode_token(&token, &config.jwt_secret)
}

/// Brings token claims in line with the stored account: a deleted account
/// loses access, a changed role or username takes effect immediately.
pub fn refresh_claims(mut claims: Claims, stored: Option<&User>) -> Result<Claims, AppError> {
    let Some(user) = stored else {
        debug!("Account {} behind a valid token no longer exists", claims.sub);
        return Err(AppError::Unauthorized);
    };
    claims.username = user.username.clone();
    claims.role = user.role;
    Ok(claims)
}

pub async fn require_user(
    req: &HttpRequest,
    db: &MongoDB,
    config: &Config,
) -> Result<Claims, AppError> {
    let claims = current_user(req, config).ok_or(AppError::Unauthorized)?;
    let stored = db.find_user(&claims.sub).await?;
    refresh_claims(claims, stored.as_ref())
}

fn permit(claims: Claims, policy: WritePolicy, req: &HttpRequest) -> Result<Claims, AppError> {
    if policy.allows(claims.role) {
        return Ok(claims);
    }
    debug!(
        "User {} with role {} denied {} {}",
        claims.username,
        claims.role,
        req.method(),
        req.path()
    );
    Err(AppError::Forbidden)
}

/// Gate for API writes: a live account whose stored role the configured
/// write policy accepts.
pub async fn authorize(
    req: &HttpRequest,
    db: &MongoDB,
    config: &Config,
) -> Result<Claims, AppError> {
    let claims = require_user(req, db, config).await?;
    permit(claims, config.write_policy, req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    fn config(policy: WritePolicy) -> Config {
        let mut cfg = Config::from_lookup(|_| None).unwrap();
        cfg.jwt_secret = "test-secret".to_string();
        cfg.write_policy = policy;
        cfg
    }

    #[test]
    fn token_round_trip() {
        let cfg = config(WritePolicy::Superuser);
        let token = issue_token("abc", "ivan", Role::Staff, &cfg).unwrap();
        let claims = decode_token(&token, &cfg.jwt_secret).unwrap();
        assert_eq!(claims.sub, "abc");
        assert_eq!(claims.username, "ivan");
        assert_eq!(claims.role, Role::Staff);
        assert!(decode_token(&token, "other-secret").is_none());
    }

    #[test]
    fn policy_matrix() {
        assert!(WritePolicy::Authenticated.allows(Role::User));
        assert!(!WritePolicy::Staff.allows(Role::User));
        assert!(WritePolicy::Staff.allows(Role::Superuser));
        assert!(!WritePolicy::Superuser.allows(Role::Staff));
        assert_eq!("STAFF".parse::<WritePolicy>(), Ok(WritePolicy::Staff));
    }

    fn claims(role: Role) -> Claims {
        Claims {
            sub: "65f000000000000000000001".to_string(),
            username: "ivan".to_string(),
            role,
            exp: usize::MAX,
        }
    }

    fn stored(username: &str, role: Role) -> User {
        User {
            id: None,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            created_at: mongodb::bson::DateTime::now(),
            updated_at: mongodb::bson::DateTime::now(),
        }
    }

    async fn offline_db() -> MongoDB {
        MongoDB::new("mongodb://localhost:27017", "bus_stations_offline")
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn writes_without_a_token_are_rejected_before_any_lookup() {
        let cfg = config(WritePolicy::Superuser);
        let db = offline_db().await;
        let anonymous = TestRequest::post().uri("/api/routes/").to_http_request();
        assert!(matches!(
            authorize(&anonymous, &db, &cfg).await,
            Err(AppError::Unauthorized)
        ));
        let forged = TestRequest::delete()
            .uri("/api/routes/1/")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_http_request();
        assert!(matches!(
            authorize(&forged, &db, &cfg).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn stored_role_overrides_the_token() {
        let demoted = refresh_claims(claims(Role::Superuser), Some(&stored("ivan", Role::User)));
        assert_eq!(demoted.unwrap().role, Role::User);

        let renamed = refresh_claims(claims(Role::Staff), Some(&stored("petr", Role::Staff)));
        assert_eq!(renamed.unwrap().username, "petr");
    }

    #[test]
    fn deleted_accounts_lose_access() {
        assert!(matches!(
            refresh_claims(claims(Role::Superuser), None),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn policy_is_checked_against_the_role() {
        let req = TestRequest::post().uri("/api/routes/").to_http_request();
        assert!(matches!(
            permit(claims(Role::Staff), WritePolicy::Superuser, &req),
            Err(AppError::Forbidden)
        ));
        assert!(permit(claims(Role::Staff), WritePolicy::Staff, &req).is_ok());
        assert!(permit(claims(Role::User), WritePolicy::Authenticated, &req).is_ok());
    }

    #[test]
    fn cookie_token_is_accepted() {
        let cfg = config(WritePolicy::Authenticated);
        let token = issue_token("abc", "ivan", Role::User, &cfg).unwrap();
        let req = TestRequest::get()
            .cookie(Cookie::new(AUTH_COOKIE, token))
            .to_http_request();
        assert_eq!(current_user(&req, &cfg).unwrap().username, "ivan");
    }

    #[test]
    fn malformed_header_is_rejected() {
        let cfg = config(WritePolicy::Authenticated);
        let req = TestRequest::put()
            .insert_header(("Authorization", "Token abc"))
            .to_http_request();
        assert!(current_user(&req, &cfg).is_none());
    }
}
