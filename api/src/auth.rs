use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_graphql::Enum;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use entity::{app_user, tenant, user_role};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use platform_api::ApiError;
use rand::{Rng, distributions::Alphanumeric, rngs::OsRng};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "optitalent_session";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    /// Tenant used by `login` when neither an argument nor a subdomain names one.
    pub default_tenant_slug: String,
    pub secure_cookies: bool,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub tid: Uuid,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Enum, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Hr,
    Manager,
    Employee,
    Trainee,
    Recruiter,
    QaAnalyst,
}

impl UserRole {
    pub const ALL: [UserRole; 8] = [
        UserRole::SuperAdmin,
        UserRole::Admin,
        UserRole::Hr,
        UserRole::Manager,
        UserRole::Employee,
        UserRole::Trainee,
        UserRole::Recruiter,
        UserRole::QaAnalyst,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "SUPER_ADMIN",
            UserRole::Admin => "ADMIN",
            UserRole::Hr => "HR",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
            UserRole::Trainee => "TRAINEE",
            UserRole::Recruiter => "RECRUITER",
            UserRole::QaAnalyst => "QA_ANALYST",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value))
    }
}

impl From<user_role::Role> for UserRole {
    fn from(value: user_role::Role) -> Self {
        match value {
            user_role::Role::SuperAdmin => UserRole::SuperAdmin,
            user_role::Role::Admin => UserRole::Admin,
            user_role::Role::Hr => UserRole::Hr,
            user_role::Role::Manager => UserRole::Manager,
            user_role::Role::Employee => UserRole::Employee,
            user_role::Role::Trainee => UserRole::Trainee,
            user_role::Role::Recruiter => UserRole::Recruiter,
            user_role::Role::QaAnalyst => UserRole::QaAnalyst,
        }
    }
}

impl From<UserRole> for user_role::Role {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::SuperAdmin => user_role::Role::SuperAdmin,
            UserRole::Admin => user_role::Role::Admin,
            UserRole::Hr => user_role::Role::Hr,
            UserRole::Manager => user_role::Role::Manager,
            UserRole::Employee => user_role::Role::Employee,
            UserRole::Trainee => user_role::Role::Trainee,
            UserRole::Recruiter => user_role::Role::Recruiter,
            UserRole::QaAnalyst => user_role::Role::QaAnalyst,
        }
    }
}

/// The authenticated caller, re-read from the database on every request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    pub fn is_super_admin(&self) -> bool {
        self.roles.contains(&UserRole::SuperAdmin)
    }

    /// `SUPER_ADMIN` passes every check and `ADMIN` every tenant-level one.
    pub fn has_role(&self, role: UserRole) -> bool {
        if self.is_super_admin() || self.roles.contains(&role) {
            return true;
        }
        role != UserRole::SuperAdmin && self.roles.contains(&UserRole::Admin)
    }

    pub fn has_any(&self, roles: &[UserRole]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }

    /// Whether `employee_id` is the caller's own employee record.
    pub fn is_self(&self, employee_id: Uuid) -> bool {
        self.employee_id == Some(employee_id)
    }
}

pub fn issue_token(
    user_id: Uuid,
    tenant_id: Uuid,
    roles: &[UserRole],
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        tid: tenant_id,
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

/// Validates `token` and reloads its user. Role claims inside the token are
/// ignored; the database is authoritative.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    config: &AuthConfig,
    token: &str,
) -> Result<CurrentUser, ApiError> {
    let claims = decode_token(token, config).map_err(|_| ApiError::Unauthenticated)?;
    let user = app_user::Entity::find_by_id(claims.sub)
        .one(db)
        .await
        .map_err(|err| ApiError::internal(err.into()))?
        .ok_or(ApiError::Unauthenticated)?;
    if !user.is_active || user.tenant_id != claims.tid {
        return Err(ApiError::Unauthenticated);
    }
    let tenant = tenant::Entity::find_by_id(user.tenant_id)
        .one(db)
        .await
        .map_err(|err| ApiError::internal(err.into()))?;
    if !tenant.is_some_and(|t| t.is_active) {
        return Err(ApiError::Unauthenticated);
    }
    let roles = load_roles(db, user.id)
        .await
        .map_err(|err| ApiError::internal(err.into()))?;
    Ok(CurrentUser {
        user_id: user.id,
        tenant_id: user.tenant_id,
        employee_id: user.employee_id,
        roles,
    })
}

pub async fn load_roles<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<UserRole>, sea_orm::DbErr> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    let mut roles: Vec<UserRole> = rows.into_iter().map(|row| row.role.into()).collect();
    roles.sort_by_key(|role| *role as u8);
    Ok(roles)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn generate_password() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// `Set-Cookie` value carrying `token`; an empty token clears the cookie.
pub fn session_cookie(token: &str, config: &AuthConfig) -> String {
    let max_age = if token.is_empty() {
        time::Duration::ZERO
    } else {
        time::Duration::minutes(config.session_ttl_minutes.max(0))
    };
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .max_age(max_age)
        .build()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".into(),
            session_ttl_minutes: 30,
            default_tenant_slug: "default".into(),
            secure_cookies: false,
        }
    }

    fn user(roles: &[UserRole]) -> CurrentUser {
        CurrentUser {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            employee_id: None,
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn token_round_trip_keeps_tenant() {
        let cfg = config();
        let (uid, tid) = (Uuid::new_v4(), Uuid::new_v4());
        let token = issue_token(uid, tid, &[UserRole::Hr], &cfg).unwrap();
        let claims = decode_token(&token, &cfg).unwrap();
        assert_eq!(claims.sub, uid);
        assert_eq!(claims.tid, tid);
        assert_eq!(claims.roles, vec!["HR".to_string()]);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), Uuid::new_v4(), &[], &config()).unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret-another-secret-xx".into(),
            ..config()
        };
        assert!(decode_token(&token, &other).is_err());
    }

    #[test]
    fn admin_passes_tenant_checks_but_not_super_admin() {
        let admin = user(&[UserRole::Admin]);
        assert!(admin.has_role(UserRole::Hr));
        assert!(admin.has_any(&[UserRole::QaAnalyst]));
        assert!(!admin.has_role(UserRole::SuperAdmin));

        let root = user(&[UserRole::SuperAdmin]);
        assert!(root.has_role(UserRole::SuperAdmin));
        assert!(root.has_role(UserRole::Recruiter));

        let trainee = user(&[UserRole::Trainee]);
        assert!(!trainee.has_any(&[UserRole::Hr, UserRole::Manager]));
        assert!(trainee.has_role(UserRole::Trainee));
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!(UserRole::parse("qa_analyst"), Some(UserRole::QaAnalyst));
        assert_eq!(UserRole::parse(" HR "), Some(UserRole::Hr));
        assert_eq!(UserRole::parse("owner"), None);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("x", "not-a-hash"));
    }

    #[test]
    fn generated_passwords_are_long_and_distinct() {
        let a = generate_password();
        assert_eq!(a.len(), 20);
        assert_ne!(a, generate_password());
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = session_cookie("", &config());
        assert!(cookie.starts_with("optitalent_session="));
        assert!(cookie.contains("Max-Age=0"));
        assert!(session_cookie("abc", &config()).contains("Max-Age=1800"));
    }
}
