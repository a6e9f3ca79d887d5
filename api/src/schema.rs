use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, ID, MergedObject, Schema};
use chrono::Utc;
use platform_api::{ApiError, internal_error, validation_error};
use platform_genai::{GenAiError, ModelClient};
use sea_orm::{DatabaseConnection, DbErr, SqlErr, prelude::DateTimeWithTimeZone};
use uuid::Uuid;

use crate::{
    assessments::{AssessmentsMutation, AssessmentsQuery},
    assistant::{AssistantMutation, AssistantQuery},
    attendance::{AttendanceMutation, AttendanceQuery},
    auth::{AuthConfig, CurrentUser, UserRole},
    directory::{DirectoryMutation, DirectoryQuery},
    helpdesk::{HelpdeskMutation, HelpdeskQuery},
    learning::{LearningMutation, LearningQuery},
    leave::{LeaveMutation, LeaveQuery},
    notifications::{NotificationsMutation, NotificationsQuery},
    payroll::{PayrollMutation, PayrollQuery},
    recruitment::{RecruitmentMutation, RecruitmentQuery},
    users::{UsersMutation, UsersQuery},
};

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

#[derive(MergedObject, Default)]
pub struct QueryRoot(
    UsersQuery,
    DirectoryQuery,
    LeaveQuery,
    PayrollQuery,
    AttendanceQuery,
    RecruitmentQuery,
    LearningQuery,
    HelpdeskQuery,
    AssessmentsQuery,
    NotificationsQuery,
    AssistantQuery,
);

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    UsersMutation,
    DirectoryMutation,
    LeaveMutation,
    PayrollMutation,
    AttendanceMutation,
    RecruitmentMutation,
    LearningMutation,
    HelpdeskMutation,
    AssessmentsMutation,
    NotificationsMutation,
    AssistantMutation,
);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    genai: Arc<dyn ModelClient>,
) -> AppSchema {
    let schema = Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(db)
        .data(auth)
        .data(genai)
        .limit_depth(12)
        .finish();
    AppSchema(schema)
}

/// Tenant slug taken from the request's subdomain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantTag(pub String);

pub(crate) const DEFAULT_PAGE: i32 = 25;
pub(crate) const MAX_PAGE: i32 = 100;

pub(crate) fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| internal_error(anyhow::anyhow!("missing database connection")))
}

pub(crate) fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| internal_error(anyhow::anyhow!("missing auth configuration")))
}

pub(crate) fn model_client(ctx: &Context<'_>) -> async_graphql::Result<Arc<dyn ModelClient>> {
    ctx.data::<Arc<dyn ModelClient>>()
        .cloned()
        .map_err(|_| internal_error(anyhow::anyhow!("missing model client")))
}

pub(crate) fn current_user(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data::<CurrentUser>()
        .cloned()
        .map_err(|_| ApiError::Unauthenticated.extend())
}

pub(crate) fn require_any(
    ctx: &Context<'_>,
    roles: &[UserRole],
) -> async_graphql::Result<CurrentUser> {
    let user = current_user(ctx)?;
    if user.has_any(roles) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden.extend())
    }
}

/// The caller's linked employee id.
pub(crate) fn own_employee(user: &CurrentUser) -> async_graphql::Result<Uuid> {
    user.employee_id
        .ok_or_else(|| validation_error("account is not linked to an employee"))
}

/// Resolves an optional employee argument. Callers holding one of
/// `privileged` may name anyone; everyone else gets their own record.
pub(crate) fn target_employee(
    user: &CurrentUser,
    requested: Option<Uuid>,
    privileged: &[UserRole],
) -> async_graphql::Result<Uuid> {
    match requested {
        Some(id) if user.is_self(id) || user.has_any(privileged) => Ok(id),
        Some(_) => Err(ApiError::Forbidden.extend()),
        None => own_employee(user),
    }
}

pub(crate) fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| validation_error("invalid id"))
}

pub(crate) fn parse_optional_id(value: Option<&ID>) -> async_graphql::Result<Option<Uuid>> {
    value.map(parse_uuid).transpose()
}

pub(crate) fn page_window(first: Option<i32>, offset: Option<i32>) -> async_graphql::Result<(u64, u64)> {
    let first = first.unwrap_or(DEFAULT_PAGE);
    if first < 1 {
        return Err(validation_error("first must be positive"));
    }
    if first > MAX_PAGE {
        return Err(
            ApiError::LimitExceeded(format!("first must be at most {MAX_PAGE}")).extend(),
        );
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(validation_error("offset must not be negative"));
    }
    Ok((first as u64, offset as u64))
}

pub(crate) fn db_error(err: DbErr) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::conflict("record already exists").extend()
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            validation_error("referenced record does not exist")
        }
        _ => internal_error(err),
    }
}

pub(crate) fn ai_error(err: GenAiError) -> Error {
    match err {
        GenAiError::InvalidInput(message) => validation_error(message),
        other => ApiError::ai_service(other.into()).extend(),
    }
}

pub(crate) fn not_found(what: &'static str) -> Error {
    ApiError::NotFound(what).extend()
}

pub(crate) fn conflict(message: impl Into<String>) -> Error {
    ApiError::conflict(message).extend()
}

pub(crate) fn forbidden() -> Error {
    ApiError::Forbidden.extend()
}

/// Trims `value` and checks it is non-empty and at most `max` characters.
pub(crate) fn required_text(field: &str, value: &str, max: usize) -> async_graphql::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(validation_error(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`] but blank input becomes `None`.
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max: usize,
) -> async_graphql::Result<Option<String>> {
    match value {
        Some(v) if !v.trim().is_empty() => required_text(field, &v, max).map(Some),
        _ => Ok(None),
    }
}

pub(crate) fn normalize_email(value: &str) -> async_graphql::Result<String> {
    let trimmed = value.trim().to_lowercase();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid || trimmed.len() > 254 {
        return Err(validation_error("invalid email address"));
    }
    Ok(trimmed)
}

pub(crate) fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(err: &Error) -> String {
        err.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .map(|v| v.to_string().trim_matches('"').to_string())
            .unwrap_or_default()
    }

    #[test]
    fn page_window_bounds() {
        assert_eq!(page_window(None, None).unwrap(), (25, 0));
        assert_eq!(page_window(Some(100), Some(5)).unwrap(), (100, 5));
        assert_eq!(code(&page_window(Some(101), None).unwrap_err()), "LIMIT_EXCEEDED");
        assert_eq!(code(&page_window(Some(0), None).unwrap_err()), "VALIDATION");
        assert_eq!(code(&page_window(None, Some(-1)).unwrap_err()), "VALIDATION");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email(" Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
    }

    #[test]
    fn text_fields_are_trimmed_and_bounded() {
        assert_eq!(required_text("name", "  Ops ", 10).unwrap(), "Ops");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdef", 5).is_err());
        assert_eq!(optional_text("note", Some("  ".into()), 5).unwrap(), None);
    }

    #[test]
    fn target_employee_enforces_ownership() {
        let own = Uuid::new_v4();
        let user = CurrentUser {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            employee_id: Some(own),
            roles: vec![UserRole::Employee],
        };
        assert_eq!(target_employee(&user, None, &[UserRole::Hr]).unwrap(), own);
        assert_eq!(target_employee(&user, Some(own), &[UserRole::Hr]).unwrap(), own);
        let err = target_employee(&user, Some(Uuid::new_v4()), &[UserRole::Hr]).unwrap_err();
        assert_eq!(code(&err), "FORBIDDEN");
    }

    #[test]
    fn ai_input_errors_are_validation() {
        let err = ai_error(GenAiError::InvalidInput("photo must be a data URI".into()));
        assert_eq!(code(&err), "VALIDATION");
        assert_eq!(code(&ai_error(GenAiError::Disabled)), "AI_SERVICE");
    }
}
