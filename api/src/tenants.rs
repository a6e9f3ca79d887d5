//! Tenant provisioning, exposed over REST by the server.

use chrono::{DateTime, Utc};
use entity::{app_user, tenant, user_role};
use platform_api::ApiError;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{generate_password, hash_password},
    users::MIN_PASSWORD_LEN,
};

pub const SLUG_MIN_LEN: usize = 3;
pub const SLUG_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionTenant {
    pub slug: String,
    pub name: String,
    pub admin_email: String,
    pub admin_name: String,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<tenant::Model> for TenantSummary {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            name: model.name,
            is_active: model.is_active,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedTenant {
    pub tenant: TenantSummary,
    pub admin_user_id: Uuid,
    pub admin_email: String,
    /// Present only when the caller did not choose a password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_password: Option<String>,
}

/// Lowercases and checks a tenant slug: 3–32 characters of `[a-z0-9-]`,
/// not starting or ending with `-`.
pub fn validate_slug(raw: &str) -> Result<String, ApiError> {
    let slug = raw.trim().to_lowercase();
    let len = slug.chars().count();
    if !(SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&len) {
        return Err(ApiError::validation(format!(
            "slug must be {SLUG_MIN_LEN}-{SLUG_MAX_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ApiError::validation(
            "slug may only contain lowercase letters, digits and '-'",
        ));
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(ApiError::validation("slug must not start or end with '-'"));
    }
    Ok(slug)
}

fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn db(err: sea_orm::DbErr) -> ApiError {
    ApiError::internal(err.into())
}

pub async fn list_tenants(db_conn: &DatabaseConnection) -> Result<Vec<TenantSummary>, ApiError> {
    let rows = tenant::Entity::find()
        .order_by_asc(tenant::Column::Slug)
        .all(db_conn)
        .await
        .map_err(db)?;
    Ok(rows.into_iter().map(TenantSummary::from).collect())
}

/// Creates a tenant with its first `ADMIN` account.
pub async fn provision_tenant(
    db_conn: &DatabaseConnection,
    input: ProvisionTenant,
) -> Result<ProvisionedTenant, ApiError> {
    let slug = validate_slug(&input.slug)?;
    let name = required("name", &input.name)?;
    let admin_name = required("adminName", &input.admin_name)?;
    let admin_email = input.admin_email.trim().to_lowercase();
    if !admin_email.contains('@') {
        return Err(ApiError::validation("adminEmail is not a valid email"));
    }
    let (password, generated) = match input.admin_password {
        Some(password) if !password.is_empty() => {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(ApiError::validation(format!(
                    "adminPassword must be at least {MIN_PASSWORD_LEN} characters"
                )));
            }
            (password, false)
        }
        _ => (generate_password(), true),
    };

    let existing = tenant::Entity::find()
        .filter(tenant::Column::Slug.eq(slug.clone()))
        .one(db_conn)
        .await
        .map_err(db)?;
    if existing.is_some() {
        return Err(ApiError::conflict(format!("tenant {slug} already exists")));
    }

    let password_hash = hash_password(&password)
        .map_err(|err| ApiError::internal(anyhow::anyhow!("password hash: {err}")))?;
    let timestamp: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    let txn = db_conn.begin().await.map_err(db)?;
    let tenant = tenant::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug),
        name: Set(name),
        is_active: Set(true),
        created_at: Set(timestamp),
    }
    .insert(&txn)
    .await
    .map_err(db)?;
    let admin = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant.id),
        email: Set(admin_email),
        display_name: Set(admin_name),
        password_hash: Set(password_hash),
        employee_id: Set(None),
        is_active: Set(true),
        created_at: Set(timestamp),
        updated_at: Set(timestamp),
    }
    .insert(&txn)
    .await
    .map_err(db)?;
    user_role::ActiveModel {
        user_id: Set(admin.id),
        role: Set(user_role::Role::Admin),
    }
    .insert(&txn)
    .await
    .map_err(db)?;
    txn.commit().await.map_err(db)?;

    info!(tenant = %tenant.slug, "tenant provisioned");
    Ok(ProvisionedTenant {
        tenant: tenant.into(),
        admin_user_id: admin.id,
        admin_email: admin.email,
        generated_password: generated.then_some(password),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_follow_the_subdomain_rules() {
        assert_eq!(validate_slug(" Acme-HR ").unwrap(), "acme-hr");
        assert_eq!(validate_slug("a1b").unwrap(), "a1b");
        for bad in ["ab", "-acme", "acme-", "acme_hr", "ac me", "x".repeat(33).as_str()] {
            assert!(
                matches!(validate_slug(bad), Err(ApiError::Validation(_))),
                "{bad}"
            );
        }
    }
}
