use std::collections::HashMap;

use async_graphql::{Context, ErrorExtensions, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{app_user, employee, user_role};
use platform_api::{ApiError, internal_error, validation_error};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, Func},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{
        UserRole, hash_password, issue_token, load_roles, session_cookie, verify_password,
    },
    schema::{
        TenantTag, auth_config, conflict, current_user, database, db_error, forbidden,
        normalize_email, not_found, now, page_window, parse_optional_id, parse_uuid,
        require_any, required_text,
    },
};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub tenant_id: ID,
    pub email: String,
    pub display_name: String,
    pub employee_id: Option<ID>,
    pub is_active: bool,
    pub roles: Vec<UserRole>,
    pub created_at: DateTime<Utc>,
}

impl UserNode {
    pub(crate) fn from_model(model: app_user::Model, roles: Vec<UserRole>) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            tenant_id: ID::from(model.tenant_id.to_string()),
            email: model.email,
            display_name: model.display_name,
            employee_id: model.employee_id.map(|id| ID::from(id.to_string())),
            is_active: model.is_active,
            roles,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Default)]
pub struct AuthPayload {
    pub ok: bool,
    pub token: Option<String>,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewUserInput {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub roles: Vec<UserRole>,
    pub employee_id: Option<ID>,
}

pub(crate) fn validate_password(password: &str) -> async_graphql::Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(validation_error(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[derive(Default)]
pub struct UsersQuery;

#[Object]
impl UsersQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserNode> {
        let viewer = current_user(ctx)?;
        let db = database(ctx)?;
        let model = app_user::Entity::find_by_id(viewer.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| ApiError::Unauthenticated.extend())?;
        Ok(UserNode::from_model(model, viewer.roles))
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        let viewer = require_any(ctx, &[UserRole::Admin])?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let mut query =
            app_user::Entity::find().filter(app_user::Column::TenantId.eq(viewer.tenant_id));
        if let Some(q) = q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(app_user::Column::Email))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(app_user::Column::DisplayName))).like(pattern)),
            );
        }
        let records = query
            .order_by_asc(app_user::Column::Email)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        let ids: Vec<Uuid> = records.iter().map(|u| u.id).collect();
        let mut role_map: HashMap<Uuid, Vec<UserRole>> = HashMap::new();
        if !ids.is_empty() {
            let rows = user_role::Entity::find()
                .filter(user_role::Column::UserId.is_in(ids))
                .all(db.as_ref())
                .await
                .map_err(db_error)?;
            for row in rows {
                role_map.entry(row.user_id).or_default().push(row.role.into());
            }
        }
        Ok(records
            .into_iter()
            .map(|model| {
                let roles = role_map.remove(&model.id).unwrap_or_default();
                UserNode::from_model(model, roles)
            })
            .collect())
    }
}

#[derive(Default)]
pub struct UsersMutation;

#[Object]
impl UsersMutation {
    /// Tenant resolution: `tenantSlug`, then the request subdomain, then the
    /// configured default tenant.
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
        tenant_slug: Option<String>,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        let db = database(ctx)?;
        let slug = tenant_slug
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .or_else(|| ctx.data_opt::<TenantTag>().map(|tag| tag.0.clone()))
            .unwrap_or_else(|| auth.default_tenant_slug.clone());
        let Some(tenant) = platform_db::find_tenant_by_slug(db.as_ref(), &slug)
            .await
            .map_err(db_error)?
            .filter(|t| t.is_active)
        else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        let Ok(email) = normalize_email(&email) else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        let user = app_user::Entity::find()
            .filter(app_user::Column::TenantId.eq(tenant.id))
            .filter(app_user::Column::Email.eq(email))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(user) = user.filter(|u| verify_password(&password, &u.password_hash)) else {
            return Ok(AuthPayload::failed("Invalid credentials"));
        };
        if !user.is_active {
            return Ok(AuthPayload::failed("Account disabled"));
        }
        let roles = load_roles(db.as_ref(), user.id).await.map_err(db_error)?;
        let token = issue_token(user.id, tenant.id, &roles, &auth).map_err(internal_error)?;
        ctx.append_http_header("Set-Cookie", session_cookie(&token, &auth));
        info!(user_id = %user.id, tenant = %tenant.slug, "user logged in");
        Ok(AuthPayload {
            ok: true,
            token: Some(token),
            user: Some(UserNode::from_model(user, roles)),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        let auth = auth_config(ctx)?;
        ctx.append_http_header("Set-Cookie", session_cookie("", &auth));
        Ok(true)
    }

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        let viewer = require_any(ctx, &[UserRole::Admin])?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        let display_name = required_text("displayName", &input.display_name, 100)?;
        validate_password(&input.password)?;
        let mut roles = input.roles.clone();
        roles.sort_by_key(|role| *role as u8);
        roles.dedup();
        if roles.is_empty() {
            return Err(validation_error("roles must include at least one entry"));
        }
        if roles.contains(&UserRole::SuperAdmin) && !viewer.is_super_admin() {
            return Err(forbidden());
        }
        let employee_id = parse_optional_id(input.employee_id.as_ref())?;
        if let Some(employee_id) = employee_id {
            employee::Entity::find_by_id(employee_id)
                .filter(employee::Column::TenantId.eq(viewer.tenant_id))
                .one(db.as_ref())
                .await
                .map_err(db_error)?
                .ok_or_else(|| not_found("employee"))?;
        }
        let taken = app_user::Entity::find()
            .filter(app_user::Column::TenantId.eq(viewer.tenant_id))
            .filter(app_user::Column::Email.eq(email.clone()))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        if taken.is_some() {
            return Err(conflict("a user with this email already exists"));
        }
        let password_hash = hash_password(&input.password)
            .map_err(|err| internal_error(anyhow::anyhow!("password hash: {err}")))?;

        let txn = db.begin().await.map_err(db_error)?;
        let timestamp = now();
        let user = app_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(viewer.tenant_id),
            email: Set(email),
            display_name: Set(display_name),
            password_hash: Set(password_hash),
            employee_id: Set(employee_id),
            is_active: Set(true),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        for role in &roles {
            user_role::ActiveModel {
                user_id: Set(user.id),
                role: Set((*role).into()),
            }
            .insert(&txn)
            .await
            .map_err(db_error)?;
        }
        txn.commit().await.map_err(db_error)?;
        Ok(UserNode::from_model(user, roles))
    }

    async fn set_user_active(
        &self,
        ctx: &Context<'_>,
        id: ID,
        active: bool,
    ) -> async_graphql::Result<UserNode> {
        let viewer = require_any(ctx, &[UserRole::Admin])?;
        let db = database(ctx)?;
        let user_id = parse_uuid(&id)?;
        if user_id == viewer.user_id && !active {
            return Err(validation_error("you cannot deactivate your own account"));
        }
        let model = app_user::Entity::find_by_id(user_id)
            .filter(app_user::Column::TenantId.eq(viewer.tenant_id))
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| not_found("user"))?;
        let mut record: app_user::ActiveModel = model.into();
        record.is_active = Set(active);
        record.updated_at = Set(now());
        let updated = record.update(db.as_ref()).await.map_err(db_error)?;
        let roles = load_roles(db.as_ref(), updated.id).await.map_err(db_error)?;
        Ok(UserNode::from_model(updated, roles))
    }
}
