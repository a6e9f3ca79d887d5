use async_graphql::{Context, ID, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{app_user, notification};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};
use uuid::Uuid;

use crate::schema::{current_user, database, db_error, not_found, now, page_window, parse_uuid};

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Notification")]
pub struct NotificationNode {
    pub id: ID,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notification::Model> for NotificationNode {
    fn from(model: notification::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            body: model.body,
            link: model.link,
            is_read: model.is_read,
            created_at: model.created_at.into(),
        }
    }
}

pub(crate) async fn notify_user<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    user_id: Uuid,
    title: &str,
    body: &str,
    link: Option<String>,
) -> Result<(), DbErr> {
    notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        user_id: Set(user_id),
        title: Set(title.to_string()),
        body: Set(body.to_string()),
        link: Set(link),
        is_read: Set(false),
        created_at: Set(now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Notifies every account linked to `employee_id`. Employees without a login
/// are skipped.
pub(crate) async fn notify_employee<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    employee_id: Uuid,
    title: &str,
    body: &str,
    link: Option<String>,
) -> Result<(), DbErr> {
    let users = app_user::Entity::find()
        .filter(app_user::Column::TenantId.eq(tenant_id))
        .filter(app_user::Column::EmployeeId.eq(employee_id))
        .all(conn)
        .await?;
    for user in users {
        notify_user(conn, tenant_id, user.id, title, body, link.clone()).await?;
    }
    Ok(())
}

#[derive(Default)]
pub struct NotificationsQuery;

#[Object]
impl NotificationsQuery {
    async fn notifications(
        &self,
        ctx: &Context<'_>,
        unread_only: Option<bool>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<NotificationNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let mut query = notification::Entity::find()
            .filter(notification::Column::TenantId.eq(user.tenant_id))
            .filter(notification::Column::UserId.eq(user.user_id));
        if unread_only.unwrap_or(false) {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        let rows = query
            .order_by_desc(notification::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(NotificationNode::from).collect())
    }
}

#[derive(Default)]
pub struct NotificationsMutation;

#[Object]
impl NotificationsMutation {
    async fn mark_notification_read(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<NotificationNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let id = parse_uuid(&id)?;
        let model = notification::Entity::find_by_id(id)
            .filter(notification::Column::UserId.eq(user.user_id))
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| not_found("notification"))?;
        if model.is_read {
            return Ok(model.into());
        }
        let mut active: notification::ActiveModel = model.into();
        active.is_read = Set(true);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Returns the number of notifications that changed.
    async fn mark_all_notifications_read(&self, ctx: &Context<'_>) -> async_graphql::Result<u64> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::TenantId.eq(user.tenant_id))
            .filter(notification::Column::UserId.eq(user.user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected)
    }
}
