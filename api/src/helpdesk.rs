use async_graphql::{Context, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::ticket;
use platform_genai::{
    flows::{
        CategorizeTicket, CategorizeTicketInput, TicketCategory as TriageCategory,
        TicketPriority as TriagePriority,
    },
    run_flow,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, UserRole},
    notifications::notify_user,
    schema::{
        ai_error, conflict, current_user, database, db_error, model_client, not_found, now,
        page_window, parse_uuid, require_any, required_text,
    },
};

const TICKET_HANDLERS: &[UserRole] = &[UserRole::Hr];

graphql_enum!(TicketCategory => ticket::Category { It, Hr, Payroll, Facilities, Other });
graphql_enum!(TicketPriority => ticket::Priority { Low, Medium, High, Urgent });
graphql_enum!(TicketStatus => ticket::Status { Open, InProgress, Resolved, Closed });

fn stored_category(category: TriageCategory) -> ticket::Category {
    match category {
        TriageCategory::It => ticket::Category::It,
        TriageCategory::Hr => ticket::Category::Hr,
        TriageCategory::Payroll => ticket::Category::Payroll,
        TriageCategory::Facilities => ticket::Category::Facilities,
        TriageCategory::Other => ticket::Category::Other,
    }
}

fn stored_priority(priority: TriagePriority) -> ticket::Priority {
    match priority {
        TriagePriority::Low => ticket::Priority::Low,
        TriagePriority::Medium => ticket::Priority::Medium,
        TriagePriority::High => ticket::Priority::High,
        TriagePriority::Urgent => ticket::Priority::Urgent,
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Ticket")]
pub struct TicketNode {
    pub id: ID,
    pub raised_by: ID,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ticket::Model> for TicketNode {
    fn from(model: ticket::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            raised_by: ID::from(model.raised_by.to_string()),
            subject: model.subject,
            description: model.description,
            category: model.category.into(),
            priority: model.priority.into(),
            status: model.status.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewTicketInput {
    pub subject: String,
    pub description: String,
    /// Omit to let the model categorize and prioritize the ticket.
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
}

async fn find_ticket(
    db: &sea_orm::DatabaseConnection,
    user: &CurrentUser,
    id: Uuid,
) -> async_graphql::Result<ticket::Model> {
    let record = ticket::Entity::find_by_id(id)
        .filter(ticket::Column::TenantId.eq(user.tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("ticket"))?;
    if record.raised_by != user.user_id && !user.has_any(TICKET_HANDLERS) {
        return Err(not_found("ticket"));
    }
    Ok(record)
}

#[derive(Default)]
pub struct HelpdeskQuery;

#[Object]
impl HelpdeskQuery {
    /// HR sees every ticket; other users only the ones they raised.
    async fn tickets(
        &self,
        ctx: &Context<'_>,
        status: Option<TicketStatus>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<TicketNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let span = info_span!("tickets", tenant_id = %user.tenant_id, status = ?status);
        let mut query = ticket::Entity::find().filter(ticket::Column::TenantId.eq(user.tenant_id));
        if !user.has_any(TICKET_HANDLERS) {
            query = query.filter(ticket::Column::RaisedBy.eq(user.user_id));
        }
        if let Some(status) = status {
            query = query.filter(ticket::Column::Status.eq(ticket::Status::from(status)));
        }
        let rows = query
            .order_by_desc(ticket::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .instrument(span)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(TicketNode::from).collect())
    }

    async fn ticket(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TicketNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        Ok(find_ticket(db.as_ref(), &user, parse_uuid(&id)?).await?.into())
    }
}

#[derive(Default)]
pub struct HelpdeskMutation;

#[Object]
impl HelpdeskMutation {
    /// Without a category the ticket is triaged by the model first; if that
    /// fails nothing is stored.
    async fn create_ticket(
        &self,
        ctx: &Context<'_>,
        input: NewTicketInput,
    ) -> async_graphql::Result<TicketNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let subject = required_text("subject", &input.subject, 200)?;
        let description = required_text("description", &input.description, 10_000)?;

        let (category, priority) = match input.category {
            Some(category) => (
                ticket::Category::from(category),
                input.priority.map_or(ticket::Priority::Medium, Into::into),
            ),
            None => {
                let client = model_client(ctx)?;
                let triage = run_flow::<CategorizeTicket>(
                    client.as_ref(),
                    &CategorizeTicketInput {
                        subject: subject.clone(),
                        description: description.clone(),
                    },
                )
                .await
                .map_err(ai_error)?;
                (
                    stored_category(triage.category),
                    input
                        .priority
                        .map_or_else(|| stored_priority(triage.priority), Into::into),
                )
            }
        };

        let timestamp = now();
        let model = ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            raised_by: Set(user.user_id),
            subject: Set(subject),
            description: Set(description),
            category: Set(category),
            priority: Set(priority),
            status: Set(ticket::Status::Open),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(ticket_id = %model.id, category = ?model.category, priority = ?model.priority, "ticket created");
        Ok(model.into())
    }

    /// Moves a ticket to `status` and notifies whoever raised it.
    async fn update_ticket_status(
        &self,
        ctx: &Context<'_>,
        id: ID,
        status: TicketStatus,
    ) -> async_graphql::Result<TicketNode> {
        let user = require_any(ctx, TICKET_HANDLERS)?;
        let db = database(ctx)?;
        let record = find_ticket(db.as_ref(), &user, parse_uuid(&id)?).await?;
        if record.status == ticket::Status::Closed {
            return Err(conflict("closed tickets cannot change status"));
        }
        let reporter = record.raised_by;
        let next = ticket::Status::from(status);
        let txn = db.begin().await.map_err(db_error)?;
        let mut active: ticket::ActiveModel = record.into();
        active.status = Set(next);
        active.updated_at = Set(now());
        let updated = active.update(&txn).await.map_err(db_error)?;
        if reporter != user.user_id {
            notify_user(
                &txn,
                user.tenant_id,
                reporter,
                "Ticket updated",
                &format!("\"{}\" is now {:?}.", updated.subject, status),
                Some(format!("/helpdesk/{}", updated.id)),
            )
            .await
            .map_err(db_error)?;
        }
        txn.commit().await.map_err(db_error)?;
        Ok(updated.into())
    }
}
