use async_graphql::{Context, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{employee, leave_request};
use platform_api::validation_error;
use products_hr::working_days;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::UserRole,
    directory::find_employee,
    notifications::notify_employee,
    schema::{
        conflict, current_user, database, db_error, forbidden, not_found, now, optional_text,
        page_window, parse_optional_id, parse_uuid, require_any, target_employee,
    },
};

const LEAVE_DECIDERS: &[UserRole] = &[UserRole::Manager, UserRole::Hr];

graphql_enum!(LeaveType => leave_request::LeaveType { Annual, Sick, Casual, Unpaid, Maternity, Paternity });
graphql_enum!(LeaveStatus => leave_request::Status { Pending, Approved, Rejected, Cancelled });

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "LeaveRequest")]
pub struct LeaveRequestNode {
    pub id: ID,
    pub employee_id: ID,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Working days (Monday to Friday) covered by the request.
    pub days: i32,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub decided_by: Option<ID>,
    pub decision_note: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<leave_request::Model> for LeaveRequestNode {
    fn from(model: leave_request::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            employee_id: ID::from(model.employee_id.to_string()),
            leave_type: model.leave_type.into(),
            start_date: model.start_date,
            end_date: model.end_date,
            days: model.days,
            reason: model.reason,
            status: model.status.into(),
            decided_by: model.decided_by.map(|id| ID::from(id.to_string())),
            decision_note: model.decision_note,
            decided_at: model.decided_at.map(Into::into),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct LeaveRequestInput {
    /// Defaults to the caller's own employee record; HR may file for others.
    pub employee_id: Option<ID>,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

async fn find_request(
    db: &sea_orm::DatabaseConnection,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<leave_request::Model> {
    leave_request::Entity::find_by_id(id)
        .filter(leave_request::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("leave request"))
}

#[derive(Default)]
pub struct LeaveQuery;

#[Object]
impl LeaveQuery {
    /// Managers and HR see every request; other users only their own.
    async fn leave_requests(
        &self,
        ctx: &Context<'_>,
        status: Option<LeaveStatus>,
        employee_id: Option<ID>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<LeaveRequestNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let mut query =
            leave_request::Entity::find().filter(leave_request::Column::TenantId.eq(user.tenant_id));
        let requested = parse_optional_id(employee_id.as_ref())?;
        if user.has_any(LEAVE_DECIDERS) {
            if let Some(id) = requested {
                query = query.filter(leave_request::Column::EmployeeId.eq(id));
            }
        } else {
            let own = target_employee(&user, requested, LEAVE_DECIDERS)?;
            query = query.filter(leave_request::Column::EmployeeId.eq(own));
        }
        if let Some(status) = status {
            query = query.filter(leave_request::Column::Status.eq(leave_request::Status::from(status)));
        }
        let rows = query
            .order_by_desc(leave_request::Column::StartDate)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LeaveRequestNode::from).collect())
    }
}

#[derive(Default)]
pub struct LeaveMutation;

#[Object]
impl LeaveMutation {
    async fn submit_leave_request(
        &self,
        ctx: &Context<'_>,
        input: LeaveRequestInput,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let requested = parse_optional_id(input.employee_id.as_ref())?;
        let employee_id = target_employee(&user, requested, &[UserRole::Hr])?;
        let employee = find_employee(db.as_ref(), user.tenant_id, employee_id).await?;
        if employee.status == employee::Status::Terminated {
            return Err(validation_error("terminated employees cannot request leave"));
        }
        let days = working_days(input.start_date, input.end_date)
            .map_err(|err| validation_error(err.to_string()))?;
        let reason = optional_text("reason", input.reason, 1000)?;

        let overlapping = leave_request::Entity::find()
            .filter(leave_request::Column::EmployeeId.eq(employee_id))
            .filter(
                leave_request::Column::Status
                    .is_in([leave_request::Status::Pending, leave_request::Status::Approved]),
            )
            .filter(leave_request::Column::StartDate.lte(input.end_date))
            .filter(leave_request::Column::EndDate.gte(input.start_date))
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        if overlapping > 0 {
            return Err(conflict("an open leave request already covers these dates"));
        }

        let model = leave_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            employee_id: Set(employee_id),
            leave_type: Set(input.leave_type.into()),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            days: Set(days as i32),
            reason: Set(reason),
            status: Set(leave_request::Status::Pending),
            decided_by: Set(None),
            decision_note: Set(None),
            decided_at: Set(None),
            created_at: Set(now()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(request_id = %model.id, days, "leave request submitted");
        Ok(model.into())
    }

    /// Approves or rejects a pending request and notifies the employee.
    async fn decide_leave_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
        approve: bool,
        note: Option<String>,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let user = require_any(ctx, LEAVE_DECIDERS)?;
        let db = database(ctx)?;
        let request = find_request(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        if user.is_self(request.employee_id) {
            return Err(forbidden());
        }
        if request.status != leave_request::Status::Pending {
            return Err(conflict("only pending requests can be decided"));
        }
        let note = optional_text("note", note, 1000)?;
        let (status, verdict) = if approve {
            (leave_request::Status::Approved, "approved")
        } else {
            (leave_request::Status::Rejected, "rejected")
        };
        let body = format!(
            "Your leave from {} to {} was {verdict}.",
            request.start_date, request.end_date
        );
        let employee_id = request.employee_id;
        let request_id = request.id;

        let txn = db.begin().await.map_err(db_error)?;
        let mut active: leave_request::ActiveModel = request.into();
        active.status = Set(status);
        active.decided_by = Set(Some(user.user_id));
        active.decision_note = Set(note);
        active.decided_at = Set(Some(now()));
        let updated = active.update(&txn).await.map_err(db_error)?;
        notify_employee(
            &txn,
            user.tenant_id,
            employee_id,
            "Leave request decided",
            &body,
            Some(format!("/leave/{request_id}")),
        )
        .await
        .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Withdraws the caller's own request while it is still pending.
    async fn cancel_leave_request(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<LeaveRequestNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let request = find_request(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        if !user.is_self(request.employee_id) {
            return Err(forbidden());
        }
        if request.status != leave_request::Status::Pending {
            return Err(conflict("only pending requests can be cancelled"));
        }
        let mut active: leave_request::ActiveModel = request.into();
        active.status = Set(leave_request::Status::Cancelled);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }
}
