use async_graphql::{Context, ID, Object, SimpleObject};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use entity::attendance;
use platform_api::validation_error;
use platform_genai::{
    InlineImage,
    flows::{CompareFaces, CompareFacesInput},
    run_flow,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::UserRole,
    directory::find_employee,
    schema::{
        ai_error, conflict, current_user, database, db_error, model_client, not_found, now,
        own_employee, page_window, parse_optional_id, target_employee,
    },
};

const ATTENDANCE_READERS: &[UserRole] = &[UserRole::Hr, UserRole::Manager];

/// Clock-ins strictly after 09:30 UTC are late.
pub const LATE_AFTER_SECS: u32 = 9 * 3600 + 30 * 60;

graphql_enum!(AttendanceStatus => attendance::Status { Present, Late });

pub fn attendance_status(clock_in: DateTime<Utc>) -> attendance::Status {
    if clock_in.num_seconds_from_midnight() > LATE_AFTER_SECS {
        attendance::Status::Late
    } else {
        attendance::Status::Present
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Attendance")]
pub struct AttendanceNode {
    pub id: ID,
    pub employee_id: ID,
    pub work_date: NaiveDate,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    /// Null when no face check ran.
    pub face_verified: Option<bool>,
}

impl From<attendance::Model> for AttendanceNode {
    fn from(model: attendance::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            employee_id: ID::from(model.employee_id.to_string()),
            work_date: model.work_date,
            clock_in: model.clock_in.into(),
            clock_out: model.clock_out.map(Into::into),
            status: model.status.into(),
            face_verified: model.face_verified,
        }
    }
}

async fn todays_record(
    db: &sea_orm::DatabaseConnection,
    employee_id: Uuid,
    day: NaiveDate,
) -> async_graphql::Result<Option<attendance::Model>> {
    attendance::Entity::find()
        .filter(attendance::Column::EmployeeId.eq(employee_id))
        .filter(attendance::Column::WorkDate.eq(day))
        .one(db)
        .await
        .map_err(db_error)
}

#[derive(Default)]
pub struct AttendanceQuery;

#[Object]
impl AttendanceQuery {
    /// HR and managers may read anyone's records; others read their own.
    async fn attendance(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<ID>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<AttendanceNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let requested = parse_optional_id(employee_id.as_ref())?;
        if let (Some(from), Some(to)) = (from, to) {
            if to < from {
                return Err(validation_error("to must not be before from"));
            }
        }
        let mut query =
            attendance::Entity::find().filter(attendance::Column::TenantId.eq(user.tenant_id));
        match requested {
            None if user.has_any(ATTENDANCE_READERS) => {}
            _ => {
                let id = target_employee(&user, requested, ATTENDANCE_READERS)?;
                query = query.filter(attendance::Column::EmployeeId.eq(id));
            }
        }
        if let Some(from) = from {
            query = query.filter(attendance::Column::WorkDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(attendance::Column::WorkDate.lte(to));
        }
        let rows = query
            .order_by_desc(attendance::Column::WorkDate)
            .order_by_asc(attendance::Column::EmployeeId)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AttendanceNode::from).collect())
    }
}

#[derive(Default)]
pub struct AttendanceMutation;

#[Object]
impl AttendanceMutation {
    /// Records today's clock-in. With a face photo and a stored reference
    /// photo the face-match flow decides `faceVerified`; a model failure
    /// aborts the clock-in.
    async fn clock_in(
        &self,
        ctx: &Context<'_>,
        face_photo: Option<String>,
    ) -> async_graphql::Result<AttendanceNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let employee_id = own_employee(&user)?;
        let employee = find_employee(db.as_ref(), user.tenant_id, employee_id).await?;
        let timestamp = now();
        let clock_in: DateTime<Utc> = timestamp.into();
        let day = clock_in.date_naive();
        if todays_record(db.as_ref(), employee_id, day).await?.is_some() {
            return Err(conflict("already clocked in today"));
        }

        let candidate = face_photo
            .filter(|uri| !uri.trim().is_empty())
            .map(|uri| InlineImage::parse_data_uri(uri.trim()))
            .transpose()
            .map_err(ai_error)?;
        let face_verified = match (candidate, employee.reference_photo.as_deref()) {
            (Some(candidate), Some(reference)) => {
                let reference = InlineImage::parse_data_uri(reference).map_err(ai_error)?;
                let client = model_client(ctx)?;
                let verdict = run_flow::<CompareFaces>(
                    client.as_ref(),
                    &CompareFacesInput {
                        reference,
                        candidate,
                    },
                )
                .await
                .map_err(ai_error)?;
                if !verdict.is_match {
                    warn!(employee_id = %employee_id, confidence = verdict.confidence, "face check failed at clock-in");
                }
                Some(verdict.is_match)
            }
            _ => None,
        };

        let record = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            employee_id: Set(employee_id),
            work_date: Set(day),
            clock_in: Set(timestamp),
            clock_out: Set(None),
            status: Set(attendance_status(clock_in)),
            face_verified: Set(face_verified),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(employee_id = %employee_id, status = ?record.status, "clocked in");
        Ok(record.into())
    }

    async fn clock_out(&self, ctx: &Context<'_>) -> async_graphql::Result<AttendanceNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let employee_id = own_employee(&user)?;
        let timestamp = now();
        let day = DateTime::<Utc>::from(timestamp).date_naive();
        let record = todays_record(db.as_ref(), employee_id, day)
            .await?
            .ok_or_else(|| not_found("attendance record"))?;
        if record.clock_out.is_some() {
            return Err(conflict("already clocked out today"));
        }
        let mut active: attendance::ActiveModel = record.into();
        active.clock_out = Set(Some(timestamp));
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }
}
