use async_graphql::{Context, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{course, enrollment};
use platform_api::validation_error;
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
        page_window, parse_optional_id, parse_uuid, require_any, required_text, target_employee,
    },
};

const COURSE_ADMINS: &[UserRole] = &[UserRole::Hr];
const ENROLLMENT_MANAGERS: &[UserRole] = &[UserRole::Hr, UserRole::Manager];

graphql_enum!(EnrollmentStatus => enrollment::Status { Enrolled, InProgress, Completed });

/// Status implied by a clamped progress percentage.
pub fn progress_status(progress_pct: i32) -> enrollment::Status {
    match progress_pct {
        100 => enrollment::Status::Completed,
        p if p > 0 => enrollment::Status::InProgress,
        _ => enrollment::Status::Enrolled,
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Course")]
pub struct CourseNode {
    pub id: ID,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_hours: i32,
    pub created_at: DateTime<Utc>,
}

impl From<course::Model> for CourseNode {
    fn from(model: course::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            description: model.description,
            category: model.category,
            duration_hours: model.duration_hours,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Enrollment")]
pub struct EnrollmentNode {
    pub id: ID,
    pub course_id: ID,
    pub employee_id: ID,
    pub status: EnrollmentStatus,
    pub progress_pct: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<enrollment::Model> for EnrollmentNode {
    fn from(model: enrollment::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            course_id: ID::from(model.course_id.to_string()),
            employee_id: ID::from(model.employee_id.to_string()),
            status: model.status.into(),
            progress_pct: model.progress_pct,
            enrolled_at: model.enrolled_at.into(),
            completed_at: model.completed_at.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct CourseInput {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration_hours: i32,
}

fn validate_duration(hours: i32) -> async_graphql::Result<i32> {
    if !(1..=1000).contains(&hours) {
        return Err(validation_error("durationHours must be between 1 and 1000"));
    }
    Ok(hours)
}

async fn find_course(
    db: &sea_orm::DatabaseConnection,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<course::Model> {
    course::Entity::find_by_id(id)
        .filter(course::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("course"))
}

#[derive(Default)]
pub struct LearningQuery;

#[Object]
impl LearningQuery {
    async fn courses(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<CourseNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let rows = course::Entity::find()
            .filter(course::Column::TenantId.eq(user.tenant_id))
            .order_by_asc(course::Column::Title)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(CourseNode::from).collect())
    }

    async fn course(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CourseNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        Ok(find_course(db.as_ref(), user.tenant_id, parse_uuid(&id)?)
            .await?
            .into())
    }

    /// HR and managers see every enrollment; others only their own.
    async fn enrollments(
        &self,
        ctx: &Context<'_>,
        employee_id: Option<ID>,
        course_id: Option<ID>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<EnrollmentNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let requested = parse_optional_id(employee_id.as_ref())?;
        let mut query =
            enrollment::Entity::find().filter(enrollment::Column::TenantId.eq(user.tenant_id));
        match requested {
            None if user.has_any(ENROLLMENT_MANAGERS) => {}
            _ => {
                let id = target_employee(&user, requested, ENROLLMENT_MANAGERS)?;
                query = query.filter(enrollment::Column::EmployeeId.eq(id));
            }
        }
        if let Some(course_id) = parse_optional_id(course_id.as_ref())? {
            query = query.filter(enrollment::Column::CourseId.eq(course_id));
        }
        let rows = query
            .order_by_desc(enrollment::Column::EnrolledAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(EnrollmentNode::from).collect())
    }
}

#[derive(Default)]
pub struct LearningMutation;

#[Object]
impl LearningMutation {
    async fn create_course(
        &self,
        ctx: &Context<'_>,
        input: CourseInput,
    ) -> async_graphql::Result<CourseNode> {
        let user = require_any(ctx, COURSE_ADMINS)?;
        let db = database(ctx)?;
        let model = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            title: Set(required_text("title", &input.title, 200)?),
            description: Set(optional_text("description", input.description, 5000)?),
            category: Set(optional_text("category", input.category, 60)?),
            duration_hours: Set(validate_duration(input.duration_hours)?),
            created_at: Set(now()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(model.into())
    }

    async fn update_course(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: CourseInput,
    ) -> async_graphql::Result<CourseNode> {
        let user = require_any(ctx, COURSE_ADMINS)?;
        let db = database(ctx)?;
        let existing = find_course(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let mut active: course::ActiveModel = existing.into();
        active.title = Set(required_text("title", &input.title, 200)?);
        active.description = Set(optional_text("description", input.description, 5000)?);
        active.category = Set(optional_text("category", input.category, 60)?);
        active.duration_hours = Set(validate_duration(input.duration_hours)?);
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    /// Deletes a course together with its enrollments.
    async fn delete_course(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let user = require_any(ctx, COURSE_ADMINS)?;
        let db = database(ctx)?;
        let existing = find_course(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let txn = db.begin().await.map_err(db_error)?;
        enrollment::Entity::delete_many()
            .filter(enrollment::Column::CourseId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        course::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }

    /// Enrolls an employee (the caller by default) and notifies them.
    async fn enroll(
        &self,
        ctx: &Context<'_>,
        course_id: ID,
        employee_id: Option<ID>,
    ) -> async_graphql::Result<EnrollmentNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let requested = parse_optional_id(employee_id.as_ref())?;
        let employee_id = target_employee(&user, requested, ENROLLMENT_MANAGERS)?;
        let course = find_course(db.as_ref(), user.tenant_id, parse_uuid(&course_id)?).await?;
        find_employee(db.as_ref(), user.tenant_id, employee_id).await?;
        let existing = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course.id))
            .filter(enrollment::Column::EmployeeId.eq(employee_id))
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing > 0 {
            return Err(conflict("employee is already enrolled in this course"));
        }

        let txn = db.begin().await.map_err(db_error)?;
        let model = enrollment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            course_id: Set(course.id),
            employee_id: Set(employee_id),
            status: Set(enrollment::Status::Enrolled),
            progress_pct: Set(0),
            enrolled_at: Set(now()),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        if !user.is_self(employee_id) {
            notify_employee(
                &txn,
                user.tenant_id,
                employee_id,
                "New course enrollment",
                &format!("You were enrolled in \"{}\".", course.title),
                Some(format!("/learning/{}", course.id)),
            )
            .await
            .map_err(db_error)?;
        }
        txn.commit().await.map_err(db_error)?;
        info!(enrollment_id = %model.id, course_id = %course.id, "employee enrolled");
        Ok(model.into())
    }

    /// Records progress, clamped to 0..=100. Reaching 100 completes the
    /// enrollment.
    async fn update_enrollment_progress(
        &self,
        ctx: &Context<'_>,
        id: ID,
        progress_pct: i32,
    ) -> async_graphql::Result<EnrollmentNode> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let record = enrollment::Entity::find_by_id(parse_uuid(&id)?)
            .filter(enrollment::Column::TenantId.eq(user.tenant_id))
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| not_found("enrollment"))?;
        if !user.is_self(record.employee_id) && !user.has_any(ENROLLMENT_MANAGERS) {
            return Err(forbidden());
        }
        if record.status == enrollment::Status::Completed {
            return Err(conflict("enrollment is already completed"));
        }
        let progress = progress_pct.clamp(0, 100);
        let status = progress_status(progress);
        let mut active: enrollment::ActiveModel = record.into();
        active.progress_pct = Set(progress);
        active.status = Set(status);
        if status == enrollment::Status::Completed {
            active.completed_at = Set(Some(now()));
        }
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_maps_to_status() {
        assert_eq!(progress_status(0), enrollment::Status::Enrolled);
        assert_eq!(progress_status(1), enrollment::Status::InProgress);
        assert_eq!(progress_status(99), enrollment::Status::InProgress);
        assert_eq!(progress_status(100), enrollment::Status::Completed);
    }

    #[test]
    fn durations_are_bounded() {
        assert!(validate_duration(0).is_err());
        assert_eq!(validate_duration(12).unwrap(), 12);
        assert!(validate_duration(1001).is_err());
    }
}
