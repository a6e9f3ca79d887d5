use async_graphql::{Context, ID, InputObject, MaybeUndefined, Object, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{app_user, department, employee, job_role};
use platform_api::validation_error;
use platform_genai::InlineImage;
use products_hr::employee_code;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, Func},
};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::{
    auth::UserRole,
    schema::{
        conflict, current_user, database, db_error, forbidden, normalize_email, not_found, now,
        optional_text, page_window, parse_optional_id, parse_uuid, require_any, required_text,
    },
};

/// Roles allowed to browse the whole employee directory.
pub(crate) const DIRECTORY_READERS: &[UserRole] = &[
    UserRole::Hr,
    UserRole::Manager,
    UserRole::Recruiter,
    UserRole::QaAnalyst,
];

graphql_enum!(EmployeeStatus => employee::Status { Active, OnLeave, Terminated });

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Department")]
pub struct DepartmentNode {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    pub head_employee_id: Option<ID>,
    pub created_at: DateTime<Utc>,
}

impl From<department::Model> for DepartmentNode {
    fn from(model: department::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            name: model.name,
            description: model.description,
            head_employee_id: model.head_employee_id.map(|id| ID::from(id.to_string())),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "JobRole")]
pub struct JobRoleNode {
    pub id: ID,
    pub title: String,
    pub description: Option<String>,
    pub department_id: Option<ID>,
}

impl From<job_role::Model> for JobRoleNode {
    fn from(model: job_role::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            title: model.title,
            description: model.description,
            department_id: model.department_id.map(|id| ID::from(id.to_string())),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Employee")]
pub struct EmployeeNode {
    pub id: ID,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<ID>,
    pub job_role_id: Option<ID>,
    pub manager_id: Option<ID>,
    pub status: EmployeeStatus,
    pub hire_date: NaiveDate,
    pub base_salary_cents: i64,
    pub has_reference_photo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<employee::Model> for EmployeeNode {
    fn from(model: employee::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            full_name: model.full_name(),
            employee_code: model.employee_code,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            department_id: model.department_id.map(|id| ID::from(id.to_string())),
            job_role_id: model.job_role_id.map(|id| ID::from(id.to_string())),
            manager_id: model.manager_id.map(|id| ID::from(id.to_string())),
            status: model.status.into(),
            hire_date: model.hire_date,
            base_salary_cents: model.base_salary_cents,
            has_reference_photo: model.reference_photo.is_some(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct EmployeePage {
    pub nodes: Vec<EmployeeNode>,
    pub total_count: u64,
}

#[derive(Clone, Debug, InputObject)]
pub struct DepartmentInput {
    pub name: String,
    pub description: Option<String>,
    pub head_employee_id: Option<ID>,
}

#[derive(Clone, Debug, InputObject)]
pub struct JobRoleInput {
    pub title: String,
    pub description: Option<String>,
    pub department_id: Option<ID>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct EmployeeFilter {
    pub department_id: Option<ID>,
    pub status: Option<EmployeeStatus>,
    /// Case-insensitive match on name, email or employee code.
    pub q: Option<String>,
}

#[derive(Clone, Debug, InputObject)]
pub struct NewEmployeeInput {
    /// Generated as `EMP-0001`, `EMP-0002`, ... when omitted.
    pub employee_code: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<ID>,
    pub job_role_id: Option<ID>,
    pub manager_id: Option<ID>,
    pub hire_date: NaiveDate,
    pub base_salary_cents: i64,
    /// `data:image/...;base64,` URI used for attendance face checks.
    pub reference_photo: Option<String>,
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct UpdateEmployeeInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `null` removes the employee from their department.
    pub department_id: MaybeUndefined<ID>,
    pub job_role_id: MaybeUndefined<ID>,
    pub manager_id: MaybeUndefined<ID>,
    pub status: Option<EmployeeStatus>,
    pub hire_date: Option<NaiveDate>,
    pub base_salary_cents: Option<i64>,
    pub reference_photo: Option<String>,
}

pub(crate) async fn find_employee<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<employee::Model> {
    employee::Entity::find_by_id(id)
        .filter(employee::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("employee"))
}

async fn find_department<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<department::Model> {
    department::Entity::find_by_id(id)
        .filter(department::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("department"))
}

async fn find_job_role<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<job_role::Model> {
    job_role::Entity::find_by_id(id)
        .filter(job_role::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("job role"))
}

/// Parses and checks that each referenced row exists in the tenant.
async fn resolve_links<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    department_id: Option<&ID>,
    job_role_id: Option<&ID>,
    manager_id: Option<&ID>,
) -> async_graphql::Result<(Option<Uuid>, Option<Uuid>, Option<Uuid>)> {
    let department_id = parse_optional_id(department_id)?;
    if let Some(id) = department_id {
        find_department(db, tenant_id, id).await?;
    }
    let job_role_id = parse_optional_id(job_role_id)?;
    if let Some(id) = job_role_id {
        find_job_role(db, tenant_id, id).await?;
    }
    let manager_id = parse_optional_id(manager_id)?;
    if let Some(id) = manager_id {
        find_employee(db, tenant_id, id).await?;
    }
    Ok((department_id, job_role_id, manager_id))
}

/// `None` leaves a link untouched, `Some(None)` clears it.
fn link_change(value: MaybeUndefined<ID>) -> async_graphql::Result<Option<Option<Uuid>>> {
    match value {
        MaybeUndefined::Undefined => Ok(None),
        MaybeUndefined::Null => Ok(Some(None)),
        MaybeUndefined::Value(id) => Ok(Some(Some(parse_uuid(&id)?))),
    }
}

fn validate_photo(photo: Option<String>) -> async_graphql::Result<Option<String>> {
    match photo {
        Some(uri) if !uri.trim().is_empty() => {
            InlineImage::parse_data_uri(&uri).map_err(|err| validation_error(err.to_string()))?;
            Ok(Some(uri.trim().to_string()))
        }
        _ => Ok(None),
    }
}

fn validate_salary(cents: i64) -> async_graphql::Result<i64> {
    if cents < 0 {
        return Err(validation_error("baseSalaryCents must not be negative"));
    }
    Ok(cents)
}

async fn email_taken<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    email: &str,
    except: Option<Uuid>,
) -> async_graphql::Result<bool> {
    let mut query = employee::Entity::find()
        .filter(employee::Column::TenantId.eq(tenant_id))
        .filter(employee::Column::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(employee::Column::Id.ne(id));
    }
    Ok(query.count(db).await.map_err(db_error)? > 0)
}

/// Next free `EMP-nnnn` code in the tenant.
async fn next_employee_code<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
) -> async_graphql::Result<String> {
    let codes: Vec<String> = employee::Entity::find()
        .select_only()
        .column(employee::Column::EmployeeCode)
        .filter(employee::Column::TenantId.eq(tenant_id))
        .filter(employee::Column::EmployeeCode.starts_with("EMP-"))
        .into_tuple()
        .all(db)
        .await
        .map_err(db_error)?;
    let highest = codes
        .iter()
        .filter_map(|code| code.strip_prefix("EMP-")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    Ok(employee_code(highest + 1))
}

#[derive(Default)]
pub struct DirectoryQuery;

#[Object]
impl DirectoryQuery {
    async fn departments(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<DepartmentNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let rows = department::Entity::find()
            .filter(department::Column::TenantId.eq(user.tenant_id))
            .order_by_asc(department::Column::Name)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(DepartmentNode::from).collect())
    }

    async fn department(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<Option<DepartmentNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let row = department::Entity::find_by_id(parse_uuid(&id)?)
            .filter(department::Column::TenantId.eq(user.tenant_id))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(row.map(DepartmentNode::from))
    }

    async fn job_roles(
        &self,
        ctx: &Context<'_>,
        department_id: Option<ID>,
    ) -> async_graphql::Result<Vec<JobRoleNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let mut query = job_role::Entity::find().filter(job_role::Column::TenantId.eq(user.tenant_id));
        if let Some(department_id) = parse_optional_id(department_id.as_ref())? {
            query = query.filter(job_role::Column::DepartmentId.eq(department_id));
        }
        let rows = query
            .order_by_asc(job_role::Column::Title)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(JobRoleNode::from).collect())
    }

    async fn employees(
        &self,
        ctx: &Context<'_>,
        filter: Option<EmployeeFilter>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<EmployeePage> {
        let user = require_any(ctx, DIRECTORY_READERS)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let filter = filter.unwrap_or_default();
        let span = info_span!(
            "directory.employees.list",
            status = filter.status.map(|s| format!("{s:?}")).unwrap_or_default(),
            has_q = filter.q.as_deref().is_some_and(|q| !q.trim().is_empty()),
            first = limit
        );

        let mut query = employee::Entity::find().filter(employee::Column::TenantId.eq(user.tenant_id));
        if let Some(department_id) = parse_optional_id(filter.department_id.as_ref())? {
            query = query.filter(employee::Column::DepartmentId.eq(department_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(employee::Column::Status.eq(employee::Status::from(status)));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q.to_lowercase());
            let lower = |col: employee::Column| Expr::expr(Func::lower(Expr::col(col)));
            query = query.filter(
                Condition::any()
                    .add(lower(employee::Column::FirstName).like(pattern.clone()))
                    .add(lower(employee::Column::LastName).like(pattern.clone()))
                    .add(lower(employee::Column::Email).like(pattern.clone()))
                    .add(lower(employee::Column::EmployeeCode).like(pattern)),
            );
        }
        let total_count = query
            .clone()
            .count(db.as_ref())
            .instrument(span.clone())
            .await
            .map_err(db_error)?;
        let rows = query
            .order_by_asc(employee::Column::EmployeeCode)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .instrument(span)
            .await
            .map_err(db_error)?;
        Ok(EmployeePage {
            nodes: rows.into_iter().map(EmployeeNode::from).collect(),
            total_count,
        })
    }

    /// Directory readers may fetch anyone; other users only themselves.
    async fn employee(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<EmployeeNode>> {
        let user = current_user(ctx)?;
        let id = parse_uuid(&id)?;
        if !user.is_self(id) && !user.has_any(DIRECTORY_READERS) {
            return Err(forbidden());
        }
        let db = database(ctx)?;
        let row = employee::Entity::find_by_id(id)
            .filter(employee::Column::TenantId.eq(user.tenant_id))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(row.map(EmployeeNode::from))
    }
}

#[derive(Default)]
pub struct DirectoryMutation;

#[Object]
impl DirectoryMutation {
    async fn create_department(
        &self,
        ctx: &Context<'_>,
        input: DepartmentInput,
    ) -> async_graphql::Result<DepartmentNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let name = required_text("name", &input.name, 100)?;
        let description = optional_text("description", input.description, 1000)?;
        let head = parse_optional_id(input.head_employee_id.as_ref())?;
        if let Some(head) = head {
            find_employee(db.as_ref(), user.tenant_id, head).await?;
        }
        let duplicate = department::Entity::find()
            .filter(department::Column::TenantId.eq(user.tenant_id))
            .filter(department::Column::Name.eq(name.clone()))
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        if duplicate > 0 {
            return Err(conflict(format!("department {name} already exists")));
        }
        let timestamp = now();
        let model = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            name: Set(name),
            description: Set(description),
            head_employee_id: Set(head),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(model.into())
    }

    async fn update_department(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: DepartmentInput,
    ) -> async_graphql::Result<DepartmentNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let existing = find_department(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let name = required_text("name", &input.name, 100)?;
        let head = parse_optional_id(input.head_employee_id.as_ref())?;
        if let Some(head) = head {
            find_employee(db.as_ref(), user.tenant_id, head).await?;
        }
        let mut active: department::ActiveModel = existing.into();
        active.name = Set(name);
        active.description = Set(optional_text("description", input.description, 1000)?);
        active.head_employee_id = Set(head);
        active.updated_at = Set(now());
        let model = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(model.into())
    }

    /// Refused while any employee still belongs to the department.
    async fn delete_department(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let existing = find_department(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let members = employee::Entity::find()
            .filter(employee::Column::DepartmentId.eq(existing.id))
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        if members > 0 {
            return Err(conflict(format!(
                "department still has {members} employee(s)"
            )));
        }
        let txn = db.begin().await.map_err(db_error)?;
        job_role::Entity::update_many()
            .col_expr(job_role::Column::DepartmentId, Expr::value(Option::<Uuid>::None))
            .filter(job_role::Column::DepartmentId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        department::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn create_job_role(
        &self,
        ctx: &Context<'_>,
        input: JobRoleInput,
    ) -> async_graphql::Result<JobRoleNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let department_id = parse_optional_id(input.department_id.as_ref())?;
        if let Some(id) = department_id {
            find_department(db.as_ref(), user.tenant_id, id).await?;
        }
        let model = job_role::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            title: Set(required_text("title", &input.title, 100)?),
            description: Set(optional_text("description", input.description, 2000)?),
            department_id: Set(department_id),
            created_at: Set(now()),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(model.into())
    }

    async fn update_job_role(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: JobRoleInput,
    ) -> async_graphql::Result<JobRoleNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let existing = find_job_role(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let department_id = parse_optional_id(input.department_id.as_ref())?;
        if let Some(id) = department_id {
            find_department(db.as_ref(), user.tenant_id, id).await?;
        }
        let mut active: job_role::ActiveModel = existing.into();
        active.title = Set(required_text("title", &input.title, 100)?);
        active.description = Set(optional_text("description", input.description, 2000)?);
        active.department_id = Set(department_id);
        let model = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(model.into())
    }

    /// Employees holding the role are left without one.
    async fn delete_job_role(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let existing = find_job_role(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let txn = db.begin().await.map_err(db_error)?;
        employee::Entity::update_many()
            .col_expr(employee::Column::JobRoleId, Expr::value(Option::<Uuid>::None))
            .filter(employee::Column::JobRoleId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        job_role::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn create_employee(
        &self,
        ctx: &Context<'_>,
        input: NewEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let first_name = required_text("firstName", &input.first_name, 80)?;
        let last_name = required_text("lastName", &input.last_name, 80)?;
        let email = normalize_email(&input.email)?;
        let phone = optional_text("phone", input.phone, 32)?;
        let base_salary_cents = validate_salary(input.base_salary_cents)?;
        let reference_photo = validate_photo(input.reference_photo)?;
        let (department_id, job_role_id, manager_id) = resolve_links(
            db.as_ref(),
            user.tenant_id,
            input.department_id.as_ref(),
            input.job_role_id.as_ref(),
            input.manager_id.as_ref(),
        )
        .await?;
        if email_taken(db.as_ref(), user.tenant_id, &email, None).await? {
            return Err(conflict("an employee with this email already exists"));
        }
        let code = match optional_text("employeeCode", input.employee_code, 32)? {
            Some(code) => {
                let clash = employee::Entity::find()
                    .filter(employee::Column::TenantId.eq(user.tenant_id))
                    .filter(employee::Column::EmployeeCode.eq(code.clone()))
                    .count(db.as_ref())
                    .await
                    .map_err(db_error)?;
                if clash > 0 {
                    return Err(conflict(format!("employee code {code} is already used")));
                }
                code
            }
            None => next_employee_code(db.as_ref(), user.tenant_id).await?,
        };
        let timestamp = now();
        let model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            employee_code: Set(code),
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            phone: Set(phone),
            department_id: Set(department_id),
            job_role_id: Set(job_role_id),
            manager_id: Set(manager_id),
            status: Set(employee::Status::Active),
            hire_date: Set(input.hire_date),
            base_salary_cents: Set(base_salary_cents),
            reference_photo: Set(reference_photo),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(model.into())
    }

    async fn update_employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: UpdateEmployeeInput,
    ) -> async_graphql::Result<EmployeeNode> {
        let user = require_any(ctx, &[UserRole::Hr])?;
        let db = database(ctx)?;
        let existing = find_employee(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        let existing_id = existing.id;
        let mut active: employee::ActiveModel = existing.into();
        if let Some(value) = input.first_name {
            active.first_name = Set(required_text("firstName", &value, 80)?);
        }
        if let Some(value) = input.last_name {
            active.last_name = Set(required_text("lastName", &value, 80)?);
        }
        if let Some(value) = input.email {
            let email = normalize_email(&value)?;
            if email_taken(db.as_ref(), user.tenant_id, &email, Some(existing_id)).await? {
                return Err(conflict("an employee with this email already exists"));
            }
            active.email = Set(email);
        }
        if input.phone.is_some() {
            active.phone = Set(optional_text("phone", input.phone, 32)?);
        }
        if let Some(department_id) = link_change(input.department_id)? {
            if let Some(id) = department_id {
                find_department(db.as_ref(), user.tenant_id, id).await?;
            }
            active.department_id = Set(department_id);
        }
        if let Some(job_role_id) = link_change(input.job_role_id)? {
            if let Some(id) = job_role_id {
                find_job_role(db.as_ref(), user.tenant_id, id).await?;
            }
            active.job_role_id = Set(job_role_id);
        }
        if let Some(manager_id) = link_change(input.manager_id)? {
            if let Some(id) = manager_id {
                if id == existing_id {
                    return Err(validation_error("an employee cannot manage themselves"));
                }
                find_employee(db.as_ref(), user.tenant_id, id).await?;
            }
            active.manager_id = Set(manager_id);
        }
        if let Some(status) = input.status {
            active.status = Set(status.into());
        }
        if let Some(hire_date) = input.hire_date {
            active.hire_date = Set(hire_date);
        }
        if let Some(cents) = input.base_salary_cents {
            active.base_salary_cents = Set(validate_salary(cents)?);
        }
        if input.reference_photo.is_some() {
            active.reference_photo = Set(validate_photo(input.reference_photo)?);
        }
        active.updated_at = Set(now());
        let model = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(model.into())
    }

    /// Soft delete marks the employee `TERMINATED`; `hard` (admin only)
    /// removes the row and unlinks any login, reports and department it heads.
    async fn delete_employee(
        &self,
        ctx: &Context<'_>,
        id: ID,
        hard: Option<bool>,
    ) -> async_graphql::Result<bool> {
        let hard = hard.unwrap_or(false);
        let user = if hard {
            require_any(ctx, &[UserRole::Admin])?
        } else {
            require_any(ctx, &[UserRole::Hr])?
        };
        let db = database(ctx)?;
        let existing = find_employee(db.as_ref(), user.tenant_id, parse_uuid(&id)?).await?;
        if !hard {
            let mut active: employee::ActiveModel = existing.into();
            active.status = Set(employee::Status::Terminated);
            active.updated_at = Set(now());
            active.update(db.as_ref()).await.map_err(db_error)?;
            return Ok(true);
        }
        let txn = db.begin().await.map_err(db_error)?;
        app_user::Entity::update_many()
            .col_expr(app_user::Column::EmployeeId, Expr::value(Option::<Uuid>::None))
            .filter(app_user::Column::EmployeeId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        employee::Entity::update_many()
            .col_expr(employee::Column::ManagerId, Expr::value(Option::<Uuid>::None))
            .filter(employee::Column::ManagerId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        department::Entity::update_many()
            .col_expr(department::Column::HeadEmployeeId, Expr::value(Option::<Uuid>::None))
            .filter(department::Column::TenantId.eq(user.tenant_id))
            .filter(department::Column::HeadEmployeeId.eq(existing.id))
            .exec(&txn)
            .await
            .map_err(db_error)?;
        employee::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await
            .map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_status_converts_both_ways() {
        for status in [
            employee::Status::Active,
            employee::Status::OnLeave,
            employee::Status::Terminated,
        ] {
            assert_eq!(employee::Status::from(EmployeeStatus::from(status)), status);
        }
        assert_eq!(EmployeeStatus::from(employee::Status::OnLeave), EmployeeStatus::OnLeave);
    }

    #[test]
    fn link_changes_distinguish_null_from_absent() {
        assert_eq!(link_change(MaybeUndefined::Undefined).unwrap(), None);
        assert_eq!(link_change(MaybeUndefined::Null).unwrap(), Some(None));
        let id = Uuid::new_v4();
        assert_eq!(
            link_change(MaybeUndefined::Value(ID::from(id.to_string()))).unwrap(),
            Some(Some(id))
        );
        assert!(link_change(MaybeUndefined::Value(ID::from("nope"))).is_err());
    }
}
