use std::collections::HashMap;

use async_graphql::{Context, ID, InputObject, Object, SimpleObject};
use chrono::{DateTime, Utc};
use entity::{employee, payroll_run, payslip};
use platform_api::validation_error;
use products_hr::{PayComponents, parse_period};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::UserRole,
    schema::{
        conflict, current_user, database, db_error, not_found, now, page_window, parse_optional_id,
        parse_uuid, require_any, target_employee,
    },
};

const PAYROLL_ADMINS: &[UserRole] = &[UserRole::Hr];

graphql_enum!(PayrollStatus => payroll_run::Status { Draft, Processed, Paid });

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PayrollRun")]
pub struct PayrollRunNode {
    pub id: ID,
    /// `YYYY-MM`.
    pub period: String,
    pub status: PayrollStatus,
    pub employee_count: i32,
    pub total_gross_cents: i64,
    pub total_net_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payroll_run::Model> for PayrollRunNode {
    fn from(model: payroll_run::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            period: model.period.format("%Y-%m").to_string(),
            status: model.status.into(),
            employee_count: model.employee_count,
            total_gross_cents: model.total_gross_cents,
            total_net_cents: model.total_net_cents,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Payslip")]
pub struct PayslipNode {
    pub id: ID,
    pub run_id: ID,
    pub employee_id: ID,
    pub base_cents: i64,
    pub bonus_cents: i64,
    pub deductions_cents: i64,
    pub net_cents: i64,
}

impl From<payslip::Model> for PayslipNode {
    fn from(model: payslip::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            run_id: ID::from(model.run_id.to_string()),
            employee_id: ID::from(model.employee_id.to_string()),
            base_cents: model.base_cents,
            bonus_cents: model.bonus_cents,
            deductions_cents: model.deductions_cents,
            net_cents: model.net_cents,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct PayAdjustmentInput {
    pub employee_id: ID,
    #[graphql(default)]
    pub bonus_cents: i64,
    #[graphql(default)]
    pub deductions_cents: i64,
}

async fn find_run(
    db: &sea_orm::DatabaseConnection,
    tenant_id: Uuid,
    id: Uuid,
) -> async_graphql::Result<payroll_run::Model> {
    payroll_run::Entity::find_by_id(id)
        .filter(payroll_run::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("payroll run"))
}

async fn transition(
    ctx: &Context<'_>,
    id: &ID,
    from: payroll_run::Status,
    to: payroll_run::Status,
) -> async_graphql::Result<PayrollRunNode> {
    let user = require_any(ctx, PAYROLL_ADMINS)?;
    let db = database(ctx)?;
    let run = find_run(db.as_ref(), user.tenant_id, parse_uuid(id)?).await?;
    if run.status != from {
        return Err(conflict(format!(
            "payroll run is {:?}, expected {:?}",
            run.status, from
        )));
    }
    let mut active: payroll_run::ActiveModel = run.into();
    active.status = Set(to);
    active.updated_at = Set(now());
    let updated = active.update(db.as_ref()).await.map_err(db_error)?;
    info!(run_id = %updated.id, status = ?to, "payroll run advanced");
    Ok(updated.into())
}

#[derive(Default)]
pub struct PayrollQuery;

#[Object]
impl PayrollQuery {
    async fn payroll_runs(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<PayrollRunNode>> {
        let user = require_any(ctx, PAYROLL_ADMINS)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let rows = payroll_run::Entity::find()
            .filter(payroll_run::Column::TenantId.eq(user.tenant_id))
            .order_by_desc(payroll_run::Column::Period)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(PayrollRunNode::from).collect())
    }

    /// HR sees every payslip; other users only their own.
    async fn payslips(
        &self,
        ctx: &Context<'_>,
        run_id: Option<ID>,
        employee_id: Option<ID>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<Vec<PayslipNode>> {
        let user = current_user(ctx)?;
        let db = database(ctx)?;
        let (limit, skip) = page_window(first, offset)?;
        let mut query = payslip::Entity::find().filter(payslip::Column::TenantId.eq(user.tenant_id));
        if let Some(run_id) = parse_optional_id(run_id.as_ref())? {
            query = query.filter(payslip::Column::RunId.eq(run_id));
        }
        let requested = parse_optional_id(employee_id.as_ref())?;
        if user.has_any(PAYROLL_ADMINS) {
            if let Some(id) = requested {
                query = query.filter(payslip::Column::EmployeeId.eq(id));
            }
        } else {
            let own = target_employee(&user, requested, PAYROLL_ADMINS)?;
            query = query.filter(payslip::Column::EmployeeId.eq(own));
        }
        let rows = query
            .order_by_desc(payslip::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(PayslipNode::from).collect())
    }
}

#[derive(Default)]
pub struct PayrollMutation;

#[Object]
impl PayrollMutation {
    /// Creates a draft run with one payslip per active or on-leave employee.
    async fn create_payroll_run(
        &self,
        ctx: &Context<'_>,
        period: String,
        adjustments: Option<Vec<PayAdjustmentInput>>,
    ) -> async_graphql::Result<PayrollRunNode> {
        let user = require_any(ctx, PAYROLL_ADMINS)?;
        let db = database(ctx)?;
        let period = parse_period(&period).map_err(|err| validation_error(err.to_string()))?;

        let existing = payroll_run::Entity::find()
            .filter(payroll_run::Column::TenantId.eq(user.tenant_id))
            .filter(payroll_run::Column::Period.eq(period))
            .count(db.as_ref())
            .await
            .map_err(db_error)?;
        if existing > 0 {
            return Err(conflict(format!(
                "a payroll run for {} already exists",
                period.format("%Y-%m")
            )));
        }

        let employees = employee::Entity::find()
            .filter(employee::Column::TenantId.eq(user.tenant_id))
            .filter(employee::Column::Status.is_in([employee::Status::Active, employee::Status::OnLeave]))
            .order_by_asc(employee::Column::EmployeeCode)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        if employees.is_empty() {
            return Err(validation_error("no payable employees"));
        }

        let adjustments = adjustments.unwrap_or_default();
        let mut extras: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for adjustment in &adjustments {
            let id = parse_uuid(&adjustment.employee_id)?;
            if !employees.iter().any(|e| e.id == id) {
                return Err(validation_error(format!(
                    "employee {id} is not payable in this run"
                )));
            }
            if extras
                .insert(id, (adjustment.bonus_cents, adjustment.deductions_cents))
                .is_some()
            {
                return Err(validation_error(format!(
                    "employee {id} has more than one adjustment"
                )));
            }
        }

        let mut slips = Vec::with_capacity(employees.len());
        let (mut total_gross, mut total_net) = (0i64, 0i64);
        for employee in &employees {
            let (bonus_cents, deductions_cents) = extras.get(&employee.id).copied().unwrap_or((0, 0));
            let pay = PayComponents {
                base_cents: employee.base_salary_cents,
                bonus_cents,
                deductions_cents,
            };
            let gross = pay.gross_cents().map_err(|err| {
                validation_error(format!("{}: {err}", employee.employee_code))
            })?;
            let net = pay.net_cents().map_err(|err| {
                validation_error(format!("{}: {err}", employee.employee_code))
            })?;
            total_gross = total_gross
                .checked_add(gross)
                .ok_or_else(|| validation_error("payroll total overflows"))?;
            total_net += net;
            slips.push((employee.id, pay, net));
        }

        let timestamp = now();
        let txn = db.begin().await.map_err(db_error)?;
        let run = payroll_run::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(user.tenant_id),
            period: Set(period),
            status: Set(payroll_run::Status::Draft),
            employee_count: Set(slips.len() as i32),
            total_gross_cents: Set(total_gross),
            total_net_cents: Set(total_net),
            created_by: Set(Some(user.user_id)),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&txn)
        .await
        .map_err(db_error)?;
        for (employee_id, pay, net) in slips {
            payslip::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(user.tenant_id),
                run_id: Set(run.id),
                employee_id: Set(employee_id),
                base_cents: Set(pay.base_cents),
                bonus_cents: Set(pay.bonus_cents),
                deductions_cents: Set(pay.deductions_cents),
                net_cents: Set(net),
                created_at: Set(timestamp),
            }
            .insert(&txn)
            .await
            .map_err(db_error)?;
        }
        txn.commit().await.map_err(db_error)?;
        info!(run_id = %run.id, employees = run.employee_count, "payroll run created");
        Ok(run.into())
    }

    async fn finalize_payroll_run(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<PayrollRunNode> {
        transition(ctx, &id, payroll_run::Status::Draft, payroll_run::Status::Processed).await
    }

    async fn mark_payroll_run_paid(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<PayrollRunNode> {
        transition(ctx, &id, payroll_run::Status::Processed, payroll_run::Status::Paid).await
    }
}
