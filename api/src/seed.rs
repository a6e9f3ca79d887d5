//! Demo data for local development and the integration tests.

use chrono::{Duration, NaiveDate, Utc};
use entity::{app_user, course, department, employee, job_role, tenant, user_role};
use products_hr::employee_code;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, prelude::DateTimeWithTimeZone,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::hash_password;

pub const SEED_EMAIL_DOMAIN: &str = "optitalent.test";

pub struct SeededRecords {
    pub tenant: tenant::Model,
    pub users: Vec<app_user::Model>,
    pub departments: Vec<department::Model>,
    pub job_roles: Vec<job_role::Model>,
    pub employees: Vec<employee::Model>,
    pub courses: Vec<course::Model>,
}

impl SeededRecords {
    pub fn user_email(&self, email: &str) -> Option<&app_user::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn employee_email(&self, email: &str) -> Option<&employee::Model> {
        self.employees.iter().find(|e| e.email == email)
    }

    pub fn department_named(&self, name: &str) -> Option<&department::Model> {
        self.departments.iter().find(|d| d.name == name)
    }

    pub fn course_titled(&self, title: &str) -> Option<&course::Model> {
        self.courses.iter().find(|c| c.title == title)
    }
}

struct StaffSeed {
    local: &'static str,
    first: &'static str,
    last: &'static str,
    department: usize,
    job_role: usize,
    role: user_role::Role,
    salary_cents: i64,
    hired_days_ago: i64,
}

const DEPARTMENTS: &[&str] = &["Human Resources", "Engineering", "Customer Support"];

/// `(title, department index)`
const JOB_ROLES: &[(&str, usize)] = &[
    ("HR Generalist", 0),
    ("Talent Recruiter", 0),
    ("Engineering Manager", 1),
    ("Software Engineer", 1),
    ("Support Agent", 2),
    ("Quality Analyst", 2),
];

const STAFF: &[StaffSeed] = &[
    StaffSeed { local: "hr", first: "Hana", last: "Reyes", department: 0, job_role: 0, role: user_role::Role::Hr, salary_cents: 5_200_000, hired_days_ago: 1400 },
    StaffSeed { local: "recruiter", first: "Ravi", last: "Kumar", department: 0, job_role: 1, role: user_role::Role::Recruiter, salary_cents: 4_600_000, hired_days_ago: 900 },
    StaffSeed { local: "manager", first: "Maya", last: "Lin", department: 1, job_role: 2, role: user_role::Role::Manager, salary_cents: 8_400_000, hired_days_ago: 2100 },
    StaffSeed { local: "employee", first: "Eli", last: "Novak", department: 1, job_role: 3, role: user_role::Role::Employee, salary_cents: 6_500_000, hired_days_ago: 600 },
    StaffSeed { local: "trainee", first: "Tess", last: "Okafor", department: 2, job_role: 4, role: user_role::Role::Trainee, salary_cents: 3_100_000, hired_days_ago: 30 },
    StaffSeed { local: "qa", first: "Quinn", last: "Adler", department: 2, job_role: 5, role: user_role::Role::QaAnalyst, salary_cents: 4_800_000, hired_days_ago: 750 },
];

/// `(title, category, hours)`
const COURSES: &[(&str, &str, i32)] = &[
    ("Workplace Safety Basics", "Compliance", 2),
    ("Effective Customer Calls", "Support", 6),
    ("Rust for Backend Services", "Engineering", 24),
];

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    tenant_id: Uuid,
    email: String,
    display_name: String,
    password_hash: &str,
    employee_id: Option<Uuid>,
    roles: &[user_role::Role],
) -> Result<app_user::Model, DbErr> {
    let at: DateTimeWithTimeZone = Utc::now().into();
    let model = app_user::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        email: Set(email),
        display_name: Set(display_name),
        password_hash: Set(password_hash.to_string()),
        employee_id: Set(employee_id),
        is_active: Set(true),
        created_at: Set(at),
        updated_at: Set(at),
    }
    .insert(db)
    .await?;
    for role in roles {
        user_role::ActiveModel {
            user_id: Set(model.id),
            role: Set(*role),
        }
        .insert(db)
        .await?;
    }
    Ok(model)
}

/// Creates (or reuses) the tenant `slug` and fills it with a small company:
/// departments, job roles, one employee per staff role with a matching login,
/// a super admin and a tenant admin, and a few courses. Every account shares
/// `password`. Fails when the tenant already has employees.
pub async fn seed_demo(
    db: &sea_orm::DatabaseConnection,
    slug: &str,
    name: &str,
    password: &str,
) -> Result<SeededRecords, DbErr> {
    let tenant = platform_db::ensure_tenant(db, slug, name).await?;
    let existing = employee::Entity::find()
        .filter(employee::Column::TenantId.eq(tenant.id))
        .count(db)
        .await?;
    if existing > 0 {
        return Err(DbErr::Custom(format!("tenant {slug} is already seeded")));
    }
    let password_hash =
        hash_password(password).map_err(|err| DbErr::Custom(format!("password hash: {err}")))?;
    let now = Utc::now();
    let at: DateTimeWithTimeZone = now.into();
    let today: NaiveDate = now.date_naive();

    let mut departments = Vec::with_capacity(DEPARTMENTS.len());
    for dept in DEPARTMENTS {
        departments.push(
            department::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant.id),
                name: Set(dept.to_string()),
                description: Set(None),
                head_employee_id: Set(None),
                created_at: Set(at),
                updated_at: Set(at),
            }
            .insert(db)
            .await?,
        );
    }

    let mut job_roles = Vec::with_capacity(JOB_ROLES.len());
    for (title, dept) in JOB_ROLES {
        job_roles.push(
            job_role::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant.id),
                title: Set(title.to_string()),
                description: Set(None),
                department_id: Set(Some(departments[*dept].id)),
                created_at: Set(at),
            }
            .insert(db)
            .await?,
        );
    }

    let mut users = Vec::with_capacity(STAFF.len() + 2);
    users.push(
        insert_user(
            db,
            tenant.id,
            format!("super@{SEED_EMAIL_DOMAIN}"),
            "Platform Owner".into(),
            &password_hash,
            None,
            &[user_role::Role::SuperAdmin],
        )
        .await?,
    );
    users.push(
        insert_user(
            db,
            tenant.id,
            format!("admin@{SEED_EMAIL_DOMAIN}"),
            "Tenant Admin".into(),
            &password_hash,
            None,
            &[user_role::Role::Admin],
        )
        .await?,
    );

    let mut employees: Vec<employee::Model> = Vec::with_capacity(STAFF.len());
    // Engineering staff after the manager report to them.
    let mut engineering_manager: Option<Uuid> = None;
    for (seq, staff) in STAFF.iter().enumerate() {
        let email = format!("{}@{SEED_EMAIL_DOMAIN}", staff.local);
        let manager_id = engineering_manager.filter(|_| staff.department == 1);
        let record = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.id),
            employee_code: Set(employee_code(seq as u64 + 1)),
            first_name: Set(staff.first.to_string()),
            last_name: Set(staff.last.to_string()),
            email: Set(email.clone()),
            phone: Set(None),
            department_id: Set(Some(departments[staff.department].id)),
            job_role_id: Set(Some(job_roles[staff.job_role].id)),
            manager_id: Set(manager_id),
            status: Set(employee::Status::Active),
            hire_date: Set(today - Duration::days(staff.hired_days_ago)),
            base_salary_cents: Set(staff.salary_cents),
            reference_photo: Set(None),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(db)
        .await?;
        if staff.role == user_role::Role::Manager {
            engineering_manager = Some(record.id);
        }
        let mut roles = vec![staff.role];
        if staff.role != user_role::Role::Employee {
            roles.push(user_role::Role::Employee);
        }
        users.push(
            insert_user(
                db,
                tenant.id,
                email,
                format!("{} {}", staff.first, staff.last),
                &password_hash,
                Some(record.id),
                &roles,
            )
            .await?,
        );
        employees.push(record);
    }

    let mut courses = Vec::with_capacity(COURSES.len());
    for (title, category, hours) in COURSES {
        courses.push(
            course::ActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant.id),
                title: Set(title.to_string()),
                description: Set(None),
                category: Set(Some(category.to_string())),
                duration_hours: Set(*hours),
                created_at: Set(at),
            }
            .insert(db)
            .await?,
        );
    }

    info!(tenant = %tenant.slug, users = users.len(), employees = employees.len(), "demo data seeded");
    Ok(SeededRecords {
        tenant,
        users,
        departments,
        job_roles,
        employees,
        courses,
    })
}
