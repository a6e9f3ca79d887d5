use sea_orm_migration::prelude::*;

use crate::m20250301_000001_tenancy::Tenant;

#[derive(DeriveIden)]
enum Department {
    Table,
    Id,
    TenantId,
    Name,
    Description,
    HeadEmployeeId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum JobRole {
    Table,
    Id,
    TenantId,
    Title,
    Description,
    DepartmentId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Employee {
    Table,
    Id,
    TenantId,
    EmployeeCode,
    FirstName,
    LastName,
    Email,
    Phone,
    DepartmentId,
    JobRoleId,
    ManagerId,
    Status,
    HireDate,
    BaseSalaryCents,
    ReferencePhoto,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LeaveRequest {
    Table,
    Id,
    TenantId,
    EmployeeId,
    LeaveType,
    StartDate,
    EndDate,
    Days,
    Reason,
    Status,
    DecidedBy,
    DecisionNote,
    DecidedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PayrollRun {
    Table,
    Id,
    TenantId,
    Period,
    Status,
    EmployeeCount,
    TotalGrossCents,
    TotalNetCents,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payslip {
    Table,
    Id,
    TenantId,
    RunId,
    EmployeeId,
    BaseCents,
    BonusCents,
    DeductionsCents,
    NetCents,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Attendance {
    Table,
    Id,
    TenantId,
    EmployeeId,
    WorkDate,
    ClockIn,
    ClockOut,
    Status,
    FaceVerified,
}

pub(crate) fn tenant_fk(table: impl IntoIden + 'static, name: &str) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, Alias::new("tenant_id"))
        .to(Tenant::Table, Tenant::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

pub(crate) fn employee_fk(table: impl IntoIden + 'static, name: &str) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, Alias::new("employee_id"))
        .to(Employee::Table, Employee::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Department::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Department::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Department::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Department::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Department::Description).text())
                    .col(ColumnDef::new(Department::HeadEmployeeId).uuid())
                    .col(ColumnDef::new(Department::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Department::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Department::Table, "fk_department_tenant"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_department_tenant_name")
                    .table(Department::Table)
                    .col(Department::TenantId)
                    .col(Department::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobRole::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(JobRole::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(JobRole::TenantId).uuid().not_null())
                    .col(ColumnDef::new(JobRole::Title).string_len(128).not_null())
                    .col(ColumnDef::new(JobRole::Description).text())
                    .col(ColumnDef::new(JobRole::DepartmentId).uuid())
                    .col(ColumnDef::new(JobRole::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(JobRole::Table, "fk_job_role_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_role_department")
                            .from(JobRole::Table, JobRole::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employee::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Employee::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Employee::EmployeeCode).string_len(32).not_null())
                    .col(ColumnDef::new(Employee::FirstName).string_len(64).not_null())
                    .col(ColumnDef::new(Employee::LastName).string_len(64).not_null())
                    .col(ColumnDef::new(Employee::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Employee::Phone).string_len(64))
                    .col(ColumnDef::new(Employee::DepartmentId).uuid())
                    .col(ColumnDef::new(Employee::JobRoleId).uuid())
                    .col(ColumnDef::new(Employee::ManagerId).uuid())
                    .col(ColumnDef::new(Employee::Status).string_len(16).not_null().default("ACTIVE"))
                    .col(ColumnDef::new(Employee::HireDate).date().not_null())
                    .col(ColumnDef::new(Employee::BaseSalaryCents).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Employee::ReferencePhoto).text())
                    .col(ColumnDef::new(Employee::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Employee::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Employee::Table, "fk_employee_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_department")
                            .from(Employee::Table, Employee::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_job_role")
                            .from(Employee::Table, Employee::JobRoleId)
                            .to(JobRole::Table, JobRole::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;
        for (name, column) in [
            ("ux_employee_tenant_email", Employee::Email),
            ("ux_employee_tenant_code", Employee::EmployeeCode),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Employee::Table)
                        .col(Employee::TenantId)
                        .col(column)
                        .unique()
                        .to_owned(),
                )
                .await?;
        }
        manager
            .create_index(
                Index::create()
                    .name("idx_employee_department")
                    .table(Employee::Table)
                    .col(Employee::DepartmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LeaveRequest::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(LeaveRequest::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(LeaveRequest::TenantId).uuid().not_null())
                    .col(ColumnDef::new(LeaveRequest::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(LeaveRequest::LeaveType).string_len(16).not_null())
                    .col(ColumnDef::new(LeaveRequest::StartDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequest::EndDate).date().not_null())
                    .col(ColumnDef::new(LeaveRequest::Days).integer().not_null())
                    .col(ColumnDef::new(LeaveRequest::Reason).text())
                    .col(ColumnDef::new(LeaveRequest::Status).string_len(16).not_null().default("PENDING"))
                    .col(ColumnDef::new(LeaveRequest::DecidedBy).uuid())
                    .col(ColumnDef::new(LeaveRequest::DecisionNote).text())
                    .col(ColumnDef::new(LeaveRequest::DecidedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(LeaveRequest::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(LeaveRequest::Table, "fk_leave_request_tenant"))
                    .foreign_key(&mut employee_fk(LeaveRequest::Table, "fk_leave_request_employee"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_leave_request_employee")
                    .table(LeaveRequest::Table)
                    .col(LeaveRequest::EmployeeId)
                    .col(LeaveRequest::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PayrollRun::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PayrollRun::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(PayrollRun::TenantId).uuid().not_null())
                    .col(ColumnDef::new(PayrollRun::Period).date().not_null())
                    .col(ColumnDef::new(PayrollRun::Status).string_len(16).not_null().default("DRAFT"))
                    .col(ColumnDef::new(PayrollRun::EmployeeCount).integer().not_null())
                    .col(ColumnDef::new(PayrollRun::TotalGrossCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollRun::TotalNetCents).big_integer().not_null())
                    .col(ColumnDef::new(PayrollRun::CreatedBy).uuid())
                    .col(ColumnDef::new(PayrollRun::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(PayrollRun::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(PayrollRun::Table, "fk_payroll_run_tenant"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_payroll_run_tenant_period")
                    .table(PayrollRun::Table)
                    .col(PayrollRun::TenantId)
                    .col(PayrollRun::Period)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payslip::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payslip::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payslip::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Payslip::RunId).uuid().not_null())
                    .col(ColumnDef::new(Payslip::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Payslip::BaseCents).big_integer().not_null())
                    .col(ColumnDef::new(Payslip::BonusCents).big_integer().not_null())
                    .col(ColumnDef::new(Payslip::DeductionsCents).big_integer().not_null())
                    .col(ColumnDef::new(Payslip::NetCents).big_integer().not_null())
                    .col(ColumnDef::new(Payslip::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Payslip::Table, "fk_payslip_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payslip_run")
                            .from(Payslip::Table, Payslip::RunId)
                            .to(PayrollRun::Table, PayrollRun::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(&mut employee_fk(Payslip::Table, "fk_payslip_employee"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attendance::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Attendance::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Attendance::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Attendance::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Attendance::WorkDate).date().not_null())
                    .col(ColumnDef::new(Attendance::ClockIn).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Attendance::ClockOut).timestamp_with_time_zone())
                    .col(ColumnDef::new(Attendance::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Attendance::FaceVerified).boolean())
                    .foreign_key(&mut tenant_fk(Attendance::Table, "fk_attendance_tenant"))
                    .foreign_key(&mut employee_fk(Attendance::Table, "fk_attendance_employee"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_attendance_employee_day")
                    .table(Attendance::Table)
                    .col(Attendance::EmployeeId)
                    .col(Attendance::WorkDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Attendance::Table.into_iden(),
            Payslip::Table.into_iden(),
            PayrollRun::Table.into_iden(),
            LeaveRequest::Table.into_iden(),
            Employee::Table.into_iden(),
            JobRole::Table.into_iden(),
            Department::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}
