use sea_orm_migration::prelude::*;

use crate::m20250301_000001_tenancy::AppUser;
use crate::m20250301_000002_hr_core::{employee_fk, tenant_fk};

#[derive(DeriveIden)]
enum Applicant {
    Table,
    Id,
    TenantId,
    FullName,
    Email,
    Phone,
    Position,
    ResumeText,
    Status,
    AiScore,
    AiSummary,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Course {
    Table,
    Id,
    TenantId,
    Title,
    Description,
    Category,
    DurationHours,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Enrollment {
    Table,
    Id,
    TenantId,
    CourseId,
    EmployeeId,
    Status,
    ProgressPct,
    EnrolledAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Ticket {
    Table,
    Id,
    TenantId,
    RaisedBy,
    Subject,
    Description,
    Category,
    Priority,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Assessment {
    Table,
    Id,
    TenantId,
    EmployeeId,
    Kind,
    Score,
    Wpm,
    Accuracy,
    Details,
    AssessedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Notification {
    Table,
    Id,
    TenantId,
    UserId,
    Title,
    Body,
    Link,
    IsRead,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Applicant::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Applicant::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Applicant::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Applicant::FullName).string_len(128).not_null())
                    .col(ColumnDef::new(Applicant::Email).string_len(320).not_null())
                    .col(ColumnDef::new(Applicant::Phone).string_len(64))
                    .col(ColumnDef::new(Applicant::Position).string_len(128).not_null())
                    .col(ColumnDef::new(Applicant::ResumeText).text().not_null())
                    .col(ColumnDef::new(Applicant::Status).string_len(16).not_null().default("APPLIED"))
                    .col(ColumnDef::new(Applicant::AiScore).integer())
                    .col(ColumnDef::new(Applicant::AiSummary).text())
                    .col(ColumnDef::new(Applicant::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Applicant::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Applicant::Table, "fk_applicant_tenant"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Course::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Course::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Course::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Course::Description).text())
                    .col(ColumnDef::new(Course::Category).string_len(64))
                    .col(ColumnDef::new(Course::DurationHours).integer().not_null().default(1))
                    .col(ColumnDef::new(Course::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Course::Table, "fk_course_tenant"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Enrollment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Enrollment::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Enrollment::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Enrollment::CourseId).uuid().not_null())
                    .col(ColumnDef::new(Enrollment::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Enrollment::Status).string_len(16).not_null().default("ENROLLED"))
                    .col(ColumnDef::new(Enrollment::ProgressPct).integer().not_null().default(0))
                    .col(ColumnDef::new(Enrollment::EnrolledAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Enrollment::CompletedAt).timestamp_with_time_zone())
                    .foreign_key(&mut tenant_fk(Enrollment::Table, "fk_enrollment_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_enrollment_course")
                            .from(Enrollment::Table, Enrollment::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(&mut employee_fk(Enrollment::Table, "fk_enrollment_employee"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ux_enrollment_course_employee")
                    .table(Enrollment::Table)
                    .col(Enrollment::CourseId)
                    .col(Enrollment::EmployeeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Ticket::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Ticket::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Ticket::RaisedBy).uuid().not_null())
                    .col(ColumnDef::new(Ticket::Subject).string_len(256).not_null())
                    .col(ColumnDef::new(Ticket::Description).text().not_null())
                    .col(ColumnDef::new(Ticket::Category).string_len(16).not_null())
                    .col(ColumnDef::new(Ticket::Priority).string_len(16).not_null())
                    .col(ColumnDef::new(Ticket::Status).string_len(16).not_null().default("OPEN"))
                    .col(ColumnDef::new(Ticket::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Ticket::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Ticket::Table, "fk_ticket_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_reporter")
                            .from(Ticket::Table, Ticket::RaisedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assessment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Assessment::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Assessment::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Assessment::EmployeeId).uuid().not_null())
                    .col(ColumnDef::new(Assessment::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Assessment::Score).integer().not_null())
                    .col(ColumnDef::new(Assessment::Wpm).integer())
                    .col(ColumnDef::new(Assessment::Accuracy).integer())
                    .col(ColumnDef::new(Assessment::Details).json())
                    .col(ColumnDef::new(Assessment::AssessedBy).uuid())
                    .col(ColumnDef::new(Assessment::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Assessment::Table, "fk_assessment_tenant"))
                    .foreign_key(&mut employee_fk(Assessment::Table, "fk_assessment_employee"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Notification::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Notification::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Notification::UserId).uuid().not_null())
                    .col(ColumnDef::new(Notification::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Notification::Body).text().not_null())
                    .col(ColumnDef::new(Notification::Link).string_len(512))
                    .col(ColumnDef::new(Notification::IsRead).boolean().not_null().default(false))
                    .col(ColumnDef::new(Notification::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(&mut tenant_fk(Notification::Table, "fk_notification_tenant"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notification_user")
                            .from(Notification::Table, Notification::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notification_user_read")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .col(Notification::IsRead)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Notification::Table.into_iden(),
            Assessment::Table.into_iden(),
            Ticket::Table.into_iden(),
            Enrollment::Table.into_iden(),
            Course::Table.into_iden(),
            Applicant::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }
        Ok(())
    }
}
