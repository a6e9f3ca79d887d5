use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum Tenant {
    Table,
    Id,
    Slug,
    Name,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum AppUser {
    Table,
    Id,
    TenantId,
    Email,
    DisplayName,
    PasswordHash,
    EmployeeId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserRole {
    Table,
    UserId,
    Role,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenant::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenant::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tenant::Slug).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(Tenant::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Tenant::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Tenant::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppUser::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AppUser::TenantId).uuid().not_null())
                    .col(ColumnDef::new(AppUser::Email).string_len(320).not_null())
                    .col(ColumnDef::new(AppUser::DisplayName).string_len(100).not_null())
                    .col(ColumnDef::new(AppUser::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(AppUser::EmployeeId).uuid())
                    .col(ColumnDef::new(AppUser::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(AppUser::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(AppUser::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_app_user_tenant")
                            .from(AppUser::Table, AppUser::TenantId)
                            .to(Tenant::Table, Tenant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_app_user_tenant_email")
                    .table(AppUser::Table)
                    .col(AppUser::TenantId)
                    .col(AppUser::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserRole::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserRole::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserRole::Role).string_len(16).not_null())
                    .primary_key(Index::create().col(UserRole::UserId).col(UserRole::Role))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_role_user")
                            .from(UserRole::Table, UserRole::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRole::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tenant::Table).to_owned())
            .await?;
        Ok(())
    }
}
