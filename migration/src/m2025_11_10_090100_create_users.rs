//! Creates the `users` table keyed by `(platform, user_id)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(Users::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Users::Nickname).string_len(255).null())
                    .col(ColumnDef::new(Users::AvatarUrl).text().null())
                    .col(ColumnDef::new(Users::Phone).string_len(32).null())
                    .col(ColumnDef::new(Users::Source).string_len(64).null())
                    .col(ColumnDef::new(Users::WxUnionId).string_len(128).null())
                    .col(ColumnDef::new(Users::WxOpenId).string_len(128).null())
                    .col(ColumnDef::new(Users::TotalPaidAmount).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Users::PurchaseCount).integer().null())
                    .col(
                        ColumnDef::new(Users::RegisteredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(Index::create().col(Users::Platform).col(Users::UserId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_phone")
                    .table(Users::Table)
                    .col(Users::Phone)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Platform,
    UserId,
    Nickname,
    AvatarUrl,
    Phone,
    Source,
    WxUnionId,
    WxOpenId,
    TotalPaidAmount,
    PurchaseCount,
    RegisteredAt,
}
