//! Creates the `products` table keyed by `(platform, product_id)`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(Products::ProductId).string_len(64).not_null())
                    .col(ColumnDef::new(Products::SpuId).string_len(64).null())
                    .col(ColumnDef::new(Products::Name).string_len(512).null())
                    .col(ColumnDef::new(Products::ResourceType).integer().null())
                    .col(ColumnDef::new(Products::ResourceTypeLabel).string_len(64).null())
                    .col(ColumnDef::new(Products::SpuType).string_len(32).null())
                    .col(ColumnDef::new(Products::SaleStatus).integer().null())
                    .col(ColumnDef::new(Products::SaleStatusLabel).string_len(64).null())
                    .col(ColumnDef::new(Products::PriceLow).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Products::PriceHigh).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Products::ImageUrl).text().null())
                    .col(
                        ColumnDef::new(Products::IsDeleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Products::SourceCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Products::SourceUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Products::Platform)
                            .col(Products::ProductId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Platform,
    ProductId,
    SpuId,
    Name,
    ResourceType,
    ResourceTypeLabel,
    SpuType,
    SaleStatus,
    SaleStatusLabel,
    PriceLow,
    PriceHigh,
    ImageUrl,
    IsDeleted,
    SourceCreatedAt,
    SourceUpdatedAt,
}
