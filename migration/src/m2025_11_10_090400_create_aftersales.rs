//! Creates `aftersale_orders` and their `aftersale_items`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AftersaleOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AftersaleOrders::Platform)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::AftersaleId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::OrderId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AftersaleOrders::UserId).string_len(64).null())
                    .col(ColumnDef::new(AftersaleOrders::State).integer().null())
                    .col(
                        ColumnDef::new(AftersaleOrders::StateLabel)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(AftersaleOrders::StateText).string_len(128).null())
                    .col(ColumnDef::new(AftersaleOrders::SaleType).integer().null())
                    .col(
                        ColumnDef::new(AftersaleOrders::SaleTypeLabel)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::ApplyRefundMoney)
                            .decimal_len(14, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::RefundMoney)
                            .decimal_len(14, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(AftersaleOrders::Reason).text().null())
                    .col(ColumnDef::new(AftersaleOrders::Remark).text().null())
                    .col(ColumnDef::new(AftersaleOrders::MerchantRemark).text().null())
                    .col(ColumnDef::new(AftersaleOrders::GoodsNameOverview).text().null())
                    .col(
                        ColumnDef::new(AftersaleOrders::SourceCreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::SourceUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleOrders::InvalidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(AftersaleOrders::Platform)
                            .col(AftersaleOrders::AftersaleId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_aftersale_orders_order")
                    .table(AftersaleOrders::Table)
                    .col(AftersaleOrders::Platform)
                    .col(AftersaleOrders::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AftersaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AftersaleItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AftersaleItems::Platform)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AftersaleItems::AftersaleId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AftersaleItems::LineNo).integer().not_null())
                    .col(ColumnDef::new(AftersaleItems::GoodsName).string_len(512).null())
                    .col(ColumnDef::new(AftersaleItems::SkuInfo).text().null())
                    .col(ColumnDef::new(AftersaleItems::Quantity).integer().null())
                    .col(
                        ColumnDef::new(AftersaleItems::GoodsPrice)
                            .decimal_len(14, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(AftersaleItems::GoodsTag).string_len(128).null())
                    .col(ColumnDef::new(AftersaleItems::ImageUrl).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_aftersale_items_aftersale")
                            .from(
                                AftersaleItems::Table,
                                (AftersaleItems::Platform, AftersaleItems::AftersaleId),
                            )
                            .to(
                                AftersaleOrders::Table,
                                (AftersaleOrders::Platform, AftersaleOrders::AftersaleId),
                            )
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_aftersale_items_aftersale")
                    .table(AftersaleItems::Table)
                    .col(AftersaleItems::Platform)
                    .col(AftersaleItems::AftersaleId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AftersaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AftersaleOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AftersaleOrders {
    Table,
    Platform,
    AftersaleId,
    OrderId,
    UserId,
    State,
    StateLabel,
    StateText,
    SaleType,
    SaleTypeLabel,
    ApplyRefundMoney,
    RefundMoney,
    Reason,
    Remark,
    MerchantRemark,
    GoodsNameOverview,
    SourceCreatedAt,
    SourceUpdatedAt,
    InvalidAt,
}

#[derive(DeriveIden)]
enum AftersaleItems {
    Table,
    Id,
    Platform,
    AftersaleId,
    LineNo,
    GoodsName,
    SkuInfo,
    Quantity,
    GoodsPrice,
    GoodsTag,
    ImageUrl,
}
