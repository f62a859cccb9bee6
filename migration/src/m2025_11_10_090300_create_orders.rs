//! Creates `orders` and their `order_items`.
//!
//! Orders are keyed by `(platform, order_id)`. Items carry a surrogate key and
//! reference their order through a cascading composite foreign key; an
//! order's items are always replaced as a whole.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::OrderId).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Orders::AppId).string_len(64).null())
                    .col(ColumnDef::new(Orders::OrderState).integer().null())
                    .col(ColumnDef::new(Orders::OrderStateLabel).string_len(64).null())
                    .col(ColumnDef::new(Orders::PayState).integer().null())
                    .col(ColumnDef::new(Orders::PayStateLabel).string_len(64).null())
                    .col(ColumnDef::new(Orders::OrderType).integer().null())
                    .col(ColumnDef::new(Orders::SettleState).integer().null())
                    .col(ColumnDef::new(Orders::AftersaleState).integer().null())
                    .col(ColumnDef::new(Orders::AftersaleStateLabel).string_len(64).null())
                    .col(ColumnDef::new(Orders::PayType).integer().null())
                    .col(ColumnDef::new(Orders::ResourceType).integer().null())
                    .col(ColumnDef::new(Orders::ResourceTypeLabel).string_len(64).null())
                    .col(ColumnDef::new(Orders::TradeId).string_len(128).null())
                    .col(ColumnDef::new(Orders::GoodsBuyNum).integer().null())
                    .col(ColumnDef::new(Orders::GoodsNameOverview).text().null())
                    .col(ColumnDef::new(Orders::ActualFee).decimal_len(14, 2).null())
                    .col(
                        ColumnDef::new(Orders::GoodsOriginalTotalPrice)
                            .decimal_len(14, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::DiscountAmount).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Orders::FreightPrice).decimal_len(14, 2).null())
                    .col(ColumnDef::new(Orders::RefundFee).decimal_len(14, 2).null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Orders::SettledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::RefundedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Orders::SourceUpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Orders::ShipInfo).json().null())
                    .primary_key(Index::create().col(Orders::Platform).col(Orders::OrderId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user")
                    .table(Orders::Table)
                    .col(Orders::Platform)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_source_updated_at")
                    .table(Orders::Table)
                    .col(Orders::SourceUpdatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::Platform).string_len(32).not_null())
                    .col(ColumnDef::new(OrderItems::OrderId).string_len(64).not_null())
                    .col(ColumnDef::new(OrderItems::LineNo).integer().not_null())
                    .col(ColumnDef::new(OrderItems::ProductId).string_len(64).not_null())
                    .col(ColumnDef::new(OrderItems::SkuId).string_len(64).null())
                    .col(ColumnDef::new(OrderItems::GoodsName).string_len(512).null())
                    .col(ColumnDef::new(OrderItems::GoodsSpecDesc).text().null())
                    .col(ColumnDef::new(OrderItems::ResourceType).integer().null())
                    .col(
                        ColumnDef::new(OrderItems::ResourceTypeLabel)
                            .string_len(64)
                            .null(),
                    )
                    .col(ColumnDef::new(OrderItems::Quantity).integer().null())
                    .col(ColumnDef::new(OrderItems::UnitPrice).decimal_len(14, 2).null())
                    .col(ColumnDef::new(OrderItems::TotalPrice).decimal_len(14, 2).null())
                    .col(ColumnDef::new(OrderItems::RefundState).integer().null())
                    .col(ColumnDef::new(OrderItems::ShipState).integer().null())
                    .col(ColumnDef::new(OrderItems::ShipStateLabel).string_len(64).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(
                                OrderItems::Table,
                                (OrderItems::Platform, OrderItems::OrderId),
                            )
                            .to(Orders::Table, (Orders::Platform, Orders::OrderId))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order")
                    .table(OrderItems::Table)
                    .col(OrderItems::Platform)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Platform,
    OrderId,
    UserId,
    AppId,
    OrderState,
    OrderStateLabel,
    PayState,
    PayStateLabel,
    OrderType,
    SettleState,
    AftersaleState,
    AftersaleStateLabel,
    PayType,
    ResourceType,
    ResourceTypeLabel,
    TradeId,
    GoodsBuyNum,
    GoodsNameOverview,
    ActualFee,
    GoodsOriginalTotalPrice,
    DiscountAmount,
    FreightPrice,
    RefundFee,
    CreatedAt,
    PaidAt,
    SettledAt,
    RefundedAt,
    SourceUpdatedAt,
    ShipInfo,
}

#[derive(DeriveIden)]
enum OrderItems {
    Table,
    Id,
    Platform,
    OrderId,
    LineNo,
    ProductId,
    SkuId,
    GoodsName,
    GoodsSpecDesc,
    ResourceType,
    ResourceTypeLabel,
    Quantity,
    UnitPrice,
    TotalPrice,
    RefundState,
    ShipState,
    ShipStateLabel,
}
