//! Order entity model for the `orders` table.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use crate::records::{Coded, OrderRecord};

/// A replicated order, keyed by `(platform, order_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    pub user_id: String,
    pub app_id: Option<String>,
    pub order_state: Option<i32>,
    pub order_state_label: Option<String>,
    pub pay_state: Option<i32>,
    pub pay_state_label: Option<String>,
    pub order_type: Option<i32>,
    pub settle_state: Option<i32>,
    pub aftersale_state: Option<i32>,
    pub aftersale_state_label: Option<String>,
    pub pay_type: Option<i32>,
    pub resource_type: Option<i32>,
    pub resource_type_label: Option<String>,
    pub trade_id: Option<String>,
    pub goods_buy_num: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub goods_name_overview: Option<String>,
    /// Amount actually paid, in major units.
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub actual_fee: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub goods_original_total_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub discount_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub freight_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub refund_fee: Option<Decimal>,
    pub created_at: DateTimeWithTimeZone,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub settled_at: Option<DateTimeWithTimeZone>,
    pub refunded_at: Option<DateTimeWithTimeZone>,
    /// Last modification time reported by the source.
    pub source_updated_at: Option<DateTimeWithTimeZone>,
    /// Shipping details exactly as the source delivered them.
    #[sea_orm(column_type = "Json", nullable)]
    pub ship_info: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<OrderRecord> for ActiveModel {
    fn from(record: OrderRecord) -> Self {
        Self {
            platform: Set(record.platform),
            order_id: Set(record.order_id),
            user_id: Set(record.user_id),
            app_id: Set(record.app_id),
            order_state: Set(Coded::code(record.order_state)),
            order_state_label: Set(Coded::label(record.order_state)),
            pay_state: Set(Coded::code(record.pay_state)),
            pay_state_label: Set(Coded::label(record.pay_state)),
            order_type: Set(record.order_type),
            settle_state: Set(record.settle_state),
            aftersale_state: Set(Coded::code(record.aftersale_state)),
            aftersale_state_label: Set(Coded::label(record.aftersale_state)),
            pay_type: Set(record.pay_type),
            resource_type: Set(Coded::code(record.resource_type)),
            resource_type_label: Set(Coded::label(record.resource_type)),
            trade_id: Set(record.trade_id),
            goods_buy_num: Set(record.goods_buy_num),
            goods_name_overview: Set(record.goods_name_overview),
            actual_fee: Set(record.actual_fee),
            goods_original_total_price: Set(record.goods_original_total_price),
            discount_amount: Set(record.discount_amount),
            freight_price: Set(record.freight_price),
            refund_fee: Set(record.refund_fee),
            created_at: Set(record.created_at.fixed_offset()),
            paid_at: Set(record.paid_at.map(|t| t.fixed_offset())),
            settled_at: Set(record.settled_at.map(|t| t.fixed_offset())),
            refunded_at: Set(record.refunded_at.map(|t| t.fixed_offset())),
            source_updated_at: Set(record.source_updated_at.map(|t| t.fixed_offset())),
            ship_info: Set(record.ship_info),
        }
    }
}
