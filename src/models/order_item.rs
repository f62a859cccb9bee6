//! Order line item entity model.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::prelude::Decimal;

use crate::records::{Coded, OrderItemRecord};

/// A line of an order. Rows for one order are only ever replaced as a set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Surrogate key; carries no meaning across replacements
    #[sea_orm(primary_key)]
    pub id: i32,
    pub platform: String,
    pub order_id: String,
    /// Position of the line within the order as delivered by the source
    pub line_no: i32,
    pub product_id: String,
    pub sku_id: Option<String>,
    pub goods_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub goods_spec_desc: Option<String>,
    pub resource_type: Option<i32>,
    pub resource_type_label: Option<String>,
    pub quantity: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub unit_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub total_price: Option<Decimal>,
    pub refund_state: Option<i32>,
    pub ship_state: Option<i32>,
    pub ship_state_label: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "(Column::Platform, Column::OrderId)",
        to = "(super::order::Column::Platform, super::order::Column::OrderId)",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<OrderItemRecord> for ActiveModel {
    fn from(record: OrderItemRecord) -> Self {
        Self {
            id: NotSet,
            platform: Set(record.platform),
            order_id: Set(record.order_id),
            line_no: Set(record.line_no),
            product_id: Set(record.product_id),
            sku_id: Set(record.sku_id),
            goods_name: Set(record.goods_name),
            goods_spec_desc: Set(record.goods_spec_desc),
            resource_type: Set(Coded::code(record.resource_type)),
            resource_type_label: Set(Coded::label(record.resource_type)),
            quantity: Set(record.quantity),
            unit_price: Set(record.unit_price),
            total_price: Set(record.total_price),
            refund_state: Set(record.refund_state),
            ship_state: Set(Coded::code(record.ship_state)),
            ship_state_label: Set(Coded::label(record.ship_state)),
        }
    }
}
