//! After-sale line item entity model.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::prelude::Decimal;

use crate::records::AftersaleItemRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "aftersale_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub platform: String,
    pub aftersale_id: String,
    pub line_no: i32,
    pub goods_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sku_info: Option<String>,
    pub quantity: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub goods_price: Option<Decimal>,
    pub goods_tag: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::aftersale_order::Entity",
        from = "(Column::Platform, Column::AftersaleId)",
        to = "(super::aftersale_order::Column::Platform, super::aftersale_order::Column::AftersaleId)",
        on_delete = "Cascade"
    )]
    AftersaleOrder,
}

impl Related<super::aftersale_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AftersaleOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<AftersaleItemRecord> for ActiveModel {
    fn from(record: AftersaleItemRecord) -> Self {
        Self {
            id: NotSet,
            platform: Set(record.platform),
            aftersale_id: Set(record.aftersale_id),
            line_no: Set(record.line_no),
            goods_name: Set(record.goods_name),
            sku_info: Set(record.sku_info),
            quantity: Set(record.quantity),
            goods_price: Set(record.goods_price),
            goods_tag: Set(record.goods_tag),
            image_url: Set(record.image_url),
        }
    }
}
