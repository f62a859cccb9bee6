//! After-sale order entity model.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use crate::records::{AftersaleRecord, Coded};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "aftersale_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub aftersale_id: String,
    /// Order the request was raised against. Not a foreign key: the order
    /// may fall outside every synchronized window.
    pub order_id: String,
    pub user_id: Option<String>,
    pub state: Option<i32>,
    pub state_label: Option<String>,
    /// Free-text state description supplied by the source
    pub state_text: Option<String>,
    pub sale_type: Option<i32>,
    pub sale_type_label: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub apply_refund_money: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub refund_money: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub remark: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub merchant_remark: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub goods_name_overview: Option<String>,
    pub source_created_at: Option<DateTimeWithTimeZone>,
    pub source_updated_at: Option<DateTimeWithTimeZone>,
    pub invalid_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::aftersale_item::Entity")]
    AftersaleItem,
}

impl Related<super::aftersale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AftersaleItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<AftersaleRecord> for ActiveModel {
    fn from(record: AftersaleRecord) -> Self {
        Self {
            platform: Set(record.platform),
            aftersale_id: Set(record.aftersale_id),
            order_id: Set(record.order_id),
            user_id: Set(record.user_id),
            state: Set(Coded::code(record.state)),
            state_label: Set(Coded::label(record.state)),
            state_text: Set(record.state_text),
            sale_type: Set(Coded::code(record.sale_type)),
            sale_type_label: Set(Coded::label(record.sale_type)),
            apply_refund_money: Set(record.apply_refund_money),
            refund_money: Set(record.refund_money),
            reason: Set(record.reason),
            remark: Set(record.remark),
            merchant_remark: Set(record.merchant_remark),
            goods_name_overview: Set(record.goods_name_overview),
            source_created_at: Set(record.source_created_at.map(|t| t.fixed_offset())),
            source_updated_at: Set(record.source_updated_at.map(|t| t.fixed_offset())),
            invalid_at: Set(record.invalid_at.map(|t| t.fixed_offset())),
        }
    }
}
