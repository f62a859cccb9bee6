//! Product entity model for the `products` table.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use crate::records::{Coded, ProductRecord};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: String,
    pub spu_id: Option<String>,
    pub name: Option<String>,
    pub resource_type: Option<i32>,
    pub resource_type_label: Option<String>,
    pub spu_type: Option<String>,
    pub sale_status: Option<i32>,
    pub sale_status_label: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub price_low: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub price_high: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub image_url: Option<String>,
    pub is_deleted: bool,
    pub source_created_at: Option<DateTimeWithTimeZone>,
    pub source_updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<ProductRecord> for ActiveModel {
    fn from(record: ProductRecord) -> Self {
        Self {
            platform: Set(record.platform),
            product_id: Set(record.product_id),
            spu_id: Set(record.spu_id),
            name: Set(record.name),
            resource_type: Set(Coded::code(record.resource_type)),
            resource_type_label: Set(Coded::label(record.resource_type)),
            spu_type: Set(record.spu_type),
            sale_status: Set(Coded::code(record.sale_status)),
            sale_status_label: Set(Coded::label(record.sale_status)),
            price_low: Set(record.price_low),
            price_high: Set(record.price_high),
            image_url: Set(record.image_url),
            is_deleted: Set(record.is_deleted),
            source_created_at: Set(record.source_created_at.map(|t| t.fixed_offset())),
            source_updated_at: Set(record.source_updated_at.map(|t| t.fixed_offset())),
        }
    }
}
