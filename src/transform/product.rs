use serde::Deserialize;
use serde_json::Value;

use super::codes::CodeTable;
use super::convert::{
    CODE_LEN, ID_LEN, NAME_LEN, bounded, clipped, flag, int32, money, text, timestamp,
};
use super::{Transformer, decode};
use crate::error::ValidationError;
use crate::records::{CanonicalRecord, EntityKind, ProductRecord};

#[derive(Debug, Deserialize)]
struct RawGoods {
    resource_id: Option<Value>,
    spu_id: Option<Value>,
    goods_name: Option<Value>,
    resource_type: Option<Value>,
    spu_type: Option<Value>,
    sale_status: Option<Value>,
    price_low: Option<Value>,
    price_high: Option<Value>,
    img_url_compressed: Option<Value>,
    img_url: Option<Value>,
    is_deleted: Option<Value>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
}

pub(super) fn transform(ctx: &Transformer, raw: &Value) -> Result<CanonicalRecord, ValidationError> {
    let goods: RawGoods = decode(EntityKind::Product, raw)?;
    let product_id = bounded("resource_id", text(goods.resource_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingKey { field: "resource_id" })?;

    Ok(CanonicalRecord::Product(ProductRecord {
        platform: ctx.platform.clone(),
        product_id,
        spu_id: bounded("spu_id", text(goods.spu_id.as_ref()), ID_LEN)?,
        name: clipped("goods_name", text(goods.goods_name.as_ref()), NAME_LEN),
        resource_type: CodeTable::ResourceType
            .lookup(int32("resource_type", goods.resource_type.as_ref())?),
        spu_type: bounded("spu_type", text(goods.spu_type.as_ref()), CODE_LEN)?,
        sale_status: CodeTable::SaleStatus.lookup(int32("sale_status", goods.sale_status.as_ref())?),
        price_low: money("price_low", goods.price_low.as_ref())?,
        price_high: money("price_high", goods.price_high.as_ref())?,
        image_url: text(goods.img_url_compressed.as_ref()).or_else(|| text(goods.img_url.as_ref())),
        is_deleted: flag("is_deleted", goods.is_deleted.as_ref())?,
        source_created_at: timestamp("created_at", goods.created_at.as_ref(), ctx.offset)?,
        source_updated_at: timestamp("updated_at", goods.updated_at.as_ref(), ctx.offset)?,
    }))
}
