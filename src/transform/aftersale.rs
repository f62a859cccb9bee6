use serde::Deserialize;
use serde_json::Value;

use super::codes::CodeTable;
use super::convert::{
    ID_LEN, NAME_LEN, WIDE_ID_LEN, bounded, clipped, int32, money, text, text_or_json, timestamp,
};
use super::{Transformer, children, decode};
use crate::error::ValidationError;
use crate::records::{AftersaleItemRecord, AftersaleRecord, CanonicalRecord, EntityKind};

#[derive(Debug, Deserialize)]
struct RawAftersale {
    aftersale_id: Option<Value>,
    order_id: Option<Value>,
    user_id: Option<Value>,
    state: Option<Value>,
    state_str: Option<Value>,
    sale_type: Option<Value>,
    apply_refund_money: Option<Value>,
    refund_money: Option<Value>,
    reason: Option<Value>,
    remark: Option<Value>,
    merchant_remark: Option<Value>,
    goods_name: Option<Value>,
    created_at: Option<Value>,
    updated_at: Option<Value>,
    invalid_time: Option<Value>,
    #[serde(default)]
    goods_list: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawAftersaleLine {
    goods_name: Option<Value>,
    sku_info: Option<Value>,
    buy_num: Option<Value>,
    goods_price: Option<Value>,
    goods_tag: Option<Value>,
    img_url: Option<Value>,
}

pub(super) fn transform(ctx: &Transformer, raw: &Value) -> Result<CanonicalRecord, ValidationError> {
    let aftersale: RawAftersale = decode(EntityKind::Aftersale, raw)?;
    let offset = ctx.offset;

    let aftersale_id = bounded("aftersale_id", text(aftersale.aftersale_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingKey {
            field: "aftersale_id",
        })?;
    let order_id = bounded("order_id", text(aftersale.order_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingField { field: "order_id" })?;

    let items = children(aftersale.goods_list.as_deref().unwrap_or_default(), |line_no, line| {
        transform_line(ctx, &aftersale_id, line_no, line)
    })?;

    let record = AftersaleRecord {
        platform: ctx.platform.clone(),
        aftersale_id,
        order_id,
        user_id: bounded("user_id", text(aftersale.user_id.as_ref()), ID_LEN)?,
        state: CodeTable::AftersaleState.lookup(int32("state", aftersale.state.as_ref())?),
        state_text: clipped("state_str", text(aftersale.state_str.as_ref()), WIDE_ID_LEN),
        sale_type: CodeTable::SaleType.lookup(int32("sale_type", aftersale.sale_type.as_ref())?),
        apply_refund_money: money("apply_refund_money", aftersale.apply_refund_money.as_ref())?,
        refund_money: money("refund_money", aftersale.refund_money.as_ref())?,
        reason: text(aftersale.reason.as_ref()),
        remark: text(aftersale.remark.as_ref()),
        merchant_remark: text(aftersale.merchant_remark.as_ref()),
        goods_name_overview: text(aftersale.goods_name.as_ref()),
        source_created_at: timestamp("created_at", aftersale.created_at.as_ref(), offset)?,
        source_updated_at: timestamp("updated_at", aftersale.updated_at.as_ref(), offset)?,
        invalid_at: timestamp("invalid_time", aftersale.invalid_time.as_ref(), offset)?,
    };

    Ok(CanonicalRecord::Aftersale {
        aftersale: record,
        items,
    })
}

fn transform_line(
    ctx: &Transformer,
    aftersale_id: &str,
    line_no: i32,
    raw: &Value,
) -> Result<AftersaleItemRecord, ValidationError> {
    let line: RawAftersaleLine = decode(EntityKind::Aftersale, raw)?;
    Ok(AftersaleItemRecord {
        platform: ctx.platform.clone(),
        aftersale_id: aftersale_id.to_string(),
        line_no,
        goods_name: clipped("goods_name", text(line.goods_name.as_ref()), NAME_LEN),
        sku_info: text_or_json(line.sku_info.as_ref()),
        quantity: int32("buy_num", line.buy_num.as_ref())?,
        goods_price: money("goods_price", line.goods_price.as_ref())?,
        goods_tag: clipped("goods_tag", text(line.goods_tag.as_ref()), WIDE_ID_LEN),
        image_url: text(line.img_url.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::super::Transformed;
    use super::super::tests::transformer;
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_aftersale_with_goods() {
        let raw = json!({
            "aftersale_id": "as_9",
            "order_id": "o_1001",
            "user_id": "u_1",
            "state": 1,
            "state_str": "processing",
            "sale_type": 1,
            "apply_refund_money": 12345,
            "refund_money": 0,
            "created_at": "2024-01-10 09:00:00",
            "invalid_time": "1970-01-01 08:00:00",
            "goods_list": [
                {"goods_name": "Course", "sku_info": {"color": "red"}, "buy_num": 1, "goods_price": 12345}
            ]
        });

        let record = transformer().transform(EntityKind::Aftersale, &raw).accepted().unwrap();
        let CanonicalRecord::Aftersale { aftersale, items } = record else {
            panic!("expected aftersale");
        };
        assert_eq!(aftersale.order_id, "o_1001");
        assert_eq!(aftersale.state.and_then(|s| s.label), Some("processing"));
        assert_eq!(aftersale.sale_type.and_then(|s| s.label), Some("refund_only"));
        assert_eq!(aftersale.invalid_at, None);
        assert_eq!(
            aftersale.apply_refund_money.map(|m| m.to_string()).as_deref(),
            Some("123.45")
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku_info.as_deref(), Some("{\"color\":\"red\"}"));
    }

    #[test]
    fn aftersale_without_order_is_rejected() {
        let raw = json!({"aftersale_id": "as_9"});
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Aftersale, &raw) else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.reason, ValidationError::MissingField { field: "order_id" });
        assert_eq!(rejection.record_id.as_deref(), Some("as_9"));
    }
}
