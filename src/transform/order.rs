use serde::Deserialize;
use serde_json::Value;

use super::codes::CodeTable;
use super::convert::{
    ID_LEN, NAME_LEN, WIDE_ID_LEN, bounded, clipped, int32, money, text, timestamp,
};
use super::{Transformer, children, decode};
use crate::error::ValidationError;
use crate::records::{CanonicalRecord, EntityKind, OrderItemRecord, OrderRecord};

#[derive(Debug, Deserialize)]
struct RawOrder {
    order_info: Option<RawOrderInfo>,
    #[serde(default)]
    price_info: RawPriceInfo,
    ship_info: Option<Value>,
    /// List payloads carry lines here.
    good_list: Option<Vec<Value>>,
    /// Detail payloads nest them one level deeper.
    goods_info: Option<RawGoodsInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOrderInfo {
    order_id: Option<Value>,
    user_id: Option<Value>,
    app_id: Option<Value>,
    order_state: Option<Value>,
    pay_state: Option<Value>,
    order_type: Option<Value>,
    settle_state: Option<Value>,
    aftersale_show_state: Option<Value>,
    pay_type: Option<Value>,
    resource_type: Option<Value>,
    trade_id: Option<Value>,
    goods_buy_num: Option<Value>,
    goods_name: Option<Value>,
    actual_fee: Option<Value>,
    goods_original_total_price: Option<Value>,
    discount_amount: Option<Value>,
    refund_fee: Option<Value>,
    created_time: Option<Value>,
    pay_state_time: Option<Value>,
    settle_state_time: Option<Value>,
    refund_time: Option<Value>,
    update_time: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPriceInfo {
    actual_price: Option<Value>,
    freight_price: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGoodsInfo {
    #[serde(default)]
    goods_list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawOrderLine {
    resource_id: Option<Value>,
    spu_id: Option<Value>,
    sku_id: Option<Value>,
    goods_name: Option<Value>,
    goods_spec_desc: Option<Value>,
    resource_type: Option<Value>,
    buy_num: Option<Value>,
    unit_price: Option<Value>,
    total_price: Option<Value>,
    refund_state: Option<Value>,
    ship_state: Option<Value>,
}

pub(super) fn transform(ctx: &Transformer, raw: &Value) -> Result<CanonicalRecord, ValidationError> {
    let order: RawOrder = decode(EntityKind::Order, raw)?;
    let info = order
        .order_info
        .ok_or(ValidationError::MissingKey { field: "order_id" })?;
    let offset = ctx.offset;

    let order_id = bounded("order_id", text(info.order_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingKey { field: "order_id" })?;
    let user_id = bounded("user_id", text(info.user_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingField { field: "user_id" })?;
    let created_at = timestamp("created_time", info.created_time.as_ref(), offset)?
        .ok_or(ValidationError::MissingField {
            field: "created_time",
        })?;

    let actual_fee = match money("actual_fee", info.actual_fee.as_ref())? {
        Some(fee) => Some(fee),
        None => money("actual_price", order.price_info.actual_price.as_ref())?,
    };

    let lines = order
        .good_list
        .or(order.goods_info.map(|goods| goods.goods_list))
        .unwrap_or_default();
    let items = children(&lines, |line_no, raw_line| {
        transform_line(ctx, &order_id, line_no, raw_line)
    })?;

    let record = OrderRecord {
        platform: ctx.platform.clone(),
        order_id,
        user_id,
        app_id: bounded("app_id", text(info.app_id.as_ref()), ID_LEN)?,
        order_state: CodeTable::OrderState.lookup(int32("order_state", info.order_state.as_ref())?),
        pay_state: CodeTable::PayState.lookup(int32("pay_state", info.pay_state.as_ref())?),
        order_type: int32("order_type", info.order_type.as_ref())?,
        settle_state: int32("settle_state", info.settle_state.as_ref())?,
        aftersale_state: CodeTable::AftersaleState.lookup(int32(
            "aftersale_show_state",
            info.aftersale_show_state.as_ref(),
        )?),
        pay_type: int32("pay_type", info.pay_type.as_ref())?,
        resource_type: CodeTable::ResourceType
            .lookup(int32("resource_type", info.resource_type.as_ref())?),
        trade_id: bounded("trade_id", text(info.trade_id.as_ref()), WIDE_ID_LEN)?,
        goods_buy_num: int32("goods_buy_num", info.goods_buy_num.as_ref())?,
        goods_name_overview: text(info.goods_name.as_ref()),
        actual_fee,
        goods_original_total_price: money(
            "goods_original_total_price",
            info.goods_original_total_price.as_ref(),
        )?,
        discount_amount: money("discount_amount", info.discount_amount.as_ref())?,
        freight_price: money("freight_price", order.price_info.freight_price.as_ref())?,
        refund_fee: money("refund_fee", info.refund_fee.as_ref())?,
        created_at,
        paid_at: timestamp("pay_state_time", info.pay_state_time.as_ref(), offset)?,
        settled_at: timestamp("settle_state_time", info.settle_state_time.as_ref(), offset)?,
        refunded_at: timestamp("refund_time", info.refund_time.as_ref(), offset)?,
        source_updated_at: timestamp("update_time", info.update_time.as_ref(), offset)?,
        ship_info: order
            .ship_info
            .filter(|ship| ship.as_object().is_some_and(|fields| !fields.is_empty())),
    };

    Ok(CanonicalRecord::Order {
        order: record,
        items,
    })
}

fn transform_line(
    ctx: &Transformer,
    order_id: &str,
    line_no: i32,
    raw: &Value,
) -> Result<OrderItemRecord, ValidationError> {
    let line: RawOrderLine = decode(EntityKind::Order, raw)?;
    let product_id = text(line.resource_id.as_ref()).or_else(|| text(line.spu_id.as_ref()));
    let product_id = bounded("resource_id", product_id, ID_LEN)?.ok_or(ValidationError::MissingField {
        field: "resource_id",
    })?;

    Ok(OrderItemRecord {
        platform: ctx.platform.clone(),
        order_id: order_id.to_string(),
        line_no,
        product_id,
        sku_id: bounded("sku_id", text(line.sku_id.as_ref()), ID_LEN)?,
        goods_name: clipped("goods_name", text(line.goods_name.as_ref()), NAME_LEN),
        goods_spec_desc: text(line.goods_spec_desc.as_ref()),
        resource_type: CodeTable::ResourceType
            .lookup(int32("resource_type", line.resource_type.as_ref())?),
        quantity: int32("buy_num", line.buy_num.as_ref())?,
        unit_price: money("unit_price", line.unit_price.as_ref())?,
        total_price: money("total_price", line.total_price.as_ref())?,
        refund_state: int32("refund_state", line.refund_state.as_ref())?,
        ship_state: CodeTable::ShipState.lookup(int32("ship_state", line.ship_state.as_ref())?),
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::transformer;
    use super::super::Transformed;
    use super::super::convert::minor_units_to_decimal;
    use super::*;
    use serde_json::json;

    fn raw_order() -> Value {
        json!({
            "order_info": {
                "order_id": "o_1001",
                "user_id": "u_1",
                "app_id": "app_x",
                "order_state": 1,
                "pay_state": "1",
                "aftersale_show_state": 0,
                "actual_fee": 12345,
                "discount_amount": "500",
                "created_time": "2024-01-10 10:00:00",
                "pay_state_time": "2024-01-10 10:01:00",
                "settle_state_time": "0000-00-00 00:00:00",
                "update_time": "2024-01-10 12:00:00"
            },
            "price_info": {"freight_price": 0},
            "ship_info": {"receiver": "Li", "city": "Hangzhou"},
            "good_list": [
                {"resource_id": "p_1", "goods_name": "Course", "buy_num": 1, "unit_price": 12345, "ship_state": 0},
                {"spu_id": "spu_2", "buy_num": "2", "unit_price": "100", "ship_state": 77}
            ]
        })
    }

    #[test]
    fn maps_order_with_lines() {
        let record = transformer()
            .transform(EntityKind::Order, &raw_order())
            .accepted()
            .expect("order accepted");
        let CanonicalRecord::Order { order, items } = record else {
            panic!("expected order");
        };

        assert_eq!(order.order_id, "o_1001");
        assert_eq!(order.actual_fee, Some(minor_units_to_decimal(12345)));
        assert_eq!(order.discount_amount.map(|d| d.to_string()).as_deref(), Some("5.00"));
        assert_eq!(order.created_at.to_rfc3339(), "2024-01-10T02:00:00+00:00");
        assert_eq!(order.settled_at, None);
        assert_eq!(order.order_state.and_then(|s| s.label), Some("paid"));
        assert!(order.ship_info.is_some());

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].line_no, 1);
        assert_eq!(items[1].product_id, "spu_2");
        assert_eq!(items[1].quantity, Some(2));
        assert_eq!(items[1].ship_state.map(|s| (s.code, s.label)), Some((77, None)));
    }

    #[test]
    fn detail_payload_lines_are_read_from_goods_info() {
        let mut raw = raw_order();
        let lines = raw["good_list"].take();
        raw["goods_info"] = json!({ "goods_list": lines });
        raw.as_object_mut().unwrap().remove("good_list");

        let record = transformer().transform(EntityKind::Order, &raw).accepted().unwrap();
        let CanonicalRecord::Order { items, .. } = record else {
            panic!("expected order");
        };
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn missing_order_id_is_rejected() {
        let mut raw = raw_order();
        raw["order_info"]["order_id"] = json!("");
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Order, &raw) else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.reason, ValidationError::MissingKey { field: "order_id" });
    }

    #[test]
    fn sentinel_creation_time_is_rejected() {
        let mut raw = raw_order();
        raw["order_info"]["created_time"] = json!("0000-00-00 00:00:00");
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Order, &raw) else {
            panic!("expected rejection");
        };
        assert_eq!(
            rejection.reason,
            ValidationError::MissingField {
                field: "created_time"
            }
        );
    }

    #[test]
    fn invalid_line_rejects_whole_order() {
        let mut raw = raw_order();
        raw["good_list"][1]["unit_price"] = json!("12.5");
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Order, &raw) else {
            panic!("expected rejection");
        };
        assert_eq!(rejection.record_id.as_deref(), Some("o_1001"));
        assert!(matches!(
            rejection.reason,
            ValidationError::InvalidChild { line: 2, .. }
        ));
    }

    #[test]
    fn amount_wider_than_money_column_is_rejected() {
        let mut raw = raw_order();
        raw["order_info"]["actual_fee"] = json!(100_000_000_000_000_i64);
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Order, &raw) else {
            panic!("expected rejection");
        };
        assert!(matches!(
            rejection.reason,
            ValidationError::InvalidAmount {
                field: "actual_fee",
                ..
            }
        ));
    }

    #[test]
    fn over_long_order_id_is_rejected() {
        let mut raw = raw_order();
        raw["order_info"]["order_id"] = json!("o".repeat(65));
        let Transformed::Rejected(rejection) = transformer().transform(EntityKind::Order, &raw) else {
            panic!("expected rejection");
        };
        assert!(matches!(
            rejection.reason,
            ValidationError::TooLong {
                field: "order_id",
                max: 64,
                len: 65
            }
        ));
    }

    #[test]
    fn over_long_line_name_is_clipped_to_column() {
        let mut raw = raw_order();
        raw["good_list"][0]["goods_name"] = json!("n".repeat(600));
        let record = transformer().transform(EntityKind::Order, &raw).accepted().unwrap();
        let CanonicalRecord::Order { items, .. } = record else {
            panic!("expected order");
        };
        assert_eq!(items[0].goods_name.as_deref().map(str::len), Some(512));
    }
}
