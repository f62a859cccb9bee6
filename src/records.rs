//! Canonical record types.
//!
//! The transformer produces these from raw source payloads and the loader
//! writes them. Every field is explicitly typed; anything the source may omit
//! is an `Option`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// The source entity types the engine replicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Order,
    Aftersale,
    User,
    Product,
}

impl EntityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::Aftersale => "aftersale",
            EntityKind::User => "user",
            EntityKind::Product => "product",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status or type code together with its label when the code is known.
///
/// Unknown codes keep `label == None`; the code itself is never replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coded {
    pub code: i32,
    pub label: Option<&'static str>,
}

impl Coded {
    pub fn code(value: Option<Coded>) -> Option<i32> {
        value.map(|c| c.code)
    }

    pub fn label(value: Option<Coded>) -> Option<String> {
        value.and_then(|c| c.label).map(str::to_string)
    }
}

/// Natural key of a parent record: `(platform, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParentKey {
    pub platform: String,
    pub id: String,
}

impl ParentKey {
    pub fn new(platform: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ParentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.platform, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub platform: String,
    pub order_id: String,
    pub user_id: String,
    pub app_id: Option<String>,
    pub order_state: Option<Coded>,
    pub pay_state: Option<Coded>,
    pub order_type: Option<i32>,
    pub settle_state: Option<i32>,
    pub aftersale_state: Option<Coded>,
    pub pay_type: Option<i32>,
    pub resource_type: Option<Coded>,
    pub trade_id: Option<String>,
    pub goods_buy_num: Option<i32>,
    pub goods_name_overview: Option<String>,
    pub actual_fee: Option<Decimal>,
    pub goods_original_total_price: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub freight_price: Option<Decimal>,
    pub refund_fee: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub ship_info: Option<Value>,
}

impl OrderRecord {
    pub fn key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemRecord {
    pub platform: String,
    pub order_id: String,
    pub line_no: i32,
    pub product_id: String,
    pub sku_id: Option<String>,
    pub goods_name: Option<String>,
    pub goods_spec_desc: Option<String>,
    pub resource_type: Option<Coded>,
    pub quantity: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub refund_state: Option<i32>,
    pub ship_state: Option<Coded>,
}

impl OrderItemRecord {
    pub fn parent_key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.order_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AftersaleRecord {
    pub platform: String,
    pub aftersale_id: String,
    pub order_id: String,
    pub user_id: Option<String>,
    pub state: Option<Coded>,
    pub state_text: Option<String>,
    pub sale_type: Option<Coded>,
    pub apply_refund_money: Option<Decimal>,
    pub refund_money: Option<Decimal>,
    pub reason: Option<String>,
    pub remark: Option<String>,
    pub merchant_remark: Option<String>,
    pub goods_name_overview: Option<String>,
    pub source_created_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
}

impl AftersaleRecord {
    pub fn key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.aftersale_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AftersaleItemRecord {
    pub platform: String,
    pub aftersale_id: String,
    pub line_no: i32,
    pub goods_name: Option<String>,
    pub sku_info: Option<String>,
    pub quantity: Option<i32>,
    pub goods_price: Option<Decimal>,
    pub goods_tag: Option<String>,
    pub image_url: Option<String>,
}

impl AftersaleItemRecord {
    pub fn parent_key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.aftersale_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub platform: String,
    pub user_id: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub wx_union_id: Option<String>,
    pub wx_open_id: Option<String>,
    pub total_paid_amount: Option<Decimal>,
    pub purchase_count: Option<i32>,
    pub registered_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub platform: String,
    pub product_id: String,
    pub spu_id: Option<String>,
    pub name: Option<String>,
    pub resource_type: Option<Coded>,
    pub spu_type: Option<String>,
    pub sale_status: Option<Coded>,
    pub price_low: Option<Decimal>,
    pub price_high: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_deleted: bool,
    pub source_created_at: Option<DateTime<Utc>>,
    pub source_updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn key(&self) -> ParentKey {
        ParentKey::new(&self.platform, &self.product_id)
    }
}

/// One accepted source record, with its complete child snapshot where the
/// entity has children.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum CanonicalRecord {
    Order {
        order: OrderRecord,
        items: Vec<OrderItemRecord>,
    },
    Aftersale {
        aftersale: AftersaleRecord,
        items: Vec<AftersaleItemRecord>,
    },
    User(UserRecord),
    Product(ProductRecord),
}

impl CanonicalRecord {
    pub fn kind(&self) -> EntityKind {
        match self {
            CanonicalRecord::Order { .. } => EntityKind::Order,
            CanonicalRecord::Aftersale { .. } => EntityKind::Aftersale,
            CanonicalRecord::User(_) => EntityKind::User,
            CanonicalRecord::Product(_) => EntityKind::Product,
        }
    }

    pub fn key(&self) -> ParentKey {
        match self {
            CanonicalRecord::Order { order, .. } => order.key(),
            CanonicalRecord::Aftersale { aftersale, .. } => aftersale.key(),
            CanonicalRecord::User(user) => user.key(),
            CanonicalRecord::Product(product) => product.key(),
        }
    }
}
