//! Static lookup tables for the source's enumerated codes.

use tracing::warn;

use crate::records::Coded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTable {
    OrderState,
    PayState,
    AftersaleState,
    ResourceType,
    ShipState,
    SaleStatus,
    SaleType,
}

impl CodeTable {
    pub const fn as_str(self) -> &'static str {
        match self {
            CodeTable::OrderState => "order_state",
            CodeTable::PayState => "pay_state",
            CodeTable::AftersaleState => "aftersale_state",
            CodeTable::ResourceType => "resource_type",
            CodeTable::ShipState => "ship_state",
            CodeTable::SaleStatus => "sale_status",
            CodeTable::SaleType => "sale_type",
        }
    }

    pub const fn label(self, code: i32) -> Option<&'static str> {
        match self {
            CodeTable::OrderState => order_state(code),
            CodeTable::PayState => match code {
                0 => Some("unpaid"),
                1 => Some("paid"),
                _ => None,
            },
            CodeTable::AftersaleState => aftersale_state(code),
            CodeTable::ResourceType => resource_type(code),
            CodeTable::ShipState => match code {
                0 => Some("no_shipping_needed"),
                1 => Some("not_shipped"),
                2 => Some("shipped"),
                3 => Some("received"),
                4 => Some("partially_shipped"),
                _ => None,
            },
            CodeTable::SaleStatus => match code {
                0 => Some("off_shelf"),
                1 => Some("on_sale"),
                2 => Some("scheduled"),
                _ => None,
            },
            CodeTable::SaleType => match code {
                1 => Some("refund_only"),
                2 => Some("return_and_refund"),
                _ => None,
            },
        }
    }

    /// Attach a label to `code`. Unknown codes are kept with no label.
    pub fn lookup(self, code: Option<i32>) -> Option<Coded> {
        let code = code?;
        let label = self.label(code);
        if label.is_none() {
            warn!(table = self.as_str(), code, "unrecognized code kept without label");
        }
        Some(Coded { code, label })
    }
}

const fn order_state(code: i32) -> Option<&'static str> {
    Some(match code {
        0 => "unpaid",
        1 => "paid",
        2 => "payment_failed",
        3 => "refunded",
        4 => "prepaid",
        5 => "payment_processing",
        6 => "expired_cancelled",
        7 => "user_cancelled",
        8 => "refund_in_progress",
        9 => "refund_failed",
        10 => "refund_succeeded",
        11 => "partially_refunded",
        _ => return None,
    })
}

const fn aftersale_state(code: i32) -> Option<&'static str> {
    Some(match code {
        0 => "none",
        1 => "processing",
        2 => "processed",
        3 => "rejected",
        4 => "closed",
        5 => "awaiting_payout",
        6 => "awaiting_buyer_shipment",
        7 => "awaiting_seller_receipt",
        8 => "refund_closed",
        _ => return None,
    })
}

const fn resource_type(code: i32) -> Option<&'static str> {
    Some(match code {
        0 => "none",
        1 => "article",
        2 => "audio",
        3 => "video",
        4 => "live",
        5 => "membership",
        6 => "column",
        7 => "community",
        8 => "big_column",
        9 => "event_ticket",
        11 => "paid_event_ticket",
        16 => "paid_checkin",
        20 => "ebook",
        21 => "physical_goods",
        22 => "content_marketing",
        23 => "super_membership",
        25 => "training_camp",
        29 => "offline_course",
        31 => "class_course",
        34 => "exercise",
        35 => "class_course_alt",
        41 => "coupon",
        42 => "lesson_pack",
        45 => "ai_course",
        21001 => "cart",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_carry_labels() {
        let coded = CodeTable::OrderState.lookup(Some(11)).unwrap();
        assert_eq!(coded.label, Some("partially_refunded"));
        assert_eq!(CodeTable::ResourceType.label(21001), Some("cart"));
    }

    #[test]
    fn unknown_code_is_preserved_verbatim() {
        let coded = CodeTable::ShipState.lookup(Some(99)).unwrap();
        assert_eq!(coded, Coded { code: 99, label: None });
    }

    #[test]
    fn absent_code_stays_absent() {
        assert_eq!(CodeTable::PayState.lookup(None), None);
    }
}
