use serde::Deserialize;
use serde_json::Value;

use super::convert::{
    CODE_LEN, ID_LEN, NICKNAME_LEN, WIDE_ID_LEN, bounded, clipped, int32, money, text, timestamp,
};
use super::{Transformer, decode};
use crate::error::ValidationError;
use crate::records::{CanonicalRecord, EntityKind, UserRecord};

#[derive(Debug, Deserialize)]
struct RawUser {
    user_id: Option<Value>,
    user_nickname: Option<Value>,
    nickname: Option<Value>,
    avatar: Option<Value>,
    bind_phone: Option<Value>,
    phone: Option<Value>,
    from: Option<Value>,
    wx_union_id: Option<Value>,
    wx_open_id: Option<Value>,
    pay_sum: Option<Value>,
    punch_count: Option<Value>,
    user_created_at: Option<Value>,
}

pub(super) fn transform(ctx: &Transformer, raw: &Value) -> Result<CanonicalRecord, ValidationError> {
    let user: RawUser = decode(EntityKind::User, raw)?;
    let user_id = bounded("user_id", text(user.user_id.as_ref()), ID_LEN)?
        .ok_or(ValidationError::MissingKey { field: "user_id" })?;
    let nickname = text(user.user_nickname.as_ref()).or_else(|| text(user.nickname.as_ref()));
    let phone = text(user.bind_phone.as_ref()).or_else(|| text(user.phone.as_ref()));

    Ok(CanonicalRecord::User(UserRecord {
        platform: ctx.platform.clone(),
        user_id,
        nickname: clipped("user_nickname", nickname, NICKNAME_LEN),
        avatar_url: text(user.avatar.as_ref()),
        phone: bounded("phone", phone, CODE_LEN)?,
        source: clipped("from", text(user.from.as_ref()), ID_LEN),
        wx_union_id: bounded("wx_union_id", text(user.wx_union_id.as_ref()), WIDE_ID_LEN)?,
        wx_open_id: bounded("wx_open_id", text(user.wx_open_id.as_ref()), WIDE_ID_LEN)?,
        total_paid_amount: money("pay_sum", user.pay_sum.as_ref())?,
        purchase_count: int32("punch_count", user.punch_count.as_ref())?,
        registered_at: timestamp("user_created_at", user.user_created_at.as_ref(), ctx.offset)?,
    }))
}
