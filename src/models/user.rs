//! User entity model for the `users` table.

use sea_orm::ActiveModelBehavior;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::{DateTimeWithTimeZone, Decimal};

use crate::records::UserRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub nickname: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    /// Channel the user registered through
    pub source: Option<String>,
    pub wx_union_id: Option<String>,
    pub wx_open_id: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))", nullable)]
    pub total_paid_amount: Option<Decimal>,
    pub purchase_count: Option<i32>,
    pub registered_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<UserRecord> for ActiveModel {
    fn from(record: UserRecord) -> Self {
        Self {
            platform: Set(record.platform),
            user_id: Set(record.user_id),
            nickname: Set(record.nickname),
            avatar_url: Set(record.avatar_url),
            phone: Set(record.phone),
            source: Set(record.source),
            wx_union_id: Set(record.wx_union_id),
            wx_open_id: Set(record.wx_open_id),
            total_paid_amount: Set(record.total_paid_amount),
            purchase_count: Set(record.purchase_count),
            registered_at: Set(record.registered_at.map(|t| t.fixed_offset())),
        }
    }
}
