//! Idempotent writes of canonical records.
//!
//! Parents are upserted on their natural key: on conflict every non-key
//! column is overwritten and key columns never change. Children are written
//! by deleting every existing row of the parent and inserting the new set, so
//! stale lines never survive a re-fetch.
//!
//! The loader runs on whatever connection it is given. The orchestrator hands
//! it a page transaction so a page lands completely or not at all.

use std::collections::HashSet;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IdenStatic, IntoActiveModel, Iterable,
    QueryFilter,
};
use tracing::debug;

use crate::error::PersistenceError;
use crate::models::{aftersale_item, aftersale_order, order, order_item, product, user};
use crate::records::{
    AftersaleItemRecord, AftersaleRecord, CanonicalRecord, OrderItemRecord, OrderRecord, ParentKey,
    ProductRecord, UserRecord,
};

/// Rows per insert statement, kept well under backend bind-parameter limits.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub attempted: u64,
    pub succeeded: u64,
}

impl std::ops::AddAssign for UpsertCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.attempted += rhs.attempted;
        self.succeeded += rhs.succeeded;
    }
}

/// Parent records of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentBatch {
    Orders(Vec<OrderRecord>),
    Aftersales(Vec<AftersaleRecord>),
    Users(Vec<UserRecord>),
    Products(Vec<ProductRecord>),
}

impl ParentBatch {
    pub fn len(&self) -> usize {
        match self {
            ParentBatch::Orders(rows) => rows.len(),
            ParentBatch::Aftersales(rows) => rows.len(),
            ParentBatch::Users(rows) => rows.len(),
            ParentBatch::Products(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The complete child snapshot of one parent.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSet {
    OrderItems(Vec<OrderItemRecord>),
    AftersaleItems(Vec<AftersaleItemRecord>),
}

#[derive(Debug, Clone)]
pub struct UpsertLoader {
    chunk_size: usize,
}

impl Default for UpsertLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl UpsertLoader {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Insert-or-update every record on its natural key.
    pub async fn upsert_batch<C: ConnectionTrait>(
        &self,
        conn: &C,
        batch: ParentBatch,
    ) -> Result<UpsertCounts, PersistenceError> {
        let attempted = batch.len() as u64;
        let succeeded = match batch {
            ParentBatch::Orders(rows) => {
                self.upsert_rows::<order::Entity, _, _>(
                    conn,
                    "orders",
                    rows.into_iter().map(order::ActiveModel::from),
                    &[order::Column::Platform, order::Column::OrderId],
                )
                .await?
            }
            ParentBatch::Aftersales(rows) => {
                self.upsert_rows::<aftersale_order::Entity, _, _>(
                    conn,
                    "aftersale_orders",
                    rows.into_iter().map(aftersale_order::ActiveModel::from),
                    &[
                        aftersale_order::Column::Platform,
                        aftersale_order::Column::AftersaleId,
                    ],
                )
                .await?
            }
            ParentBatch::Users(rows) => {
                self.upsert_rows::<user::Entity, _, _>(
                    conn,
                    "users",
                    rows.into_iter().map(user::ActiveModel::from),
                    &[user::Column::Platform, user::Column::UserId],
                )
                .await?
            }
            ParentBatch::Products(rows) => {
                self.upsert_rows::<product::Entity, _, _>(
                    conn,
                    "products",
                    rows.into_iter().map(product::ActiveModel::from),
                    &[product::Column::Platform, product::Column::ProductId],
                )
                .await?
            }
        };

        Ok(UpsertCounts {
            attempted,
            succeeded,
        })
    }

    /// Replace every child row of `parent` with exactly `children`.
    ///
    /// Returns the number of rows inserted. The parent row must already be
    /// visible on `conn`.
    pub async fn replace_children<C: ConnectionTrait>(
        &self,
        conn: &C,
        parent: &ParentKey,
        children: ChildSet,
    ) -> Result<u64, PersistenceError> {
        match children {
            ChildSet::OrderItems(items) => {
                ensure_parent(parent, items.iter().map(OrderItemRecord::parent_key))?;
                let removed = order_item::Entity::delete_many()
                    .filter(order_item::Column::Platform.eq(parent.platform.as_str()))
                    .filter(order_item::Column::OrderId.eq(parent.id.as_str()))
                    .exec(conn)
                    .await
                    .map_err(|err| PersistenceError::write("order_items", err))?;
                debug!(parent = %parent, removed = removed.rows_affected, inserted = items.len(), "replacing order items");
                self.insert_rows::<order_item::Entity, _, _>(
                    conn,
                    "order_items",
                    items.into_iter().map(order_item::ActiveModel::from),
                )
                .await
            }
            ChildSet::AftersaleItems(items) => {
                ensure_parent(parent, items.iter().map(AftersaleItemRecord::parent_key))?;
                let removed = aftersale_item::Entity::delete_many()
                    .filter(aftersale_item::Column::Platform.eq(parent.platform.as_str()))
                    .filter(aftersale_item::Column::AftersaleId.eq(parent.id.as_str()))
                    .exec(conn)
                    .await
                    .map_err(|err| PersistenceError::write("aftersale_items", err))?;
                debug!(parent = %parent, removed = removed.rows_affected, inserted = items.len(), "replacing aftersale items");
                self.insert_rows::<aftersale_item::Entity, _, _>(
                    conn,
                    "aftersale_items",
                    items.into_iter().map(aftersale_item::ActiveModel::from),
                )
                .await
            }
        }
    }

    /// Write one page of accepted records: parents first, then each parent's
    /// child snapshot. Duplicate keys collapse to their last occurrence.
    pub async fn apply_records<C: ConnectionTrait>(
        &self,
        conn: &C,
        records: Vec<CanonicalRecord>,
    ) -> Result<UpsertCounts, PersistenceError> {
        let mut orders = Vec::new();
        let mut aftersales = Vec::new();
        let mut users = Vec::new();
        let mut products = Vec::new();

        for record in dedupe_last(records) {
            match record {
                CanonicalRecord::Order { order, items } => orders.push((order, items)),
                CanonicalRecord::Aftersale { aftersale, items } => aftersales.push((aftersale, items)),
                CanonicalRecord::User(user) => users.push(user),
                CanonicalRecord::Product(product) => products.push(product),
            }
        }

        let mut counts = UpsertCounts::default();

        if !orders.is_empty() {
            let (parents, children): (Vec<_>, Vec<_>) = orders.into_iter().unzip();
            let keys: Vec<ParentKey> = parents.iter().map(OrderRecord::key).collect();
            counts += self.upsert_batch(conn, ParentBatch::Orders(parents)).await?;
            for (key, items) in keys.iter().zip(children) {
                self.replace_children(conn, key, ChildSet::OrderItems(items)).await?;
            }
        }

        if !aftersales.is_empty() {
            let (parents, children): (Vec<_>, Vec<_>) = aftersales.into_iter().unzip();
            let keys: Vec<ParentKey> = parents.iter().map(AftersaleRecord::key).collect();
            counts += self.upsert_batch(conn, ParentBatch::Aftersales(parents)).await?;
            for (key, items) in keys.iter().zip(children) {
                self.replace_children(conn, key, ChildSet::AftersaleItems(items)).await?;
            }
        }

        if !users.is_empty() {
            counts += self.upsert_batch(conn, ParentBatch::Users(users)).await?;
        }
        if !products.is_empty() {
            counts += self.upsert_batch(conn, ParentBatch::Products(products)).await?;
        }

        Ok(counts)
    }

    async fn upsert_rows<E, A, I>(
        &self,
        conn: &impl ConnectionTrait,
        table: &'static str,
        rows: I,
        keys: &[E::Column],
    ) -> Result<u64, PersistenceError>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<A>,
        A: ActiveModelTrait<Entity = E>,
        I: IntoIterator<Item = A>,
    {
        let key_names: Vec<&str> = keys.iter().map(|column| column.as_str()).collect();
        let update_columns: Vec<E::Column> = E::Column::iter()
            .filter(|column| !key_names.contains(&column.as_str()))
            .collect();
        let on_conflict = OnConflict::columns(keys.iter().copied())
            .update_columns(update_columns)
            .to_owned();

        let mut written = 0;
        let mut rows = rows.into_iter();
        loop {
            let chunk: Vec<A> = rows.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let size = chunk.len() as u64;
            E::insert_many(chunk)
                .on_conflict(on_conflict.clone())
                .exec_without_returning(conn)
                .await
                .map_err(|err| PersistenceError::write(table, err))?;
            written += size;
        }
        Ok(written)
    }

    async fn insert_rows<E, A, I>(
        &self,
        conn: &impl ConnectionTrait,
        table: &'static str,
        rows: I,
    ) -> Result<u64, PersistenceError>
    where
        E: EntityTrait,
        E::Model: IntoActiveModel<A>,
        A: ActiveModelTrait<Entity = E>,
        I: IntoIterator<Item = A>,
    {
        let mut written = 0;
        let mut rows = rows.into_iter();
        loop {
            let chunk: Vec<A> = rows.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let size = chunk.len() as u64;
            E::insert_many(chunk)
                .exec_without_returning(conn)
                .await
                .map_err(|err| PersistenceError::write(table, err))?;
            written += size;
        }
        Ok(written)
    }
}

fn ensure_parent(
    parent: &ParentKey,
    mut child_keys: impl Iterator<Item = ParentKey>,
) -> Result<(), PersistenceError> {
    match child_keys.find(|key| key != parent) {
        Some(child) => Err(PersistenceError::ParentMismatch {
            parent: parent.clone(),
            child,
        }),
        None => Ok(()),
    }
}

/// Keep only the last occurrence of each natural key, in order of that
/// occurrence.
fn dedupe_last(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut seen = HashSet::new();
    let mut kept: Vec<CanonicalRecord> = records
        .into_iter()
        .rev()
        .filter(|record| seen.insert((record.kind(), record.key())))
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::UserRecord;

    fn user(id: &str, nickname: &str) -> CanonicalRecord {
        CanonicalRecord::User(UserRecord {
            platform: "xiaoe".to_string(),
            user_id: id.to_string(),
            nickname: Some(nickname.to_string()),
            avatar_url: None,
            phone: None,
            source: None,
            wx_union_id: None,
            wx_open_id: None,
            total_paid_amount: None,
            purchase_count: None,
            registered_at: None,
        })
    }

    #[test]
    fn duplicate_keys_keep_last_occurrence() {
        let kept = dedupe_last(vec![user("a", "first"), user("b", "b"), user("a", "second")]);
        assert_eq!(kept, vec![user("b", "b"), user("a", "second")]);
    }

    #[test]
    fn mismatched_child_is_refused() {
        let parent = ParentKey::new("xiaoe", "o_1");
        let err = ensure_parent(&parent, vec![ParentKey::new("xiaoe", "o_2")].into_iter()).unwrap_err();
        assert!(matches!(err, PersistenceError::ParentMismatch { .. }));
        assert!(ensure_parent(&parent, std::iter::empty()).is_ok());
    }
}
