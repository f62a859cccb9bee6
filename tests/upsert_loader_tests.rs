//! Loader behavior against a migrated SQLite database.

mod test_utils;

use anyhow::Result;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde_json::{Value, json};

use storesync::error::PersistenceError;
use storesync::loader::{ChildSet, ParentBatch, UpsertLoader};
use storesync::models::{aftersale_item, order, order_item, user};
use storesync::records::{CanonicalRecord, EntityKind, OrderItemRecord, ParentKey};

use test_utils::*;

fn canonical(kind: EntityKind, raw: &Value) -> CanonicalRecord {
    transformer().transform(kind, raw).accepted().unwrap()
}

fn order_parts(raw: &Value) -> (storesync::records::OrderRecord, Vec<OrderItemRecord>) {
    match canonical(EntityKind::Order, raw) {
        CanonicalRecord::Order { order, items } => (order, items),
        other => panic!("expected order, got {other:?}"),
    }
}

fn line(order_id: &str, line_no: i32, product_id: &str) -> OrderItemRecord {
    let (_, mut items) = order_parts(&raw_order(order_id));
    let mut item = items.remove(0);
    item.line_no = line_no;
    item.product_id = product_id.to_string();
    item
}

async fn product_ids_of(db: &sea_orm::DatabaseConnection, order_id: &str) -> Result<Vec<String>> {
    Ok(order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::LineNo)
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.product_id)
        .collect())
}

#[tokio::test]
async fn applying_the_same_page_twice_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();
    let page: Vec<CanonicalRecord> = raw_orders("o", 3)
        .iter()
        .map(|raw| canonical(EntityKind::Order, raw))
        .collect();

    let first = loader.apply_records(&db, page.clone()).await?;
    let orders_once = order::Entity::find().order_by_asc(order::Column::OrderId).all(&db).await?;
    let second = loader.apply_records(&db, page).await?;
    let orders_twice = order::Entity::find().order_by_asc(order::Column::OrderId).all(&db).await?;

    assert_eq!(first.succeeded, 3);
    assert_eq!(second.succeeded, 3);
    assert_eq!(orders_once, orders_twice);
    assert_eq!(order_item::Entity::find().count(&db).await?, 3);
    Ok(())
}

#[tokio::test]
async fn conflicting_write_overwrites_non_key_columns() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();

    let mut raw = raw_order("o_1");
    loader
        .apply_records(&db, vec![canonical(EntityKind::Order, &raw)])
        .await?;

    raw["order_info"]["order_state"] = json!(6);
    raw["order_info"]["actual_fee"] = json!(100);
    loader
        .apply_records(&db, vec![canonical(EntityKind::Order, &raw)])
        .await?;

    let stored = order::Entity::find_by_id(("xiaoe".to_string(), "o_1".to_string()))
        .one(&db)
        .await?
        .unwrap();
    assert_eq!(stored.order_state, Some(6));
    assert_eq!(stored.actual_fee, Some(Decimal::new(100, 2)));
    assert_eq!(order::Entity::find().count(&db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn replacing_children_leaves_only_the_new_set() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();
    let (parent, _) = order_parts(&raw_order("o_1"));
    let key = parent.key();
    loader.upsert_batch(&db, ParentBatch::Orders(vec![parent])).await?;

    let inserted = loader
        .replace_children(
            &db,
            &key,
            ChildSet::OrderItems(vec![line("o_1", 1, "a"), line("o_1", 2, "b")]),
        )
        .await?;
    assert_eq!(inserted, 2);
    assert_eq!(product_ids_of(&db, "o_1").await?, vec!["a", "b"]);

    loader
        .replace_children(&db, &key, ChildSet::OrderItems(vec![line("o_1", 1, "c")]))
        .await?;
    assert_eq!(product_ids_of(&db, "o_1").await?, vec!["c"]);

    loader
        .replace_children(&db, &key, ChildSet::OrderItems(Vec::new()))
        .await?;
    assert!(product_ids_of(&db, "o_1").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn children_of_another_parent_are_untouched() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();
    let records = vec![
        canonical(EntityKind::Order, &raw_order("o_1")),
        canonical(EntityKind::Order, &raw_order("o_2")),
    ];
    loader.apply_records(&db, records).await?;

    loader
        .replace_children(
            &db,
            &ParentKey::new("xiaoe", "o_1"),
            ChildSet::OrderItems(vec![line("o_1", 1, "z")]),
        )
        .await?;

    assert_eq!(product_ids_of(&db, "o_1").await?, vec!["z"]);
    assert_eq!(product_ids_of(&db, "o_2").await?, vec!["p_1"]);
    Ok(())
}

#[tokio::test]
async fn child_for_a_different_parent_is_refused() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();

    let err = loader
        .replace_children(
            &db,
            &ParentKey::new("xiaoe", "o_1"),
            ChildSet::OrderItems(vec![line("o_2", 1, "a")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::ParentMismatch { .. }));
    Ok(())
}

#[tokio::test]
async fn duplicate_keys_in_one_page_collapse_to_last() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::default();

    let mut renamed = raw_user("u_1", 2);
    renamed["user_nickname"] = json!("renamed");
    let page = vec![
        canonical(EntityKind::User, &raw_user("u_1", 1)),
        canonical(EntityKind::User, &raw_user("u_2", 2)),
        canonical(EntityKind::User, &renamed),
    ];
    let counts = loader.apply_records(&db, page).await?;

    assert_eq!(counts.succeeded, 2);
    let stored = user::Entity::find_by_id(("xiaoe".to_string(), "u_1".to_string()))
        .one(&db)
        .await?
        .unwrap();
    assert_eq!(stored.nickname.as_deref(), Some("renamed"));
    Ok(())
}

#[tokio::test]
async fn aftersale_lines_are_written_after_their_parent() -> Result<()> {
    let db = setup_test_db().await?;
    let loader = UpsertLoader::new(1);
    let raw = json!({
        "aftersale_id": "as_1",
        "order_id": "o_1",
        "state": 1,
        "apply_refund_money": 12345,
        "created_at": "2024-01-10 09:00:00",
        "goods_list": [
            {"goods_name": "Course", "buy_num": 1, "goods_price": 12345},
            {"goods_name": "Book", "buy_num": 2, "goods_price": 500}
        ]
    });

    loader
        .apply_records(&db, vec![canonical(EntityKind::Aftersale, &raw)])
        .await?;

    let lines = aftersale_item::Entity::find()
        .filter(aftersale_item::Column::AftersaleId.eq("as_1"))
        .order_by_asc(aftersale_item::Column::LineNo)
        .all(&db)
        .await?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].goods_price, Some(Decimal::new(500, 2)));
    Ok(())
}
