#![cfg(feature = "postgres")]

//! PostgreSQL 专有列类型的解码测试
//!
//! 需要设置 `PG_DATABASE_URL`，未设置时跳过。

use bigdecimal::BigDecimal;
use sqlxrepo::{BindValue, DbPool, FromValue};

async fn pool() -> Option<DbPool> {
    let url = std::env::var("PG_DATABASE_URL").ok()?;
    Some(DbPool::connect(&url).await.unwrap())
}

#[tokio::test]
async fn test_numeric_aggregates_decode_as_decimal() {
    let Some(pool) = pool().await else {
        return;
    };

    let rows = pool
        .fetch_all(
            "SELECT AVG(x) AS mean, SUM(x) AS total, CAST(12.50 AS NUMERIC(10, 2)) AS price \
             FROM (VALUES (1::bigint), (2::bigint)) AS t(x)",
            &[],
        )
        .await
        .unwrap();
    let row = &rows[0];

    assert!(matches!(row.get("mean"), Some(BindValue::Decimal(_))));
    assert_eq!(f64::from_value(row.get("mean").cloned().unwrap()), Ok(1.5));
    assert_eq!(i64::from_value(row.get("total").cloned().unwrap()), Ok(3));
    assert_eq!(
        BigDecimal::from_value(row.get("price").cloned().unwrap()),
        Ok("12.5".parse::<BigDecimal>().unwrap())
    );
}

#[tokio::test]
async fn test_date_uuid_and_json_decode_as_text() {
    let Some(pool) = pool().await else {
        return;
    };

    let rows = pool
        .fetch_all(
            "SELECT DATE '2024-05-01' AS day, TIME '10:20:30' AS at, \
             'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11'::uuid AS id, '{\"a\":1}'::json AS doc",
            &[],
        )
        .await
        .unwrap();
    let row = &rows[0];

    assert_eq!(row.get("day"), Some(&BindValue::from("2024-05-01")));
    assert_eq!(row.get("at"), Some(&BindValue::from("10:20:30")));
    assert_eq!(
        row.get("id"),
        Some(&BindValue::from("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"))
    );
    assert_eq!(row.get("doc"), Some(&BindValue::from("{\"a\":1}")));
}

#[tokio::test]
async fn test_decimal_binds_round_trip() {
    let Some(pool) = pool().await else {
        return;
    };

    let price: BigDecimal = "19.99".parse().unwrap();
    let rows = pool
        .fetch_all("SELECT $1::numeric * 2 AS doubled", &[BindValue::from(price)])
        .await
        .unwrap();
    assert_eq!(
        BigDecimal::from_value(rows[0].get("doubled").cloned().unwrap()),
        Ok("39.98".parse::<BigDecimal>().unwrap())
    );
}
