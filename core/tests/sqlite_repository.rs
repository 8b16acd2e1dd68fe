#![cfg(feature = "sqlite")]

//! 基于内存 SQLite 的仓储端到端测试

use bigdecimal::BigDecimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlxrepo::{
    BindValue, ColumnStructure, ConnectionProvider, Crud, DbConfig, DbPool, DeclarationItem,
    Entity, Fetched, PoolRegistry, Qb, Record, Repository, RepositoryDef, RepositoryError,
    TableStructure, View,
};
use std::error::Error as _;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Entity)]
struct User {
    #[entity(auto)]
    id: Option<i64>,
    name: String,
    email: String,
    score: f64,
    nick: Option<String>,
}

impl User {
    fn new(name: &str, score: f64) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: format!("{}@example.com", name),
            score,
            nick: None,
        }
    }
}

/// 只读投影：计算列
#[derive(Debug, Entity)]
struct UserLabel {
    id: i64,
    #[entity(select = "UPPER(name) AS label")]
    label: String,
}

struct Users;

impl RepositoryDef for Users {
    type Entity = User;
    const TABLE: &'static str = "users";
    const DB_CONFIG: &'static str = "main";
}
impl View for Users {}
impl Crud for Users {}

struct Orders;

impl RepositoryDef for Orders {
    type Entity = Record;
    const TABLE: &'static str = "orders";
    const DB_CONFIG: &'static str = "main";
}
impl View for Orders {}
impl Crud for Orders {}

async fn setup() -> Arc<dyn ConnectionProvider> {
    // 内存库只在单个连接内可见
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let pool = DbPool::from_sqlite_pool(Arc::new(pool));
    let config = DbConfig::new("main", "sqlite::memory:");

    let mut item = DeclarationItem::new(config.clone());
    item.push(
        TableStructure::new("users")
            .column(
                ColumnStructure::new("id", "INTEGER")
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnStructure::new("name", "TEXT").unique())
            .column(ColumnStructure::new("email", "TEXT"))
            .column(ColumnStructure::new("score", "REAL").default_value("0"))
            .column(ColumnStructure::new("nick", "TEXT").nullable()),
    );
    item.push(
        TableStructure::new("orders")
            .column(
                ColumnStructure::new("id", "INTEGER")
                    .primary_key()
                    .auto_increment(),
            )
            .column(ColumnStructure::new("user_id", "INTEGER"))
            .column(ColumnStructure::new("amount", "INTEGER")),
    );
    for sql in item.create_statements().unwrap() {
        pool.execute(&sql, &[]).await.unwrap();
    }

    let registry = PoolRegistry::new();
    registry.register(config, pool);
    Arc::new(registry)
}

fn entities(rows: Vec<Fetched<User>>) -> Vec<User> {
    rows.into_iter().filter_map(Fetched::entity).collect()
}

#[tokio::test]
async fn test_insert_then_find_by_id() {
    let provider = setup().await;
    let users = Repository::<Users>::new(provider).unwrap();

    let first = users.insert(&User::new("alice", 9.5)).await.unwrap();
    let second = users.insert(&User::new("bob", 7.0)).await.unwrap();
    assert_eq!(first, BindValue::Int64(1));
    assert_eq!(second, BindValue::Int64(2));

    let alice = users.find_by_id(1i64).await.unwrap().and_then(Fetched::entity);
    assert_eq!(
        alice,
        Some(User {
            id: Some(1),
            ..User::new("alice", 9.5)
        })
    );

    assert!(users.find_by_id(99i64).await.unwrap().is_none());
    let err = users.find_by_id_or_throw(99i64, None).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound(_)));
    assert_eq!(err.to_string(), "Entity not found");
}

#[tokio::test]
async fn test_fluent_query_filters_orders_and_pages() {
    let provider = setup().await;
    let mut users = Repository::<Users>::new(provider).unwrap();
    let rows = ["carol", "dave", "erin", "frank"]
        .iter()
        .zip([3.0, 8.0, 6.0, 1.0])
        .map(|(name, score)| User::new(name, score))
        .collect::<Vec<_>>();
    assert_eq!(users.insert_group(&rows).await.unwrap(), 4);

    users
        .where_(&Qb::ge("score", 3.0).and(Qb::ne("name", "erin")))
        .order_by("score DESC");
    let names: Vec<String> = entities(users.find_all().await.unwrap())
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["dave", "carol"]);

    users.order_by("score").limit_offset(2, 1).unwrap();
    let names: Vec<String> = entities(users.find_all().await.unwrap())
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["carol", "erin"]);

    // 上一次查询后片段已清空
    assert_eq!(users.find_all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_select_returns_raw_rows_and_columns() {
    let provider = setup().await;
    let mut users = Repository::<Users>::new(provider).unwrap();
    users
        .insert_group(&[User::new("gina", 4.0), User::new("hank", 5.0)])
        .await
        .unwrap();

    users.select("COUNT(*) AS total");
    let row = users.find().await.unwrap().and_then(Fetched::raw).unwrap();
    assert_eq!(row.get("total"), Some(&BindValue::Int64(2)));

    users.select("name").order_by("name DESC");
    assert_eq!(
        users.find_column(0).await.unwrap(),
        Some(BindValue::from("hank"))
    );

    let label = users
        .find_as::<UserLabel>()
        .await
        .unwrap()
        .and_then(Fetched::entity)
        .unwrap();
    assert_eq!(label.id, 1);
    assert_eq!(label.label, "GINA");
}

#[tokio::test]
async fn test_aggregate_columns_decode() {
    let provider = setup().await;
    let mut users = Repository::<Users>::new(provider.clone()).unwrap();
    users
        .insert_group(&[User::new("olga", 2.0), User::new("pete", 5.0)])
        .await
        .unwrap();

    users.select("AVG(score)");
    assert_eq!(
        users.find_column(0).await.unwrap(),
        Some(BindValue::Float64(3.5))
    );

    let orders = Repository::<Orders>::new(provider).unwrap();
    for amount in [120i64, 80] {
        orders
            .insert(&Record::new().with("user_id", 1i64).with("amount", amount))
            .await
            .unwrap();
    }
    let mut totals = orders.fresh();
    totals.select("SUM(amount) AS total, AVG(amount) AS mean, MAX(amount) AS top");
    let row = totals.find().await.unwrap().and_then(Fetched::raw).unwrap();
    assert_eq!(row.get("total"), Some(&BindValue::Int64(200)));
    assert_eq!(row.get("mean"), Some(&BindValue::Float64(100.0)));
    assert_eq!(row.get("top"), Some(&BindValue::Int64(120)));

    // SQLite 中定点数以文本绑定，按列亲和性比较
    let large = orders
        .find_all_by(Some(&Qb::ge("amount", BigDecimal::from(100))))
        .await
        .unwrap();
    assert_eq!(large.len(), 1);
}

#[tokio::test]
async fn test_join_sub_query_keeps_bind_order() {
    let provider = setup().await;
    let mut users = Repository::<Users>::instance(provider.clone(), "u").unwrap();
    users
        .insert_group(&[User::new("ivan", 1.0), User::new("judy", 2.0)])
        .await
        .unwrap();

    let orders = Repository::<Orders>::new(provider.clone()).unwrap();
    for (user_id, amount) in [(1i64, 50i64), (1, 500), (2, 700)] {
        orders
            .insert(&Record::new().with("user_id", user_id).with("amount", amount))
            .await
            .unwrap();
    }

    let mut big = Repository::<Orders>::instance(provider, "o").unwrap();
    big.where_(&Qb::gt("o.amount", 100i64));
    users
        .select("u.name, o.amount")
        .where_(&Qb::eq("u.name", "ivan"))
        .join(&big, "o.user_id = u.id")
        .unwrap();

    let rows: Vec<Record> = users
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .filter_map(Fetched::raw)
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&BindValue::from("ivan")));
    assert_eq!(rows[0].get("amount"), Some(&BindValue::Int64(500)));
}

#[tokio::test]
async fn test_update_delete_and_upsert() {
    let provider = setup().await;
    let mut users = Repository::<Users>::new(provider).unwrap();
    users
        .insert_group(&[User::new("kate", 1.0), User::new("liam", 2.0)])
        .await
        .unwrap();

    let changes = Record::new().with("nick", "k").with("score", 10.0);
    assert_eq!(users.update(&changes, &Qb::eq("name", "kate")).await.unwrap(), 1);
    let kate = users
        .find_by(&Qb::eq("name", "kate"))
        .await
        .unwrap()
        .and_then(Fetched::entity)
        .unwrap();
    assert_eq!(kate.nick.as_deref(), Some("k"));
    assert_eq!(kate.score, 10.0);

    let mut liam = User::new("liam", 2.0);
    liam.email = "liam@new.example.com".to_string();
    users.upsert(&liam, &["name"], Some(&["email"][..])).await.unwrap();
    users.upsert(&User::new("mona", 3.0), &["name"], None).await.unwrap();

    let liam = users
        .find_by(&Qb::eq("name", "liam"))
        .await
        .unwrap()
        .and_then(Fetched::entity)
        .unwrap();
    assert_eq!(liam.email, "liam@new.example.com");
    assert_eq!(liam.score, 2.0);

    assert_eq!(users.delete(&Qb::in_list("name", ["kate", "mona"])).await.unwrap(), 2);
    let left: Vec<String> = entities(users.find_all().await.unwrap())
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(left, vec!["liam"]);
}

#[tokio::test]
async fn test_constraint_violation_is_mutation_error() {
    let provider = setup().await;
    let users = Repository::<Users>::new(provider).unwrap();
    users.insert(&User::new("nora", 1.0)).await.unwrap();

    let err = users.insert(&User::new("nora", 2.0)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Mutation { .. }));
    assert!(err.to_string().contains("UNIQUE"));
    assert!(err.code().is_some());
    assert!(err.source().is_some());
}
