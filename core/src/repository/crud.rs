use super::{Crud, Repository};
use crate::error::{DbError, RepositoryError, Result};
use crate::predicate::Qb;
use crate::value::{BindValue, Record, ToRecord};

/// 写操作失败统一包装为 Mutation 错误
fn wrap(operation: &str, table: &str, err: DbError) -> RepositoryError {
    tracing::warn!(operation, table, error = %err, code = ?err.code(), "Repository mutation failed");
    RepositoryError::mutation(err)
}

/// 写操作只依赖表名，不读取也不清空查询片段
impl<D: Crud> Repository<D> {
    /// 插入一行，返回新行标识
    pub async fn insert<R: ToRecord + ?Sized>(&self, entity: &R) -> Result<BindValue> {
        let table = self.origin_table();
        let record = entity.to_record();
        let result = match self.db() {
            Ok(conn) => conn.insert(&table, D::identifier_column(), &record).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("insert", &table, e))
    }

    /// 批量插入，返回影响行数
    pub async fn insert_group<R: ToRecord>(&self, entities: &[R]) -> Result<u64> {
        let table = self.origin_table();
        let records: Vec<Record> = entities.iter().map(ToRecord::to_record).collect();
        let result = match self.db() {
            Ok(conn) => conn.insert_group(&table, &records).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("insert_group", &table, e))
    }

    /// 按条件更新，返回影响行数
    pub async fn update<R: ToRecord + ?Sized>(&self, entity: &R, qb: &Qb) -> Result<u64> {
        let table = self.origin_table();
        let record = entity.to_record();
        let result = match self.db() {
            Ok(conn) => conn.update(&table, &record, qb).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("update", &table, e))
    }

    /// 按条件删除，返回影响行数
    pub async fn delete(&self, qb: &Qb) -> Result<u64> {
        let table = self.origin_table();
        let result = match self.db() {
            Ok(conn) => conn.delete(&table, qb).await,
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("delete", &table, e))
    }

    /// 插入或更新；`update_columns` 为 `None` 时更新冲突列以外的全部列
    pub async fn upsert<R: ToRecord + ?Sized>(
        &self,
        entity: &R,
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<BindValue> {
        let table = self.origin_table();
        let record = entity.to_record();
        let result = match self.db() {
            Ok(conn) => {
                conn.upsert(
                    &table,
                    D::identifier_column(),
                    &record,
                    conflict_columns,
                    update_columns,
                )
                .await
            }
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("upsert", &table, e))
    }

    pub async fn upsert_group<R: ToRecord>(
        &self,
        entities: &[R],
        conflict_columns: &[&str],
        update_columns: Option<&[&str]>,
    ) -> Result<u64> {
        let table = self.origin_table();
        let records: Vec<Record> = entities.iter().map(ToRecord::to_record).collect();
        let result = match self.db() {
            Ok(conn) => {
                conn.upsert_group(&table, &records, conflict_columns, update_columns)
                    .await
            }
            Err(err) => Err(err),
        };
        result.map_err(|e| wrap("upsert_group", &table, e))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Users;
    use super::*;
    use crate::connection::mock::MockProvider;
    use crate::parts::Part;
    use std::error::Error as _;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mutations_use_qualified_table() {
        let provider = Arc::new(MockProvider::new("main").with_schema("app"));
        let repo = Repository::<Users>::new(provider.clone()).unwrap();
        let row = Record::new().with("id", 7i64).with("name", "alice");

        assert_eq!(repo.insert(&row).await.unwrap(), BindValue::Int64(7));
        assert_eq!(repo.insert_group(&[row.clone(), row.clone()]).await.unwrap(), 2);
        assert_eq!(repo.update(&row, &Qb::raw("id = 7")).await.unwrap(), 1);
        assert_eq!(repo.delete(&Qb::raw("id = 7")).await.unwrap(), 1);
        repo.upsert(&row, &["id"], None).await.unwrap();
        repo.upsert_group(&[row], &["id"], Some(&["name"][..])).await.unwrap();

        let calls = provider.conn.mutations.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "insert app.users 2",
                "insert_group app.users 2",
                "update app.users 2 WHERE id = 7",
                "delete app.users WHERE id = 7",
                "upsert app.users (id)",
                "upsert_group app.users 1 (id)",
            ]
        );
    }

    #[tokio::test]
    async fn test_mutation_failure_keeps_message_code_and_cause() {
        let provider = Arc::new(MockProvider::new("main"));
        provider.conn.fail_mutations("duplicate key value", "23505");
        let repo = Repository::<Users>::new(provider).unwrap();

        let err = repo
            .insert(&Record::new().with("name", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Mutation { .. }));
        assert_eq!(err.to_string(), "duplicate key value");
        assert_eq!(err.code(), Some("23505"));
        assert_eq!(err.source().unwrap().to_string(), "duplicate key value");

        let err = repo.delete(&Qb::raw("1 = 1")).await.unwrap_err();
        assert_eq!(err.code(), Some("23505"));
    }

    #[tokio::test]
    async fn test_mutations_leave_query_parts_untouched() {
        let provider = Arc::new(MockProvider::new("main"));
        let mut repo = Repository::<Users>::new(provider).unwrap();
        repo.where_(&Qb::eq("id", 1i64)).order_by("id");

        repo.delete(&Qb::raw("id = 2")).await.unwrap();
        assert!(repo.get_sql(Part::Where).is_some());
        assert!(repo.get_sql(Part::Order).is_some());
    }
}
