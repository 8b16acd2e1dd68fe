use super::{Repository, View};
use crate::connection::Statement;
use crate::entity::{Entity, EntityMeta, Fetched};
use crate::error::{RepositoryError, Result};
use crate::predicate::Qb;
use crate::value::{BindValue, Record};

const DEFAULT_NOT_FOUND: &str = "Entity not found";

fn map_row<T: Entity>(record: Record, raw: bool) -> Result<Fetched<T>> {
    if raw {
        Ok(Fetched::Raw(record))
    } else {
        T::from_record(record).map(Fetched::Entity)
    }
}

impl<D: View> Repository<D> {
    /// 组装、清空片段、绑定并执行；返回已执行的语句和结果是否为原始行
    ///
    /// 片段在取得 SQL 和绑定值之后立即清空，执行失败时同样如此。
    async fn run(&mut self, entity: &'static EntityMeta) -> Result<(Box<dyn Statement>, bool)> {
        let raw = self.returns_raw(entity);
        let sql = self.assemble(entity);
        let binds = self.parts.binds();
        self.clean_cache(None);
        let sql = sql?;

        let conn = self.db().map_err(RepositoryError::query)?;
        let mut stmt = conn.prepare(&sql).map_err(RepositoryError::query)?;
        for (token, value) in binds.iter() {
            stmt.bind_value(token, value.clone());
        }
        stmt.execute().await.map_err(RepositoryError::query)?;
        Ok((stmt, raw))
    }

    /// 查询第一行（强制 `LIMIT 1`）
    pub async fn find(&mut self) -> Result<Option<Fetched<D::Entity>>> {
        self.find_as::<D::Entity>().await
    }

    /// 查询第一行并映射为指定实体；投影也按该实体生成
    pub async fn find_as<T: Entity>(&mut self) -> Result<Option<Fetched<T>>> {
        self.limit(1)?;
        let (mut stmt, raw) = self.run(T::meta()).await?;
        match stmt.fetch_one().map_err(RepositoryError::query)? {
            Some(record) => map_row(record, raw).map(Some),
            None => Ok(None),
        }
    }

    /// 查询第一行的第 `index` 列（强制 `LIMIT 1`）
    pub async fn find_column(&mut self, index: usize) -> Result<Option<BindValue>> {
        self.limit(1)?;
        let entity = self.entity;
        let (mut stmt, _) = self.run(entity).await?;
        stmt.fetch_column(index).map_err(RepositoryError::query)
    }

    /// 查询全部匹配行
    pub async fn find_all(&mut self) -> Result<Vec<Fetched<D::Entity>>> {
        self.find_all_as::<D::Entity>().await
    }

    pub async fn find_all_as<T: Entity>(&mut self) -> Result<Vec<Fetched<T>>> {
        let (mut stmt, raw) = self.run(T::meta()).await?;
        stmt.fetch_all()
            .map_err(RepositoryError::query)?
            .into_iter()
            .map(|record| map_row(record, raw))
            .collect()
    }

    /// 按标识列查询，等价于 `find_by(&Qb::eq(identifier_column, id))`
    pub async fn find_by_id(&self, id: impl Into<BindValue>) -> Result<Option<Fetched<D::Entity>>> {
        self.find_by_id_as::<D::Entity>(id).await
    }

    pub async fn find_by_id_as<T: Entity>(
        &self,
        id: impl Into<BindValue>,
    ) -> Result<Option<Fetched<T>>> {
        self.find_by_as::<T>(&Qb::eq(D::identifier_column(), id)).await
    }

    pub async fn find_by(&self, qb: &Qb) -> Result<Option<Fetched<D::Entity>>> {
        self.find_by_as::<D::Entity>(qb).await
    }

    /// 在全新的构建器上应用条件后查询第一行
    pub async fn find_by_as<T: Entity>(&self, qb: &Qb) -> Result<Option<Fetched<T>>> {
        let mut repository = self.fresh();
        repository.where_(qb);
        repository.find_as::<T>().await
    }

    pub async fn find_all_by(&self, qb: Option<&Qb>) -> Result<Vec<Fetched<D::Entity>>> {
        self.find_all_by_as::<D::Entity>(qb).await
    }

    pub async fn find_all_by_as<T: Entity>(&self, qb: Option<&Qb>) -> Result<Vec<Fetched<T>>> {
        let mut repository = self.fresh();
        repository.where_(qb);
        repository.find_all_as::<T>().await
    }

    /// 查不到时返回 `NotFound`，默认消息为 "Entity not found"
    pub async fn find_by_id_or_throw(
        &self,
        id: impl Into<BindValue>,
        message: Option<&str>,
    ) -> Result<Fetched<D::Entity>> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(message.unwrap_or(DEFAULT_NOT_FOUND).to_string()))
    }

    pub async fn find_by_or_throw(
        &self,
        qb: &Qb,
        message: Option<&str>,
    ) -> Result<Fetched<D::Entity>> {
        self.find_by(qb)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(message.unwrap_or(DEFAULT_NOT_FOUND).to_string()))
    }
}
