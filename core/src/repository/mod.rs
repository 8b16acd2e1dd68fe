//! 仓储：在一张表上组装 SELECT 语句，并按能力提供读写操作
//!
//! ```ignore
//! struct UserRepository;
//!
//! impl RepositoryDef for UserRepository {
//!     type Entity = User;
//!     const TABLE: &'static str = "users";
//!     const DB_CONFIG: &'static str = "main";
//! }
//! impl View for UserRepository {}
//! impl Crud for UserRepository {}
//!
//! let mut repo = Repository::<UserRepository>::instance(provider, "u")?;
//! repo.where_(&Qb::eq("u.status", "active")).order_by("u.id DESC");
//! let users = repo.find_all().await?;
//! ```

mod crud;
mod view;

use crate::connection::{Connection, ConnectionProvider};
use crate::entity::{Entity, EntityMeta};
use crate::error::{DbError, RepositoryError, Result};
use crate::parts::{Part, PartValue, SqlParts};
use crate::predicate::Qb;
use std::marker::PhantomData;
use std::sync::Arc;

/// 仓储的静态定义
pub trait RepositoryDef: Send + Sync + 'static {
    /// 结果映射的目标实体，使用 `Record` 表示无类型记录
    type Entity: Entity;

    /// 表名
    const TABLE: &'static str;

    /// 数据库配置标识
    const DB_CONFIG: &'static str;

    /// 所在 schema；为 `None` 时使用数据库配置中的 schema
    const SCHEMA: Option<&'static str> = None;

    /// 标识列名，`find_by_id` 使用
    fn identifier_column() -> &'static str {
        "id"
    }
}

/// 读能力：`find`、`find_all`、`find_by_id` 等
pub trait View: RepositoryDef {}

/// 写能力：`insert`、`update`、`delete`、`upsert` 等
pub trait Crud: RepositoryDef {}

/// 一次查询的构建器
///
/// 片段通过链式方法写入，执行读操作后全部清空。
pub struct Repository<D: RepositoryDef> {
    provider: Arc<dyn ConnectionProvider>,
    schema: Option<String>,
    entity: &'static EntityMeta,
    parts: SqlParts,
    _def: PhantomData<fn() -> D>,
}

impl<D: RepositoryDef> Clone for Repository<D> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            schema: self.schema.clone(),
            entity: self.entity,
            parts: self.parts.clone(),
            _def: PhantomData,
        }
    }
}

impl<D: RepositoryDef> std::fmt::Debug for Repository<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table", &self.origin_table())
            .field("db_config", &D::DB_CONFIG)
            .field("entity", &self.entity.name)
            .field("parts", &self.parts)
            .finish()
    }
}

impl<D: RepositoryDef> Repository<D> {
    /// 创建仓储；配置标识为空或提供者不认识该标识时返回配置错误
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Result<Self> {
        if D::DB_CONFIG.is_empty() {
            return Err(RepositoryError::Config(format!(
                "{} DB_CONFIG must be set",
                std::any::type_name::<D>()
            )));
        }
        let config = provider
            .config(D::DB_CONFIG)
            .map_err(|e| RepositoryError::Config(e.message().to_string()))?;
        let schema = D::SCHEMA
            .map(str::to_string)
            .or(config.schema)
            .filter(|s| !s.is_empty());
        Ok(Self {
            provider,
            schema,
            entity: D::Entity::meta(),
            parts: SqlParts::new(),
            _def: PhantomData,
        })
    }

    /// 创建仓储并设置别名（空别名不设置）
    pub fn instance(provider: Arc<dyn ConnectionProvider>, alias: &str) -> Result<Self> {
        let mut repository = Self::new(provider)?;
        repository.alias(alias);
        Ok(repository)
    }

    /// 同一定义下的全新构建器（不带任何片段）
    pub fn fresh(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            schema: self.schema.clone(),
            entity: self.entity,
            parts: SqlParts::new(),
            _def: PhantomData,
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// 带 schema 前缀的表名
    pub fn origin_table(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, D::TABLE),
            None => D::TABLE.to_string(),
        }
    }

    pub fn db_config_name(&self) -> &'static str {
        D::DB_CONFIG
    }

    pub fn entity_name(&self) -> &'static str {
        self.entity.name
    }

    pub fn identifier_column(&self) -> &'static str {
        D::identifier_column()
    }

    pub fn db(&self) -> std::result::Result<Arc<dyn Connection>, DbError> {
        self.provider.connection(D::DB_CONFIG)
    }

    /// 读取某个片段的原始值
    pub fn get_sql(&self, part: Part) -> Option<&PartValue> {
        self.parts.get(part)
    }

    /// 清除一个片段；传 `None` 时清空全部片段
    pub fn clean_cache(&mut self, part: Option<Part>) {
        match part {
            Some(part) => {
                self.parts.remove(part);
            }
            None => self.parts.clear(),
        }
    }

    /// 按固定顺序组装 SQL：
    /// SELECT, FROM, as, join, where, group, having, order, LIMIT, OFFSET, FOR
    pub fn build_sql(&self) -> Result<String> {
        self.assemble(self.entity)
    }

    fn assemble(&self, entity: &EntityMeta) -> Result<String> {
        if D::TABLE.trim().is_empty() {
            return Err(RepositoryError::build(format!(
                "{} TABLE must not be empty",
                std::any::type_name::<D>()
            )));
        }

        let mut sql = vec![
            format!("SELECT {}", self.projection(entity)),
            format!("FROM {}", self.origin_table()),
        ];
        for part in [
            Part::As,
            Part::Join,
            Part::Where,
            Part::Group,
            Part::Having,
            Part::Order,
        ] {
            if let Some(text) = self.parts.text(part) {
                sql.push(text.trim().to_string());
            }
        }
        if let Some(limit) = self.parts.number(Part::Limit) {
            sql.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.parts.number(Part::Offset) {
            sql.push(format!("OFFSET {}", offset));
        }
        if let Some(context) = self.parts.text(Part::For) {
            sql.push(format!("FOR {}", context));
        }

        let sql = sql.join(" ");
        tracing::debug!(repository = std::any::type_name::<D>(), %sql, "Repository build");
        Ok(sql)
    }

    /// 投影：显式 `select` 原样使用；无类型记录为 `*`；否则按实体字段生成
    fn projection(&self, entity: &EntityMeta) -> String {
        match self.parts.text(Part::Select) {
            Some(option) => option.to_string(),
            None => entity.projection(self.parts.text(Part::As)),
        }
    }

    /// 结果是否只能以原始行返回
    fn returns_raw(&self, entity: &EntityMeta) -> bool {
        self.parts.contains(Part::Select) || entity.untyped
    }

    pub fn select(&mut self, option: &str) -> &mut Self {
        if !option.is_empty() {
            self.parts.set_text(Part::Select, option);
        }
        self
    }

    /// 表别名（SQL 中的 `as` 片段）
    pub fn alias(&mut self, alias: &str) -> &mut Self {
        if !alias.is_empty() {
            self.parts.set_text(Part::As, alias);
        }
        self
    }

    pub fn join<O: RepositoryDef>(&mut self, other: &Repository<O>, on: &str) -> Result<&mut Self> {
        self.push_join("JOIN", other, on)
    }

    pub fn join_left<O: RepositoryDef>(
        &mut self,
        other: &Repository<O>,
        on: &str,
    ) -> Result<&mut Self> {
        self.push_join("LEFT JOIN", other, on)
    }

    pub fn join_right<O: RepositoryDef>(
        &mut self,
        other: &Repository<O>,
        on: &str,
    ) -> Result<&mut Self> {
        self.push_join("RIGHT JOIN", other, on)
    }

    fn push_join<O: RepositoryDef>(
        &mut self,
        keyword: &str,
        other: &Repository<O>,
        on: &str,
    ) -> Result<&mut Self> {
        let context = self.joined_context(other, on)?;
        self.parts
            .append_text(Part::Join, &format!("{} {}", keyword, context));
        Ok(self)
    }

    /// 被连接的仓储只有别名时按表引用渲染，否则作为子查询渲染并合并其绑定值
    fn joined_context<O: RepositoryDef>(
        &mut self,
        other: &Repository<O>,
        on: &str,
    ) -> Result<String> {
        let alias = other.parts.text(Part::As).unwrap_or("");
        let target = if other.parts.len() > 1 {
            let sub = other.build_sql()?;
            self.parts.merge_binds(&other.parts.binds());
            format!("({})", sub)
        } else {
            other.origin_table()
        };
        Ok(if alias.is_empty() {
            format!("{} ON({})", target, on)
        } else {
            format!("{} {} ON({})", target, alias, on)
        })
    }

    /// 设置 WHERE；空条件不做任何事，绑定值与已有绑定值合并
    ///
    /// 没有绑定值的条件同样会写入绑定值片段，被连接时按子查询渲染。
    pub fn where_<'q>(&mut self, qb: impl Into<Option<&'q Qb>>) -> &mut Self {
        if let Some(qb) = qb.into() {
            if !qb.is_empty() {
                self.parts
                    .set_text(Part::Where, format!("WHERE {}", qb.sql()));
                self.parts.ensure_binds();
                self.parts.merge_binds(qb.binds());
            }
        }
        self
    }

    pub fn group_by(&mut self, context: &str) -> &mut Self {
        if !context.is_empty() {
            self.parts.set_text(Part::Group, format!("GROUP BY {}", context));
        }
        self
    }

    pub fn having(&mut self, context: &str) -> &mut Self {
        if !context.is_empty() {
            self.parts.set_text(Part::Having, format!("HAVING {}", context));
        }
        self
    }

    pub fn order_by(&mut self, context: &str) -> &mut Self {
        if !context.is_empty() {
            self.parts.set_text(Part::Order, format!("ORDER BY {}", context));
        }
        self
    }

    /// `LIMIT n OFFSET 0`
    pub fn limit(&mut self, limit: i64) -> Result<&mut Self> {
        self.limit_offset(limit, 0)
    }

    /// `limit < 1` 或 `offset < 0` 时返回校验错误，且不修改任何片段
    pub fn limit_offset(&mut self, limit: i64, offset: i64) -> Result<&mut Self> {
        if limit < 1 {
            return Err(RepositoryError::validation("limit < 1"));
        }
        if offset < 0 {
            return Err(RepositoryError::validation("offset < 0"));
        }
        self.parts.set_number(Part::Limit, limit as u64);
        self.parts.set_number(Part::Offset, offset as u64);
        Ok(self)
    }

    /// 尾部子句（如 `UPDATE`、`SHARE`），总是写入，包括空字符串
    pub fn for_by(&mut self, context: &str) -> &mut Self {
        self.parts.set_text(Part::For, context);
        self
    }
}
