// derive 宏生成的代码使用 `::sqlxrepo::` 路径，crate 内部测试也需要能解析
extern crate self as sqlxrepo;

pub mod builder;
pub mod config;
pub mod connection;
pub mod db_pool;
pub mod declaration;
pub mod entity;
pub mod error;
pub mod executor;
pub mod parts;
pub mod pool_registry;
pub mod predicate;
pub mod repository;
pub mod utils;
pub mod value;

pub use config::DbConfig;
pub use connection::{Connection, ConnectionProvider, Statement};
pub use db_pool::{DbDriver, DbPool, ExecOutcome};
pub use declaration::{ColumnStructure, Declaration, DeclarationItem, TableStructure};
pub use entity::{Entity, EntityMeta, Fetched, FieldMeta};
pub use executor::{SqlxConnection, SqlxStatement};
pub use parts::{Part, PartValue, SqlParts};
pub use pool_registry::PoolRegistry;
pub use predicate::Qb;
pub use repository::{Crud, Repository, RepositoryDef, View};
pub use value::{BindValue, Binds, FromValue, Record, ToRecord};

// 重新导出 derive 的所有公共 API（宏）
pub use error::{DbError, RepositoryError, Result};
pub use sqlxrepo_derive::*;
