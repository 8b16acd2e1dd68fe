//! 按配置标识管理连接池

use crate::config::DbConfig;
use crate::connection::{Connection, ConnectionProvider};
use crate::db_pool::DbPool;
use crate::error::DbError;
use crate::executor::SqlxConnection;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// 连接池注册表，仓储通过它按 `DB_CONFIG` 取得配置和连接
#[derive(Default)]
pub struct PoolRegistry {
    entries: RwLock<HashMap<String, (DbConfig, Arc<SqlxConnection>)>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个已建立的连接池；同名配置会被替换
    pub fn register(&self, config: DbConfig, pool: DbPool) {
        let connection = Arc::new(SqlxConnection::new(pool));
        tracing::debug!(config = %config.name, driver = ?connection.driver(), "register pool");
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(config.name.clone(), (config, connection));
            }
            Err(poisoned) => {
                poisoned
                    .into_inner()
                    .insert(config.name.clone(), (config, connection));
            }
        }
    }

    /// 逐个连接并注册
    pub async fn connect(configs: impl IntoIterator<Item = DbConfig>) -> Result<Self, DbError> {
        let registry = Self::new();
        for config in configs {
            let pool = DbPool::connect_with(&config).await?;
            registry.register(config, pool);
        }
        Ok(registry)
    }

    pub fn names(&self) -> Vec<String> {
        self.read(|entries| entries.keys().cloned().collect())
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, (DbConfig, Arc<SqlxConnection>)>) -> T) -> T {
        match self.entries.read() {
            Ok(entries) => f(&entries),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn unknown(name: &str) -> DbError {
        DbError::new(format!("Unknown database config: {}", name))
    }
}

impl ConnectionProvider for PoolRegistry {
    fn config(&self, name: &str) -> Result<DbConfig, DbError> {
        self.read(|entries| entries.get(name).map(|(config, _)| config.clone()))
            .ok_or_else(|| Self::unknown(name))
    }

    fn connection(&self, name: &str) -> Result<Arc<dyn Connection>, DbError> {
        self.read(|entries| entries.get(name).map(|(_, conn)| conn.clone()))
            .map(|conn| conn as Arc<dyn Connection>)
            .ok_or_else(|| Self::unknown(name))
    }
}
