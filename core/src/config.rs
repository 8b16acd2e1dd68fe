//! 数据库配置

use crate::error::{RepositoryError, Result};
use serde::Deserialize;

/// 一个数据库配置（配置标识 + 连接参数）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    /// 配置标识，仓储通过 `RepositoryDef::DB_CONFIG` 引用
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

impl DbConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            schema: None,
            max_connections: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// 从环境变量读取：`<PREFIX>_URL`（必填）、`<PREFIX>_SCHEMA`、`<PREFIX>_MAX_CONNECTIONS`
    pub fn from_env(name: impl Into<String>, prefix: &str) -> Result<Self> {
        Self::from_lookup(name, prefix, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        name: impl Into<String>,
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let url_key = format!("{}_URL", prefix);
        let url = lookup(&url_key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RepositoryError::Config(format!("{} is not set", url_key)))?;
        let schema = lookup(&format!("{}_SCHEMA", prefix)).filter(|v| !v.is_empty());
        let max_key = format!("{}_MAX_CONNECTIONS", prefix);
        let max_connections = match lookup(&max_key) {
            Some(raw) => Some(raw.parse::<u32>().map_err(|e| {
                RepositoryError::Config(format!("{} is not a valid number: {}", max_key, e))
            })?),
            None => None,
        };
        Ok(Self {
            name: name.into(),
            url,
            schema,
            max_connections,
        })
    }
}
