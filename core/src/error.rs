use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 仓储层错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 仓储定义缺少数据库配置，或配置无法解析
    #[error("Configuration error: {0}")]
    Config(String),
    /// 组装 SQL 失败
    #[error("Build error: {message}")]
    Build {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    /// insert / update / delete / upsert 执行失败，保留原始消息、错误码和错误链
    #[error("{message}")]
    Mutation {
        message: String,
        code: Option<String>,
        #[source]
        source: DbError,
    },
    /// 读语句在 prepare / execute / fetch 阶段失败
    #[error("Query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
    /// 行数据映射到实体失败
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },
    /// 仅由 *_or_throw 查询抛出
    #[error("{0}")]
    NotFound(String),
    /// 参数越界，例如 `limit(0)`
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RepositoryError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// 将外部执行器的错误包装为 Mutation 错误
    pub fn mutation(source: DbError) -> Self {
        Self::Mutation {
            message: source.message().to_string(),
            code: source.code().map(str::to_string),
            source,
        }
    }

    /// 将读路径上的错误包装为 Query 错误
    pub fn query(source: DbError) -> Self {
        Self::Query {
            message: source.message().to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// 错误码（仅 Mutation 错误携带）
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Mutation { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// 外部协作者（连接池、语句、执行器）返回的错误
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DbError {
    message: String,
    code: Option<String>,
    #[source]
    source: Option<BoxError>,
}

impl DbError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned());
        Self {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_mutation_keeps_message_code_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let db = DbError::new("duplicate key")
            .with_code("23505")
            .with_source(io);
        let err = RepositoryError::mutation(db);

        assert_eq!(err.to_string(), "duplicate key");
        assert_eq!(err.code(), Some("23505"));
        let cause = err.source().expect("db error cause");
        assert_eq!(cause.to_string(), "duplicate key");
        let root = cause.source().expect("io cause");
        assert_eq!(root.to_string(), "socket closed");
    }

    #[test]
    fn test_not_found_displays_message_verbatim() {
        let err = RepositoryError::NotFound("Entity not found".to_string());
        assert_eq!(err.to_string(), "Entity not found");
    }
}
