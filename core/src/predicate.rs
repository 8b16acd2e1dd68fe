//! 条件构建器
//!
//! `Qb` 产出一段 SQL 布尔片段以及「占位符 → 绑定值」映射，
//! 片段中使用命名占位符 `:qb_<n>`，执行前由驱动层转换为位置占位符。

use crate::value::{BindValue, Binds};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// 生成进程内唯一的占位符
fn next_token() -> String {
    format!(":qb_{}", NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
}

/// SQL 比较操作符
#[derive(Debug, Clone, Copy, PartialEq)]
enum Operator {
    /// 等于: =
    Eq,
    /// 不等于: !=
    Ne,
    /// 大于: >
    Gt,
    /// 大于等于: >=
    Ge,
    /// 小于: <
    Lt,
    /// 小于等于: <=
    Le,
    /// LIKE 匹配
    Like,
}

impl Operator {
    fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
        }
    }
}

/// 条件片段 + 绑定值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qb {
    sql: String,
    binds: Binds,
}

impl Qb {
    /// 空条件，`where_` 遇到空条件时不做任何事
    pub fn empty() -> Self {
        Self::default()
    }

    fn compare(column: &str, op: Operator, value: impl Into<BindValue>) -> Self {
        let token = next_token();
        let mut binds = Binds::new();
        let sql = format!("{} {} {}", column, op.as_sql(), token);
        binds.insert(token, value);
        Self { sql, binds }
    }

    pub fn eq(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn ne(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Ne, value)
    }

    pub fn gt(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Gt, value)
    }

    pub fn ge(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Ge, value)
    }

    pub fn lt(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Lt, value)
    }

    pub fn le(column: &str, value: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Le, value)
    }

    pub fn like(column: &str, pattern: impl Into<BindValue>) -> Self {
        Self::compare(column, Operator::Like, pattern)
    }

    /// IN 查询；空列表永远不匹配
    pub fn in_list<V: Into<BindValue>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::list(column, "IN", values).unwrap_or_else(|| Self::raw("1 = 0"))
    }

    /// NOT IN 查询；空列表永远匹配
    pub fn not_in<V: Into<BindValue>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::list(column, "NOT IN", values).unwrap_or_else(|| Self::raw("1 = 1"))
    }

    fn list<V: Into<BindValue>>(
        column: &str,
        keyword: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Option<Self> {
        let mut binds = Binds::new();
        let mut tokens = Vec::new();
        for value in values {
            let token = next_token();
            tokens.push(token.clone());
            binds.insert(token, value);
        }
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            sql: format!("{} {} ({})", column, keyword, tokens.join(", ")),
            binds,
        })
    }

    pub fn between(column: &str, low: impl Into<BindValue>, high: impl Into<BindValue>) -> Self {
        let (low_token, high_token) = (next_token(), next_token());
        let mut binds = Binds::new();
        let sql = format!("{} BETWEEN {} AND {}", column, low_token, high_token);
        binds.insert(low_token, low);
        binds.insert(high_token, high);
        Self { sql, binds }
    }

    pub fn is_null(column: &str) -> Self {
        Self::raw(format!("{} IS NULL", column))
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::raw(format!("{} IS NOT NULL", column))
    }

    /// 原样使用的 SQL 片段（不带绑定值）
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Binds::new(),
        }
    }

    /// 原样使用的 SQL 片段，调用方自行提供命名占位符的绑定值
    pub fn raw_with(sql: impl Into<String>, binds: Binds) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    /// `a AND b`；空条件直接被忽略
    pub fn and(self, other: Qb) -> Self {
        self.combine(other, "AND", false)
    }

    /// `(a OR b)`；空条件直接被忽略
    pub fn or(self, other: Qb) -> Self {
        self.combine(other, "OR", true)
    }

    fn combine(mut self, other: Qb, keyword: &str, group: bool) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        self.sql = if group {
            format!("({} {} {})", self.sql, keyword, other.sql)
        } else {
            format!("{} {} {}", self.sql, keyword, other.sql)
        };
        self.binds.extend(&other.binds);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &Binds {
        &self.binds
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_binds_one_token() {
        let qb = Qb::eq("id", 42i64);
        let tokens = qb.binds().tokens();
        assert_eq!(tokens.len(), 1);
        assert_eq!(qb.sql(), format!("id = {}", tokens[0]));
        assert_eq!(qb.binds().get(tokens[0]), Some(&BindValue::Int64(42)));
    }

    #[test]
    fn test_tokens_are_unique_across_predicates() {
        let a = Qb::eq("id", 1i64);
        let b = Qb::eq("id", 2i64);
        assert_ne!(a.binds().tokens(), b.binds().tokens());
    }

    #[test]
    fn test_and_or_combination() {
        let qb = Qb::eq("status", "active")
            .and(Qb::gt("age", 18i64).or(Qb::is_null("age")));
        let tokens = qb.binds().tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            qb.sql(),
            format!(
                "status = {} AND (age > {} OR age IS NULL)",
                tokens[0], tokens[1]
            )
        );
    }

    #[test]
    fn test_in_list_and_empty_lists() {
        let qb = Qb::in_list("id", vec![1i64, 2, 3]);
        assert_eq!(qb.binds().len(), 3);
        assert!(qb.sql().starts_with("id IN (:qb_"));

        assert_eq!(Qb::in_list("id", Vec::<i64>::new()).sql(), "1 = 0");
        assert_eq!(Qb::not_in("id", Vec::<i64>::new()).sql(), "1 = 1");
    }

    #[test]
    fn test_between() {
        let qb = Qb::between("age", 18i64, 30i64);
        let tokens = qb.binds().tokens();
        assert_eq!(qb.sql(), format!("age BETWEEN {} AND {}", tokens[0], tokens[1]));
    }

    #[test]
    fn test_empty_is_ignored_by_combinators() {
        let qb = Qb::empty().and(Qb::raw("1 = 1")).and(Qb::empty());
        assert_eq!(qb.sql(), "1 = 1");
        assert!(Qb::empty().is_empty());
    }
}
