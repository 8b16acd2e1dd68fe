//! 实体描述
//!
//! 实体类型通过 `#[derive(Entity)]` 提供静态描述：字段按声明顺序排列，
//! 每个字段可以带一个自定义列表达式（`#[entity(select = "...")]`）。

use crate::error::Result;
use crate::value::Record;

/// 字段元数据，由 derive(Entity) 生成
#[derive(Debug)]
pub struct FieldMeta {
    pub name: &'static str,
    /// 自定义查询表达式，例如 `"LOWER(email) AS email"`
    pub selection: Option<&'static str>,
}

/// 实体元数据，由 derive(Entity) 生成
#[derive(Debug)]
pub struct EntityMeta {
    /// 实体类型名
    pub name: &'static str,
    /// 字段列表（声明顺序）
    pub fields: &'static [FieldMeta],
    /// 是否为无类型记录
    pub untyped: bool,
}

impl EntityMeta {
    /// 计算投影：有别名时字段名前加 `<alias>.`，自定义表达式原样使用
    pub fn projection(&self, alias: Option<&str>) -> String {
        if self.untyped {
            return "*".to_string();
        }
        let prefix = alias
            .filter(|a| !a.is_empty())
            .map(|a| format!("{}.", a))
            .unwrap_or_default();
        self.fields
            .iter()
            .map(|field| match field.selection {
                Some(expr) => expr.to_string(),
                None => format!("{}{}", prefix, field.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 可从原始行还原的实体类型
pub trait Entity: Sized + Send + 'static {
    fn meta() -> &'static EntityMeta;

    fn from_record(record: Record) -> Result<Self>;
}

static RECORD_META: EntityMeta = EntityMeta {
    name: "Record",
    fields: &[],
    untyped: true,
};

impl Entity for Record {
    fn meta() -> &'static EntityMeta {
        &RECORD_META
    }

    fn from_record(record: Record) -> Result<Self> {
        Ok(record)
    }
}

/// 查询结果：强类型实体，或无法还原为实体时的原始行
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<E> {
    Entity(E),
    Raw(Record),
}

impl<E> Fetched<E> {
    pub fn entity(self) -> Option<E> {
        match self {
            Fetched::Entity(e) => Some(e),
            Fetched::Raw(_) => None,
        }
    }

    pub fn raw(self) -> Option<Record> {
        match self {
            Fetched::Raw(r) => Some(r),
            Fetched::Entity(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Fetched::Raw(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static USER_META: EntityMeta = EntityMeta {
        name: "User",
        fields: &[
            FieldMeta {
                name: "id",
                selection: None,
            },
            FieldMeta {
                name: "name",
                selection: None,
            },
        ],
        untyped: false,
    };

    #[test]
    fn test_projection_with_and_without_alias() {
        assert_eq!(USER_META.projection(Some("u")), "u.id, u.name");
        assert_eq!(USER_META.projection(None), "id, name");
        assert_eq!(USER_META.projection(Some("")), "id, name");
    }

    #[test]
    fn test_projection_uses_selection_override() {
        static META: EntityMeta = EntityMeta {
            name: "Account",
            fields: &[
                FieldMeta {
                    name: "id",
                    selection: None,
                },
                FieldMeta {
                    name: "email",
                    selection: Some("LOWER(email) AS email"),
                },
            ],
            untyped: false,
        };
        assert_eq!(META.projection(Some("a")), "a.id, LOWER(email) AS email");
    }

    #[test]
    fn test_record_is_untyped() {
        assert_eq!(Record::meta().projection(Some("u")), "*");
    }
}
