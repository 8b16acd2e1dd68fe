//! SQL 片段容器

use crate::value::Binds;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 片段名称，顺序即拼装顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Part {
    /// 投影（`option`）
    Select,
    /// 表别名（`as`）
    As,
    Join,
    Where,
    Group,
    Having,
    Order,
    Limit,
    Offset,
    /// 锁定子句等尾部片段（`for`）
    For,
    Binds,
}

impl Part {
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Select => "option",
            Part::As => "as",
            Part::Join => "join",
            Part::Where => "where",
            Part::Group => "group",
            Part::Having => "having",
            Part::Order => "order",
            Part::Limit => "limit",
            Part::Offset => "offset",
            Part::For => "for",
            Part::Binds => "binds",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Part {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "option" => Ok(Part::Select),
            "as" => Ok(Part::As),
            "join" => Ok(Part::Join),
            "where" => Ok(Part::Where),
            "group" => Ok(Part::Group),
            "having" => Ok(Part::Having),
            "order" => Ok(Part::Order),
            "limit" => Ok(Part::Limit),
            "offset" => Ok(Part::Offset),
            "for" => Ok(Part::For),
            "binds" => Ok(Part::Binds),
            other => Err(format!("unknown sql part: {}", other)),
        }
    }
}

/// 片段值
#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    Number(u64),
    Binds(Binds),
}

impl PartValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PartValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            PartValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_binds(&self) -> Option<&Binds> {
        match self {
            PartValue::Binds(b) => Some(b),
            _ => None,
        }
    }
}

/// 每个片段名至多一个值；再次写入同名片段会覆盖
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParts {
    parts: BTreeMap<Part, PartValue>,
}

impl SqlParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, part: Part, text: impl Into<String>) {
        self.parts.insert(part, PartValue::Text(text.into()));
    }

    pub fn set_number(&mut self, part: Part, n: u64) {
        self.parts.insert(part, PartValue::Number(n));
    }

    pub fn get(&self, part: Part) -> Option<&PartValue> {
        self.parts.get(&part)
    }

    pub fn text(&self, part: Part) -> Option<&str> {
        self.get(part).and_then(PartValue::as_text)
    }

    pub fn number(&self, part: Part) -> Option<u64> {
        self.get(part).and_then(PartValue::as_number)
    }

    /// 追加文本片段，已有内容时以空格分隔
    pub fn append_text(&mut self, part: Part, text: &str) {
        match self.parts.get_mut(&part) {
            Some(PartValue::Text(existing)) => {
                existing.push(' ');
                existing.push_str(text);
            }
            _ => self.set_text(part, text),
        }
    }

    /// 合并绑定值（同名占位符后写入者生效）
    pub fn merge_binds(&mut self, binds: &Binds) {
        if binds.is_empty() {
            return;
        }
        match self.parts.get_mut(&Part::Binds) {
            Some(PartValue::Binds(existing)) => existing.extend(binds),
            _ => {
                self.parts.insert(Part::Binds, PartValue::Binds(binds.clone()));
            }
        }
    }

    /// 确保绑定值片段存在（可以为空），`where` 写入后总会占用一个片段
    pub fn ensure_binds(&mut self) {
        self.parts
            .entry(Part::Binds)
            .or_insert_with(|| PartValue::Binds(Binds::new()));
    }

    pub fn binds(&self) -> Binds {
        self.get(Part::Binds)
            .and_then(PartValue::as_binds)
            .cloned()
            .unwrap_or_default()
    }

    pub fn remove(&mut self, part: Part) -> Option<PartValue> {
        self.parts.remove(&part)
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }

    pub fn contains(&self, part: Part) -> bool {
        self.parts.contains_key(&part)
    }

    /// 已填充的片段数（绑定值算作一个片段）
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
