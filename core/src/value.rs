//! 绑定值、原始行与绑定参数表

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// 绑定值，用于安全地传递参数，同时也是原始行中的列值
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum BindValue {
    String(String),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Float64(f64),
    Float32(f32),
    /// 定点数（NUMERIC / DECIMAL 以及超出 i64 的无符号整数）
    Decimal(BigDecimal),
    Bool(bool),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Null,
}

impl BindValue {
    pub fn is_null(&self) -> bool {
        matches!(self, BindValue::Null)
    }

    /// 以 SQL 字面量形式展示（仅用于日志，不用于拼接语句）
    pub fn to_sql_value(&self) -> String {
        match self {
            BindValue::String(s) => format!("'{}'", s.replace('\'', "''")),
            BindValue::Int64(i) => i.to_string(),
            BindValue::Int32(i) => i.to_string(),
            BindValue::Int16(i) => i.to_string(),
            BindValue::Float64(f) => f.to_string(),
            BindValue::Float32(f) => f.to_string(),
            BindValue::Decimal(d) => d.to_string(),
            BindValue::Bool(b) => b.to_string(),
            BindValue::Bytes(b) => format!("<{} bytes>", b.len()),
            BindValue::DateTime(dt) => format!("'{}'", dt),
            BindValue::Null => "NULL".to_string(),
        }
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::String(s)
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::String(s.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(i: i64) -> Self {
        BindValue::Int64(i)
    }
}

impl From<i32> for BindValue {
    fn from(i: i32) -> Self {
        BindValue::Int32(i)
    }
}

impl From<i16> for BindValue {
    fn from(i: i16) -> Self {
        BindValue::Int16(i)
    }
}

impl From<u32> for BindValue {
    fn from(i: u32) -> Self {
        BindValue::Int64(i as i64)
    }
}

impl From<u64> for BindValue {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(BindValue::Int64)
            .unwrap_or_else(|_| BindValue::Decimal(BigDecimal::from(i)))
    }
}

impl From<BigDecimal> for BindValue {
    fn from(d: BigDecimal) -> Self {
        BindValue::Decimal(d)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float64(f)
    }
}

impl From<f32> for BindValue {
    fn from(f: f32) -> Self {
        BindValue::Float32(f)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(b: Vec<u8>) -> Self {
        BindValue::Bytes(b)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(dt: NaiveDateTime) -> Self {
        BindValue::DateTime(dt)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => BindValue::Null,
        }
    }
}

/// 从列值转换为 Rust 类型，供实体映射使用
pub trait FromValue: Sized {
    fn from_value(value: BindValue) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &BindValue) -> String {
    format!("expected {}, got {:?}", expected, value)
}

/// 整数类型：接受任意宽度的整数列，越界时报错
macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: BindValue) -> Result<Self, String> {
                    let wide: i64 = match value {
                        BindValue::Int64(i) => i,
                        BindValue::Int32(i) => i as i64,
                        BindValue::Int16(i) => i as i64,
                        BindValue::Bool(b) => b as i64,
                        BindValue::Decimal(d) => match d.to_i64() {
                            Some(i) if d.is_integer() => i,
                            _ => return Err(format!("value {} out of range for {}", d, stringify!($ty))),
                        },
                        other => return Err(mismatch(stringify!($ty), &other)),
                    };
                    <$ty>::try_from(wide)
                        .map_err(|_| format!("value {} out of range for {}", wide, stringify!($ty)))
                }
            }
        )*
    };
}

impl_from_value_int!(i64, i32, i16);

impl FromValue for f64 {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::Float64(f) => Ok(f),
            BindValue::Float32(f) => Ok(f as f64),
            BindValue::Int64(i) => Ok(i as f64),
            BindValue::Int32(i) => Ok(i as f64),
            BindValue::Int16(i) => Ok(i as f64),
            BindValue::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| format!("value {} out of range for f64", d)),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: BindValue) -> Result<Self, String> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::Bool(b) => Ok(b),
            BindValue::Int64(i) => Ok(i != 0),
            BindValue::Int32(i) => Ok(i != 0),
            BindValue::Int16(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::String(s) => Ok(s),
            BindValue::Decimal(d) => Ok(d.to_string()),
            BindValue::Bytes(b) => String::from_utf8(b).map_err(|e| e.to_string()),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::Bytes(b) => Ok(b),
            BindValue::String(s) => Ok(s.into_bytes()),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::DateTime(dt) => Ok(dt),
            // SQLite 以文本形式保存时间
            BindValue::String(s) => NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|e| format!("invalid datetime '{}': {}", s, e)),
            other => Err(mismatch("NaiveDateTime", &other)),
        }
    }
}

impl FromValue for BigDecimal {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::Decimal(d) => Ok(d),
            BindValue::Int64(i) => Ok(BigDecimal::from(i)),
            BindValue::Int32(i) => Ok(BigDecimal::from(i)),
            BindValue::Int16(i) => Ok(BigDecimal::from(i)),
            BindValue::String(s) => s
                .parse::<BigDecimal>()
                .map_err(|e| format!("invalid decimal '{}': {}", s, e)),
            other => Err(mismatch("BigDecimal", &other)),
        }
    }
}

impl FromValue for BindValue {
    fn from_value(value: BindValue) -> Result<Self, String> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: BindValue) -> Result<Self, String> {
        match value {
            BindValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// 原始行（无类型记录），保持列顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, BindValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入列值；列已存在时原位替换
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<BindValue>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    /// 链式写入列值
    pub fn with(mut self, column: impl Into<String>, value: impl Into<BindValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&BindValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// 按位置读取列值
    pub fn get_index(&self, index: usize) -> Option<&BindValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    /// 取出列值并转换为目标类型；缺失的列按 NULL 处理
    pub fn take_as<T: FromValue>(&mut self, column: &str) -> crate::error::Result<T> {
        let value = match self.columns.iter().position(|(name, _)| name == column) {
            Some(pos) => self.columns.remove(pos).1,
            None => BindValue::Null,
        };
        T::from_value(value).map_err(|message| crate::error::RepositoryError::decode(column, message))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<BindValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.push(column, value);
        }
        record
    }
}

/// 可写入数据库的对象：实体或原始记录
pub trait ToRecord {
    fn to_record(&self) -> Record;
}

impl ToRecord for Record {
    fn to_record(&self) -> Record {
        self.clone()
    }
}

/// 占位符 → 绑定值 映射，按写入顺序保存
///
/// 同名占位符再次写入时原位覆盖（后写入者生效）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binds {
    entries: Vec<(String, BindValue)>,
}

impl Binds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<BindValue>) {
        let token = token.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    pub fn extend(&mut self, other: &Binds) {
        for (token, value) in &other.entries {
            self.insert(token.clone(), value.clone());
        }
    }

    pub fn get(&self, token: &str) -> Option<&BindValue> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, value)| value)
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindValue)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
