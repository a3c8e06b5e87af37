// ==========================================
// 制造执行系统 - 字段取值
// ==========================================
// 职责: 动态实体字段的类型化取值（闭合枚举）
// 约束: 空值统一用 Option::None 表示，不设 Null 变体
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;

use crate::model::entity::EntityRef;
use crate::model::entity_list::EntityList;

/// 日期存储/展示格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 日期时间存储/展示格式
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// FieldValue - 字段取值
// ==========================================
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// 多对一关联（延迟加载）
    BelongsTo(EntityRef),
    /// 一对多关联（延迟加载）
    HasMany(EntityList),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            FieldValue::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            FieldValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    pub fn as_entity_ref(&self) -> Option<&EntityRef> {
        match self {
            FieldValue::BelongsTo(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_entity_list(&self) -> Option<&EntityList> {
        match self {
            FieldValue::HasMany(list) => Some(list),
            _ => None,
        }
    }

    /// 数值型取值的双精度表示（整数/小数）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// 变体名称（用于日志与错误提示）
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::BelongsTo(_) => "belongsTo",
            FieldValue::HasMany(_) => "hasMany",
        }
    }

    /// 比较两个取值
    ///
    /// # 规则
    /// - 同变体按自然顺序比较
    /// - 整数与小数之间按数值比较
    /// - 日期与日期时间之间按时间先后比较
    /// - 其余组合不可比较，返回 None
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(_), FieldValue::Decimal(_))
            | (FieldValue::Decimal(_), FieldValue::Integer(_)) => {
                Some(self.as_decimal()?.cmp(&other.as_decimal()?))
            }
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(_), FieldValue::DateTime(_))
            | (FieldValue::Date(_), FieldValue::DateTime(_))
            | (FieldValue::DateTime(_), FieldValue::Date(_)) => {
                Some(self.as_date_time()?.cmp(&other.as_date_time()?))
            }
            (FieldValue::BelongsTo(a), FieldValue::BelongsTo(b)) => Some(a.id().cmp(&b.id())),
            _ => None,
        }
    }

    /// 转换为 JSON 值（关联字段输出外键ID）
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Text(s) => serde_json::Value::String(s.clone()),
            FieldValue::Integer(i) => serde_json::Value::from(*i),
            FieldValue::Decimal(d) => serde_json::Value::String(d.normalize().to_string()),
            FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
            FieldValue::Date(d) => serde_json::Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::DateTime(dt) => {
                serde_json::Value::String(dt.format(DATE_TIME_FORMAT).to_string())
            }
            FieldValue::BelongsTo(r) => serde_json::Value::from(r.id()),
            FieldValue::HasMany(_) => serde_json::Value::Null,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Decimal(a), FieldValue::Decimal(b)) => a == b,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a == b,
            (FieldValue::BelongsTo(a), FieldValue::BelongsTo(b)) => a == b,
            (FieldValue::HasMany(a), FieldValue::HasMany(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => write!(f, "{}", d.normalize()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
            FieldValue::BelongsTo(r) => write!(f, "{}", r.id()),
            FieldValue::HasMany(list) => match list.parent_id() {
                Some(id) => write!(f, "{}[{}]", list.join_field(), id),
                None => write!(f, "{}[]", list.join_field()),
            },
        }
    }
}

// ==========================================
// 常用类型转换
// ==========================================

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<EntityRef> for FieldValue {
    fn from(value: EntityRef) -> Self {
        FieldValue::BelongsTo(value)
    }
}

impl From<EntityList> for FieldValue {
    fn from(value: EntityList) -> Self {
        FieldValue::HasMany(value)
    }
}
