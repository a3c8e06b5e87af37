// ==========================================
// 制造执行系统 - 字段类型定义
// ==========================================
// 职责: 字段类型的可检索/可排序/可聚合标记、外部取值转换、展示格式化
// 说明: 类型为闭合枚举，模型构建时一次解析，运行期不做类型探测
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::i18n;
use crate::model::definition::DataDefinitionRef;
use crate::model::entity::EntityRef;
use crate::model::field::FieldDefinition;
use crate::model::outcome::{ErrorMessage, ValidationOutcome};
use crate::model::value::{FieldValue, DATE_FORMAT, DATE_TIME_FORMAT};

/// 短文本最大长度
pub const STRING_MAX_LENGTH: usize = 255;

/// 长文本最大长度
pub const TEXT_MAX_LENGTH: usize = 2048;

// ===== 消息键 =====
pub const ERROR_INVALID_DICTIONARY_ITEM: &str = "core.validate.field.error.invalidDictionaryItem";
pub const ERROR_INVALID_NUMERIC_FORMAT: &str = "core.validate.field.error.invalidNumericFormat";
pub const ERROR_INVALID_DATE_FORMAT: &str = "core.validate.field.error.invalidDateFormat";
pub const ERROR_INVALID_DATE_TIME_FORMAT: &str = "core.validate.field.error.invalidDateTimeFormat";
pub const ERROR_INVALID_BOOLEAN_FORMAT: &str = "core.validate.field.error.invalidBooleanFormat";
pub const ERROR_STRING_TOO_LONG: &str = "core.validate.field.error.stringIsTooLong";
pub const ERROR_WRONG_TYPE: &str = "core.validate.field.error.wrongType";

// ==========================================
// 一对多级联方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cascade {
    /// 删除父实体时清空子实体外键
    #[default]
    Nullify,
    /// 删除父实体时一并删除子实体
    Delete,
}

// ==========================================
// 取值类别（范围校验等按类别分派）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Text,
    Number,
    Date,
    Boolean,
    Relation,
}

// ==========================================
// FieldType - 字段类型
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// 短文本（最长 255 字符）
    String,
    /// 长文本（最长 2048 字符）
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    /// 字典枚举（固定有序取值集合）
    Enum(Vec<String>),
    BelongsTo {
        target: DataDefinitionRef,
        lazy: bool,
    },
    HasMany {
        target: DataDefinitionRef,
        join_field: String,
        cascade: Cascade,
    },
    /// 排序号（上移/下移），可限定在某个多对一字段范围内
    Priority {
        scope: Option<String>,
    },
}

impl FieldType {
    pub fn is_searchable(&self) -> bool {
        !matches!(self, FieldType::HasMany { .. })
    }

    pub fn is_orderable(&self) -> bool {
        !matches!(self, FieldType::HasMany { .. } | FieldType::Text)
    }

    pub fn is_aggregable(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Decimal | FieldType::Priority { .. }
        )
    }

    /// 取值类别
    pub fn value_class(&self) -> ValueClass {
        match self {
            FieldType::String | FieldType::Text | FieldType::Enum(_) => ValueClass::Text,
            FieldType::Integer | FieldType::Decimal | FieldType::Priority { .. } => {
                ValueClass::Number
            }
            FieldType::Date | FieldType::DateTime => ValueClass::Date,
            FieldType::Boolean => ValueClass::Boolean,
            FieldType::BelongsTo { .. } | FieldType::HasMany { .. } => ValueClass::Relation,
        }
    }

    /// 关联类型引用的数据定义
    pub fn referenced_definition(&self) -> Option<&DataDefinitionRef> {
        match self {
            FieldType::BelongsTo { target, .. } | FieldType::HasMany { target, .. } => {
                Some(target)
            }
            _ => None,
        }
    }

    /// 枚举类型的取值集合
    pub fn enum_values(&self) -> Option<&[String]> {
        match self {
            FieldType::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// 是否为文本类（表格过滤按前缀匹配）
    pub fn is_string_like(&self) -> bool {
        self.value_class() == ValueClass::Text
    }

    /// 将外部取值转换为字段声明的类型
    ///
    /// # 返回
    /// - Some(value): 转换成功
    /// - None: 空值（枚举除外），或转换失败（失败时在 outcome 上恰好追加一条字段错误）
    pub fn to_object(
        &self,
        field: &FieldDefinition,
        value: &FieldValue,
        locale: &str,
        outcome: &mut ValidationOutcome,
    ) -> Option<FieldValue> {
        match self.convert(value, locale) {
            Ok(converted) => converted,
            Err(message) => {
                outcome.add_error(field.name(), message);
                None
            }
        }
    }

    /// 转换取值，不记录到校验结果（查询条件取值转换使用）
    pub fn coerce(&self, value: &FieldValue, locale: &str) -> Result<Option<FieldValue>, ErrorMessage> {
        self.convert(value, locale)
    }

    /// 从字符串解析（区域相关）
    ///
    /// 空白字符串视为空值
    pub fn from_string(&self, text: &str, locale: &str) -> Result<Option<FieldValue>, ErrorMessage> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.parse_text(text, locale).map(Some)
    }

    /// 展示用字符串（区域相关）
    pub fn to_display_string(&self, value: &FieldValue, locale: &str) -> String {
        match (self, value) {
            (_, FieldValue::Decimal(d)) => {
                localize_decimal(&d.normalize().to_string(), locale)
            }
            (_, FieldValue::Boolean(b)) => if *b { "1" } else { "0" }.to_string(),
            (_, FieldValue::HasMany(_)) => String::new(),
            _ => value.to_string(),
        }
    }

    fn convert(&self, value: &FieldValue, locale: &str) -> Result<Option<FieldValue>, ErrorMessage> {
        // 枚举不做空白转空值：空白同样必须是声明的取值
        if let FieldValue::Text(text) = value {
            if text.trim().is_empty() && !matches!(self, FieldType::Enum(_)) {
                return Ok(None);
            }
        }

        match self {
            FieldType::String => self.convert_text(value, STRING_MAX_LENGTH),
            FieldType::Text => self.convert_text(value, TEXT_MAX_LENGTH),
            FieldType::Integer | FieldType::Priority { .. } => match value {
                FieldValue::Integer(_) => Ok(Some(value.clone())),
                FieldValue::Decimal(d) if d.fract().is_zero() => d
                    .to_i64()
                    .map(|i| Some(FieldValue::Integer(i)))
                    .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_NUMERIC_FORMAT)),
                FieldValue::Decimal(_) => Err(ErrorMessage::new(ERROR_INVALID_NUMERIC_FORMAT)),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                other => Err(wrong_type(other)),
            },
            FieldType::Decimal => match value {
                FieldValue::Decimal(_) => Ok(Some(value.clone())),
                FieldValue::Integer(i) => Ok(Some(FieldValue::Decimal(Decimal::from(*i)))),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                other => Err(wrong_type(other)),
            },
            FieldType::Boolean => match value {
                FieldValue::Boolean(_) => Ok(Some(value.clone())),
                FieldValue::Integer(0) => Ok(Some(FieldValue::Boolean(false))),
                FieldValue::Integer(1) => Ok(Some(FieldValue::Boolean(true))),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                _ => Err(ErrorMessage::new(ERROR_INVALID_BOOLEAN_FORMAT)),
            },
            FieldType::Date => match value {
                FieldValue::Date(_) => Ok(Some(value.clone())),
                FieldValue::DateTime(dt) => Ok(Some(FieldValue::Date(dt.date()))),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                _ => Err(ErrorMessage::new(ERROR_INVALID_DATE_FORMAT)),
            },
            FieldType::DateTime => match value {
                FieldValue::DateTime(_) => Ok(Some(value.clone())),
                FieldValue::Date(_) => Ok(value.as_date_time().map(FieldValue::DateTime)),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                _ => Err(ErrorMessage::new(ERROR_INVALID_DATE_TIME_FORMAT)),
            },
            FieldType::Enum(values) => {
                let candidate = match value {
                    FieldValue::Text(text) => text.clone(),
                    other => other.to_string(),
                };
                if values.contains(&candidate) {
                    Ok(Some(FieldValue::Text(candidate)))
                } else {
                    Err(ErrorMessage::with_params(
                        ERROR_INVALID_DICTIONARY_ITEM,
                        [format!("[{}]", values.join(", "))],
                    ))
                }
            }
            FieldType::BelongsTo { target, .. } => match value {
                FieldValue::BelongsTo(r) if r.target() == target => Ok(Some(value.clone())),
                FieldValue::Integer(id) => Ok(Some(FieldValue::BelongsTo(EntityRef::new(
                    target.clone(),
                    *id,
                )))),
                FieldValue::Text(text) => self.parse_text(text, locale).map(Some),
                other => Err(wrong_type(other)),
            },
            FieldType::HasMany { .. } => match value {
                FieldValue::HasMany(_) => Ok(Some(value.clone())),
                other => Err(wrong_type(other)),
            },
        }
    }

    fn convert_text(&self, value: &FieldValue, max_length: usize) -> Result<Option<FieldValue>, ErrorMessage> {
        let text = match value {
            FieldValue::Text(text) => text.clone(),
            FieldValue::BelongsTo(_) | FieldValue::HasMany(_) => return Err(wrong_type(value)),
            other => other.to_string(),
        };
        if text.chars().count() > max_length {
            return Err(ErrorMessage::with_params(
                ERROR_STRING_TOO_LONG,
                [max_length.to_string()],
            ));
        }
        Ok(Some(FieldValue::Text(text)))
    }

    fn parse_text(&self, text: &str, locale: &str) -> Result<FieldValue, ErrorMessage> {
        let trimmed = text.trim();
        match self {
            FieldType::String | FieldType::Text => {
                self.convert_text(&FieldValue::Text(text.to_string()), self.max_length())
                    .map(|v| v.unwrap_or_else(|| FieldValue::Text(String::new())))
            }
            FieldType::Enum(_) => self
                .convert(&FieldValue::Text(text.to_string()), locale)
                .map(|v| v.unwrap_or_else(|| FieldValue::Text(String::new()))),
            FieldType::Integer | FieldType::Priority { .. } => parse_integer(trimmed)
                .map(FieldValue::Integer)
                .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_NUMERIC_FORMAT)),
            FieldType::Decimal => parse_decimal(trimmed, locale)
                .map(FieldValue::Decimal)
                .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_NUMERIC_FORMAT)),
            FieldType::Boolean => parse_boolean(trimmed)
                .map(FieldValue::Boolean)
                .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_BOOLEAN_FORMAT)),
            FieldType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| ErrorMessage::new(ERROR_INVALID_DATE_FORMAT)),
            FieldType::DateTime => parse_date_time(trimmed)
                .map(FieldValue::DateTime)
                .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_DATE_TIME_FORMAT)),
            FieldType::BelongsTo { target, .. } => parse_integer(trimmed)
                .map(|id| FieldValue::BelongsTo(EntityRef::new(target.clone(), id)))
                .ok_or_else(|| ErrorMessage::new(ERROR_INVALID_NUMERIC_FORMAT)),
            FieldType::HasMany { .. } => Err(ErrorMessage::with_params(
                ERROR_WRONG_TYPE,
                ["hasMany"],
            )),
        }
    }

    fn max_length(&self) -> usize {
        match self {
            FieldType::Text => TEXT_MAX_LENGTH,
            _ => STRING_MAX_LENGTH,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Text => write!(f, "text"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Decimal => write!(f, "decimal"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Enum(_) => write!(f, "enum"),
            FieldType::BelongsTo { target, .. } => write!(f, "belongsTo({})", target),
            FieldType::HasMany { target, .. } => write!(f, "hasMany({})", target),
            FieldType::Priority { .. } => write!(f, "priority"),
        }
    }
}

// ==========================================
// 解析辅助函数
// ==========================================

fn wrong_type(value: &FieldValue) -> ErrorMessage {
    ErrorMessage::with_params(ERROR_WRONG_TYPE, [value.type_name()])
}

fn parse_integer(text: &str) -> Option<i64> {
    text.parse::<i64>().ok()
}

/// 解析小数：接受 '.'，以及当前语言的小数分隔符
fn parse_decimal(text: &str, locale: &str) -> Option<Decimal> {
    let separator = i18n::decimal_separator(locale);
    let normalized = if separator == '.' {
        text.to_string()
    } else {
        text.replace(separator, ".")
    };
    Decimal::from_str(&normalized).ok()
}

fn parse_boolean(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn localize_decimal(text: &str, locale: &str) -> String {
    let separator = i18n::decimal_separator(locale);
    if separator == '.' {
        text.to_string()
    } else {
        text.replace('.', &separator.to_string())
    }
}
