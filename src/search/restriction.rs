// ==========================================
// 制造执行系统 - 查询限制条件
// ==========================================
// 职责: 条件查询的限制条件表示、构造、按字段类型转换取值
// 说明: 字段名可为 "relation.field"（一层多对一跳转）
// ==========================================

use std::cmp::Ordering;
use std::fmt;

use crate::model::types::FieldType;
use crate::model::value::FieldValue;

/// 模糊匹配通配符
pub const WILDCARD: char = '*';

// ==========================================
// RestrictionOperator - 比较运算符
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RestrictionOperator {
    /// SQL 运算符
    pub fn as_sql(&self) -> &'static str {
        match self {
            RestrictionOperator::Eq => "=",
            RestrictionOperator::Ne => "<>",
            RestrictionOperator::Lt => "<",
            RestrictionOperator::Le => "<=",
            RestrictionOperator::Gt => ">",
            RestrictionOperator::Ge => ">=",
        }
    }

    /// 比较结果是否满足运算符
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            RestrictionOperator::Eq => ordering == Ordering::Equal,
            RestrictionOperator::Ne => ordering != Ordering::Equal,
            RestrictionOperator::Lt => ordering == Ordering::Less,
            RestrictionOperator::Le => ordering != Ordering::Greater,
            RestrictionOperator::Gt => ordering == Ordering::Greater,
            RestrictionOperator::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for RestrictionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

// ==========================================
// Restriction - 限制条件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    /// 字段比较（=, <>, <, <=, >, >=）
    Compare {
        field: String,
        operator: RestrictionOperator,
        value: FieldValue,
    },
    /// 通配符匹配（'*' 匹配任意字符序列，忽略大小写）
    Like { field: String, pattern: String },
    IsNull { field: String },
    IsNotNull { field: String },
    /// 多对一字段指向指定ID
    BelongsTo { field: String, id: i64 },
    /// 实体ID比较
    Id {
        operator: RestrictionOperator,
        id: i64,
    },
}

impl Restriction {
    /// 限制条件涉及的字段（ID 条件返回 None）
    pub fn field(&self) -> Option<&str> {
        match self {
            Restriction::Compare { field, .. }
            | Restriction::Like { field, .. }
            | Restriction::IsNull { field }
            | Restriction::IsNotNull { field }
            | Restriction::BelongsTo { field, .. } => Some(field),
            Restriction::Id { .. } => None,
        }
    }

    /// 按字段类型转换条件取值
    ///
    /// # 返回
    /// - Some(restriction): 可执行的条件
    /// - None: 取值无法转换为字段类型（该查询结果为空）
    pub fn coerce(self, field_type: &FieldType, locale: &str) -> Option<Restriction> {
        match self {
            Restriction::Compare {
                field,
                operator,
                value,
            } => match field_type.coerce(&value, locale) {
                Ok(Some(value)) => Some(Restriction::Compare {
                    field,
                    operator,
                    value,
                }),
                Ok(None) => match operator {
                    RestrictionOperator::Eq => Some(Restriction::IsNull { field }),
                    RestrictionOperator::Ne => Some(Restriction::IsNotNull { field }),
                    _ => None,
                },
                Err(_) => None,
            },
            Restriction::Like { field, pattern } => {
                if field_type.is_string_like() {
                    Some(Restriction::Like { field, pattern })
                } else {
                    let plain: String = pattern.chars().filter(|c| *c != WILDCARD).collect();
                    Restriction::Compare {
                        field,
                        operator: RestrictionOperator::Eq,
                        value: FieldValue::Text(plain),
                    }
                    .coerce(field_type, locale)
                }
            }
            other => Some(other),
        }
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Restriction::Compare {
                field,
                operator,
                value,
            } => write!(f, "{} {} {}", field, operator, value),
            Restriction::Like { field, pattern } => write!(f, "{} like {}", field, pattern),
            Restriction::IsNull { field } => write!(f, "{} is null", field),
            Restriction::IsNotNull { field } => write!(f, "{} is not null", field),
            Restriction::BelongsTo { field, id } => write!(f, "{}.id = {}", field, id),
            Restriction::Id { operator, id } => write!(f, "id {} {}", operator, id),
        }
    }
}

// ==========================================
// Restrictions - 限制条件构造函数
// ==========================================
pub struct Restrictions;

impl Restrictions {
    /// 相等；文本取值含 '*' 时转为通配符匹配
    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Restriction {
        match value.into() {
            FieldValue::Text(text) if text.contains(WILDCARD) => Restriction::Like {
                field: field.to_string(),
                pattern: text,
            },
            value => Self::compare(field, RestrictionOperator::Eq, value),
        }
    }

    pub fn ne(field: &str, value: impl Into<FieldValue>) -> Restriction {
        Self::compare(field, RestrictionOperator::Ne, value.into())
    }

    pub fn lt(field: &str, value: impl Into<FieldValue>) -> Restriction {
        Self::compare(field, RestrictionOperator::Lt, value.into())
    }

    pub fn le(field: &str, value: impl Into<FieldValue>) -> Restriction {
        Self::compare(field, RestrictionOperator::Le, value.into())
    }

    pub fn gt(field: &str, value: impl Into<FieldValue>) -> Restriction {
        Self::compare(field, RestrictionOperator::Gt, value.into())
    }

    pub fn ge(field: &str, value: impl Into<FieldValue>) -> Restriction {
        Self::compare(field, RestrictionOperator::Ge, value.into())
    }

    pub fn like(field: &str, pattern: impl Into<String>) -> Restriction {
        Restriction::Like {
            field: field.to_string(),
            pattern: pattern.into(),
        }
    }

    pub fn is_null(field: &str) -> Restriction {
        Restriction::IsNull {
            field: field.to_string(),
        }
    }

    pub fn is_not_null(field: &str) -> Restriction {
        Restriction::IsNotNull {
            field: field.to_string(),
        }
    }

    pub fn belongs_to(field: &str, id: i64) -> Restriction {
        Restriction::BelongsTo {
            field: field.to_string(),
            id,
        }
    }

    pub fn id_restriction(id: i64, operator: RestrictionOperator) -> Restriction {
        Restriction::Id { operator, id }
    }

    fn compare(field: &str, operator: RestrictionOperator, value: FieldValue) -> Restriction {
        Restriction::Compare {
            field: field.to_string(),
            operator,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_eq_with_wildcard_becomes_like() {
        assert_eq!(
            Restrictions::eq("name", "bo*"),
            Restriction::Like {
                field: "name".to_string(),
                pattern: "bo*".to_string()
            }
        );
        assert!(matches!(
            Restrictions::eq("name", "bolt"),
            Restriction::Compare {
                operator: RestrictionOperator::Eq,
                ..
            }
        ));
    }

    #[test]
    fn test_coerce_text_to_integer() {
        let coerced = Restrictions::eq("quantity", "12").coerce(&FieldType::Integer, "en");
        assert_eq!(coerced, Some(Restrictions::eq("quantity", 12i64)));

        assert_eq!(
            Restrictions::gt("quantity", "abc").coerce(&FieldType::Integer, "en"),
            None
        );
    }

    #[test]
    fn test_coerce_like_on_numeric_field_strips_wildcard() {
        let coerced = Restrictions::like("weight", "1.5*").coerce(&FieldType::Decimal, "en");
        assert_eq!(
            coerced,
            Some(Restrictions::eq("weight", Decimal::new(15, 1)))
        );
    }

    #[test]
    fn test_operator_matches() {
        assert!(RestrictionOperator::Le.matches(Ordering::Equal));
        assert!(RestrictionOperator::Ne.matches(Ordering::Less));
        assert!(!RestrictionOperator::Gt.matches(Ordering::Equal));
    }
}
