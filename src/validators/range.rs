// ==========================================
// 制造执行系统 - 范围校验
// ==========================================
// 职责: 取值落在 [from, to]（含边界）或 (from, to)（不含边界）内
// 规则:
// - 空值总是通过
// - 按字段取值类别比较: 文本按字典序，数值按 f64，日期按时间先后，其余通过
// - 先检查下界，越界即返回，至多产生一条错误
// ==========================================

use std::cmp::Ordering;

use crate::model::field::FieldDefinition;
use crate::model::outcome::{ErrorMessage, ValidationOutcome};
use crate::model::types::ValueClass;
use crate::model::value::FieldValue;
use crate::validators::{FieldValidator, ValidationContext};

pub const ERROR_OUT_OF_RANGE_TOO_SMALL: &str = "core.validate.field.error.outOfRange.toSmall";
pub const ERROR_OUT_OF_RANGE_TOO_LARGE: &str = "core.validate.field.error.outOfRange.toLarge";

#[derive(Debug, Clone)]
pub struct RangeValidator {
    from: Option<FieldValue>,
    to: Option<FieldValue>,
    inclusive: bool,
    error_message: Option<String>,
}

impl RangeValidator {
    pub fn new(from: Option<FieldValue>, to: Option<FieldValue>, inclusive: bool) -> Self {
        Self {
            from,
            to,
            inclusive,
            error_message: None,
        }
    }

    /// 自定义消息键（同时替换下界/上界两个默认键）
    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }

    pub fn from(&self) -> Option<&FieldValue> {
        self.from.as_ref()
    }

    pub fn to(&self) -> Option<&FieldValue> {
        self.to.as_ref()
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    /// 按取值类别比较 value 与边界
    fn compare(class: ValueClass, value: &FieldValue, bound: &FieldValue) -> Option<Ordering> {
        match class {
            ValueClass::Text => Some(value.to_string().cmp(&bound.to_string())),
            ValueClass::Number => value.as_f64()?.partial_cmp(&bound.as_f64()?),
            ValueClass::Date => Some(value.as_date_time()?.cmp(&bound.as_date_time()?)),
            ValueClass::Boolean | ValueClass::Relation => None,
        }
    }

    fn too_small(&self, class: ValueClass, value: &FieldValue) -> bool {
        let Some(from) = &self.from else {
            return false;
        };
        match Self::compare(class, value, from) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => !self.inclusive,
            _ => false,
        }
    }

    fn too_large(&self, class: ValueClass, value: &FieldValue) -> bool {
        let Some(to) = &self.to else {
            return false;
        };
        match Self::compare(class, value, to) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => !self.inclusive,
            _ => false,
        }
    }

    fn error(&self, default_key: &str) -> ErrorMessage {
        let render = |bound: &Option<FieldValue>| bound.as_ref().map(|v| v.to_string()).unwrap_or_default();
        ErrorMessage::with_params(
            self.error_message.as_deref().unwrap_or(default_key),
            [render(&self.from), render(&self.to)],
        )
    }
}

impl FieldValidator for RangeValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        _ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        let Some(value) = value else {
            return true;
        };
        let class = field.field_type().value_class();

        if self.too_small(class, value) {
            outcome.add_error(field.name(), self.error(ERROR_OUT_OF_RANGE_TOO_SMALL));
            return false;
        }
        if self.too_large(class, value) {
            outcome.add_error(field.name(), self.error(ERROR_OUT_OF_RANGE_TOO_LARGE));
            return false;
        }
        true
    }
}
