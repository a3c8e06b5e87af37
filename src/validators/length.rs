// ==========================================
// 制造执行系统 - 长度/小数位/有效位校验
// ==========================================
// 三类校验共用 (min, is, max) 约束:
// - is 存在时只校验恰好相等
// - 否则先校验 min，再校验 max，至多产生一条错误
// ==========================================

use rust_decimal::Decimal;

use crate::model::field::FieldDefinition;
use crate::model::outcome::ValidationOutcome;
use crate::model::value::FieldValue;
use crate::validators::{message_or, FieldValidator, ValidationContext};

pub const ERROR_LENGTH_MIN: &str = "core.validate.field.error.invalidLength.min";
pub const ERROR_LENGTH_IS: &str = "core.validate.field.error.invalidLength.is";
pub const ERROR_LENGTH_MAX: &str = "core.validate.field.error.invalidLength.max";
pub const ERROR_SCALE_MIN: &str = "core.validate.field.error.invalidScale.min";
pub const ERROR_SCALE_IS: &str = "core.validate.field.error.invalidScale.is";
pub const ERROR_SCALE_MAX: &str = "core.validate.field.error.invalidScale.max";
pub const ERROR_PRECISION_MIN: &str = "core.validate.field.error.invalidPrecision.min";
pub const ERROR_PRECISION_IS: &str = "core.validate.field.error.invalidPrecision.is";
pub const ERROR_PRECISION_MAX: &str = "core.validate.field.error.invalidPrecision.max";

// ==========================================
// Bounds - (min, is, max) 约束
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub min: Option<u32>,
    pub is: Option<u32>,
    pub max: Option<u32>,
}

impl Bounds {
    pub fn new(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Self {
        Self { min, is, max }
    }

    /// 违反的约束：(选中的消息键, 约束值)
    fn violation<'k>(&self, actual: u32, keys: [&'k str; 3]) -> Option<(&'k str, u32)> {
        if let Some(is) = self.is {
            return (actual != is).then_some((keys[1], is));
        }
        if let Some(min) = self.min {
            if actual < min {
                return Some((keys[0], min));
            }
        }
        if let Some(max) = self.max {
            if actual > max {
                return Some((keys[2], max));
            }
        }
        None
    }
}

fn check(
    bounds: &Bounds,
    actual: u32,
    keys: [&str; 3],
    custom: &Option<String>,
    field: &FieldDefinition,
    outcome: &mut ValidationOutcome,
) -> bool {
    match bounds.violation(actual, keys) {
        Some((key, bound)) => {
            outcome.add_error(field.name(), message_or(custom, key, vec![bound.to_string()]));
            false
        }
        None => true,
    }
}

/// 小数位数（规范化后）
pub fn decimal_scale(value: &Decimal) -> u32 {
    value.normalize().scale()
}

/// 有效数字位数（规范化后，0 计为 1 位）
pub fn decimal_precision(value: &Decimal) -> u32 {
    let mantissa = value.normalize().mantissa().unsigned_abs();
    if mantissa == 0 {
        1
    } else {
        mantissa.to_string().len() as u32
    }
}

// ==========================================
// LengthValidator - 字符长度
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    bounds: Bounds,
    error_message: Option<String>,
}

impl LengthValidator {
    pub fn new(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Self {
        Self {
            bounds: Bounds::new(min, is, max),
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for LengthValidator {
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
        let length = match value {
            FieldValue::Text(text) => text.chars().count(),
            other => other.to_string().chars().count(),
        };
        check(
            &self.bounds,
            u32::try_from(length).unwrap_or(u32::MAX),
            [ERROR_LENGTH_MIN, ERROR_LENGTH_IS, ERROR_LENGTH_MAX],
            &self.error_message,
            field,
            outcome,
        )
    }
}

// ==========================================
// ScaleValidator - 小数位数
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ScaleValidator {
    bounds: Bounds,
    error_message: Option<String>,
}

impl ScaleValidator {
    pub fn new(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Self {
        Self {
            bounds: Bounds::new(min, is, max),
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for ScaleValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        _ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        let Some(decimal) = value.and_then(FieldValue::as_decimal) else {
            return true;
        };
        check(
            &self.bounds,
            decimal_scale(&decimal),
            [ERROR_SCALE_MIN, ERROR_SCALE_IS, ERROR_SCALE_MAX],
            &self.error_message,
            field,
            outcome,
        )
    }
}

// ==========================================
// PrecisionValidator - 有效数字位数
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PrecisionValidator {
    bounds: Bounds,
    error_message: Option<String>,
}

impl PrecisionValidator {
    pub fn new(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Self {
        Self {
            bounds: Bounds::new(min, is, max),
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for PrecisionValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        _ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        let Some(decimal) = value.and_then(FieldValue::as_decimal) else {
            return true;
        };
        check(
            &self.bounds,
            decimal_precision(&decimal),
            [ERROR_PRECISION_MIN, ERROR_PRECISION_IS, ERROR_PRECISION_MAX],
            &self.error_message,
            field,
            outcome,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::DataDefinition;
    use crate::model::types::FieldType;
    use std::str::FromStr;

    fn run(validator: &dyn FieldValidator, field_type: FieldType, value: FieldValue) -> ValidationOutcome {
        let definition = DataDefinition::builder("basic", "product")
            .field(FieldDefinition::new("value", field_type))
            .build()
            .unwrap();
        let entity = definition.create();
        let ctx = ValidationContext::new(&definition, &entity, "en");
        let mut outcome = ValidationOutcome::new();
        validator.validate(&definition.fields()[0], Some(&value), &ctx, &mut outcome);
        outcome
    }

    #[test]
    fn test_length_counts_characters() {
        let validator = LengthValidator::new(Some(2), None, Some(4));
        assert!(run(&validator, FieldType::String, FieldValue::from("żółw")).is_valid());

        let too_short = run(&validator, FieldType::String, FieldValue::from("a"));
        assert_eq!(too_short.field_errors("value")[0].key, ERROR_LENGTH_MIN);
        assert_eq!(too_short.field_errors("value")[0].params, vec!["2".to_string()]);

        let too_long = run(&validator, FieldType::String, FieldValue::from("abcde"));
        assert_eq!(too_long.field_errors("value")[0].key, ERROR_LENGTH_MAX);
    }

    #[test]
    fn test_length_exact_takes_precedence() {
        let validator = LengthValidator::new(Some(1), Some(3), Some(10));
        let outcome = run(&validator, FieldType::String, FieldValue::from("abcd"));
        assert_eq!(outcome.field_errors("value")[0].key, ERROR_LENGTH_IS);
        assert_eq!(outcome.error_count(), 1);
    }

    #[test]
    fn test_scale_and_precision() {
        let value = FieldValue::Decimal(Decimal::from_str("123.4500").unwrap());
        assert_eq!(decimal_scale(&Decimal::from_str("123.4500").unwrap()), 2);
        assert_eq!(decimal_precision(&Decimal::from_str("123.4500").unwrap()), 5);
        assert_eq!(decimal_precision(&Decimal::ZERO), 1);

        let scale = ScaleValidator::new(None, None, Some(1));
        assert_eq!(
            run(&scale, FieldType::Decimal, value.clone()).field_errors("value")[0].key,
            ERROR_SCALE_MAX
        );

        let precision = PrecisionValidator::new(Some(6), None, None);
        assert_eq!(
            run(&precision, FieldType::Decimal, value).field_errors("value")[0].key,
            ERROR_PRECISION_MIN
        );
    }
}
