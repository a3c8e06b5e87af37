// ==========================================
// 制造执行系统 - 正则校验
// ==========================================

use regex::Regex;

use crate::model::error::ModelResult;
use crate::model::field::FieldDefinition;
use crate::model::outcome::ValidationOutcome;
use crate::model::value::FieldValue;
use crate::validators::{message_or, FieldValidator, ValidationContext};

pub const ERROR_INVALID_FORMAT: &str = "core.validate.field.error.invalidFormat";

/// 取值的字符串形式必须整体匹配正则
#[derive(Debug, Clone)]
pub struct RegexValidator {
    pattern: String,
    regex: Regex,
    error_message: Option<String>,
}

impl RegexValidator {
    pub fn new(pattern: &str) -> ModelResult<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            error_message: None,
        })
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl FieldValidator for RegexValidator {
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
        if self.regex.is_match(&value.to_string()) {
            return true;
        }
        outcome.add_error(
            field.name(),
            message_or(&self.error_message, ERROR_INVALID_FORMAT, vec![self.pattern.clone()]),
        );
        false
    }
}
