// ==========================================
// 制造执行系统 - 必填校验
// ==========================================

use crate::model::field::FieldDefinition;
use crate::model::outcome::ValidationOutcome;
use crate::model::value::FieldValue;
use crate::validators::{message_or, FieldValidator, ValidationContext};

pub const ERROR_MISSING: &str = "core.validate.field.error.missing";

/// 必填：取值不能为空
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    error_message: Option<String>,
}

impl RequiredValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for RequiredValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        _ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        if value.is_some() {
            return true;
        }
        outcome.add_error(field.name(), message_or(&self.error_message, ERROR_MISSING, vec![]));
        false
    }
}

/// 新建时必填：仅在实体尚无ID时要求取值
#[derive(Debug, Clone, Default)]
pub struct RequiredOnCreateValidator {
    error_message: Option<String>,
}

impl RequiredOnCreateValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for RequiredOnCreateValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        if !ctx.is_create() || value.is_some() {
            return true;
        }
        outcome.add_error(field.name(), message_or(&self.error_message, ERROR_MISSING, vec![]));
        false
    }
}
