// ==========================================
// 制造执行系统 - 自定义钩子校验
// ==========================================

use std::fmt;

use crate::model::field::FieldDefinition;
use crate::model::hooks::{EntityHook, FieldHook};
use crate::model::outcome::ValidationOutcome;
use crate::model::value::FieldValue;
use crate::validators::{message_or, EntityValidator, FieldValidator, ValidationContext};

pub const ERROR_CUSTOM: &str = "core.validate.field.error.custom";
pub const ERROR_CUSTOM_ENTITY: &str = "core.validate.global.error.custom";

/// 字段自定义校验（空值不调用钩子）
#[derive(Clone)]
pub struct CustomValidator {
    name: String,
    hook: FieldHook,
    error_message: Option<String>,
}

impl CustomValidator {
    pub fn new(name: impl Into<String>, hook: FieldHook) -> Self {
        Self {
            name: name.into(),
            hook,
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for CustomValidator {
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
        if (self.hook)(field, value) {
            return true;
        }
        outcome.add_error(field.name(), message_or(&self.error_message, ERROR_CUSTOM, vec![]));
        false
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator").field("name", &self.name).finish()
    }
}

/// 实体自定义校验（失败时追加全局错误）
#[derive(Clone)]
pub struct CustomEntityValidator {
    name: String,
    hook: EntityHook,
    error_message: Option<String>,
}

impl CustomEntityValidator {
    pub fn new(name: impl Into<String>, hook: EntityHook) -> Self {
        Self {
            name: name.into(),
            hook,
            error_message: None,
        }
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl EntityValidator for CustomEntityValidator {
    fn validate(&self, ctx: &ValidationContext<'_>, outcome: &mut ValidationOutcome) -> bool {
        if (self.hook)(ctx.definition, ctx.entity) {
            return true;
        }
        outcome.add_global_error(message_or(&self.error_message, ERROR_CUSTOM_ENTITY, vec![]));
        false
    }
}

impl fmt::Debug for CustomEntityValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomEntityValidator")
            .field("name", &self.name)
            .finish()
    }
}
