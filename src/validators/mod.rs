// ==========================================
// 制造执行系统 - 校验器
// ==========================================
// 职责: 字段级/实体级校验器接口、内置校验器、校验流水线
// 说明: 校验器只向 ValidationOutcome 追加错误，不返回 Err
// ==========================================

use std::fmt;

use crate::model::definition::DataDefinition;
use crate::model::entity::Entity;
use crate::model::field::FieldDefinition;
use crate::model::outcome::{ErrorMessage, ValidationOutcome};
use crate::model::value::FieldValue;
use crate::repository::data_access::DataAccess;

pub mod custom;
pub mod factory;
pub mod length;
pub mod pattern;
pub mod pipeline;
pub mod range;
pub mod required;
pub mod unique;

pub use custom::{CustomEntityValidator, CustomValidator};
pub use factory::ValidatorFactory;
pub use length::{LengthValidator, PrecisionValidator, ScaleValidator};
pub use pattern::RegexValidator;
pub use pipeline::validate_entity;
pub use range::RangeValidator;
pub use required::{RequiredOnCreateValidator, RequiredValidator};
pub use unique::UniqueValidator;

// ==========================================
// ValidationContext - 校验上下文
// ==========================================
pub struct ValidationContext<'a> {
    pub definition: &'a DataDefinition,
    /// 待校验实体（字段已完成类型转换）
    pub entity: &'a Entity,
    /// 已保存版本（更新时存在）
    pub existing: Option<&'a Entity>,
    /// 数据访问（唯一性校验需要）
    pub access: Option<&'a dyn DataAccess>,
    pub locale: &'a str,
}

impl<'a> ValidationContext<'a> {
    pub fn new(definition: &'a DataDefinition, entity: &'a Entity, locale: &'a str) -> Self {
        Self {
            definition,
            entity,
            existing: None,
            access: None,
            locale,
        }
    }

    pub fn with_existing(mut self, existing: Option<&'a Entity>) -> Self {
        self.existing = existing;
        self
    }

    pub fn with_access(mut self, access: &'a dyn DataAccess) -> Self {
        self.access = Some(access);
        self
    }

    /// 是否为新建（实体尚无ID）
    pub fn is_create(&self) -> bool {
        self.entity.id().is_none()
    }
}

// ==========================================
// 校验器接口
// ==========================================

/// 字段级校验器
pub trait FieldValidator: Send + Sync + fmt::Debug {
    /// 校验字段取值，失败时向 outcome 追加错误并返回 false
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool;
}

/// 实体级校验器
pub trait EntityValidator: Send + Sync + fmt::Debug {
    fn validate(&self, ctx: &ValidationContext<'_>, outcome: &mut ValidationOutcome) -> bool;
}

/// 错误消息：自定义消息优先，否则使用默认键
pub(crate) fn message_or(
    custom: &Option<String>,
    default_key: &str,
    params: Vec<String>,
) -> ErrorMessage {
    ErrorMessage::with_params(custom.as_deref().unwrap_or(default_key), params)
}
