// ==========================================
// 制造执行系统 - 校验器工厂
// ==========================================
// 职责: 统一创建内置校验器（代码构建模型与声明式配置共用）
// ==========================================

use crate::model::error::ModelResult;
use crate::model::hooks::{EntityHook, FieldHook};
use crate::model::value::FieldValue;
use crate::validators::{
    CustomEntityValidator, CustomValidator, EntityValidator, FieldValidator, LengthValidator,
    PrecisionValidator, RangeValidator, RegexValidator, RequiredOnCreateValidator,
    RequiredValidator, ScaleValidator, UniqueValidator,
};

pub struct ValidatorFactory;

impl ValidatorFactory {
    pub fn required() -> Box<dyn FieldValidator> {
        Box::new(RequiredValidator::new())
    }

    pub fn required_on_create() -> Box<dyn FieldValidator> {
        Box::new(RequiredOnCreateValidator::new())
    }

    pub fn unique() -> Box<dyn FieldValidator> {
        Box::new(UniqueValidator::new())
    }

    pub fn length(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Box<dyn FieldValidator> {
        Box::new(LengthValidator::new(min, is, max))
    }

    pub fn scale(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Box<dyn FieldValidator> {
        Box::new(ScaleValidator::new(min, is, max))
    }

    pub fn precision(min: Option<u32>, is: Option<u32>, max: Option<u32>) -> Box<dyn FieldValidator> {
        Box::new(PrecisionValidator::new(min, is, max))
    }

    pub fn range(from: Option<FieldValue>, to: Option<FieldValue>, inclusive: bool) -> Box<dyn FieldValidator> {
        Box::new(RangeValidator::new(from, to, inclusive))
    }

    pub fn regex(pattern: &str) -> ModelResult<Box<dyn FieldValidator>> {
        Ok(Box::new(RegexValidator::new(pattern)?))
    }

    pub fn custom(name: &str, hook: FieldHook) -> Box<dyn FieldValidator> {
        Box::new(CustomValidator::new(name, hook))
    }

    pub fn custom_entity(name: &str, hook: EntityHook) -> Box<dyn EntityValidator> {
        Box::new(CustomEntityValidator::new(name, hook))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::DataDefinition;
    use crate::model::entity::Entity;
    use crate::model::field::FieldDefinition;
    use crate::model::types::FieldType;
    use crate::validators::pipeline::validate_entity;
    use std::sync::Arc;

    #[test]
    fn test_factory_validators_run_in_pipeline() {
        let definition = DataDefinition::builder("basic", "unit")
            .field(
                FieldDefinition::new("code", FieldType::String)
                    .with_boxed_validator(ValidatorFactory::required())
                    .with_boxed_validator(ValidatorFactory::length(None, None, Some(3)))
                    .with_boxed_validator(ValidatorFactory::regex("^[A-Z]+$").unwrap()),
            )
            .field(
                FieldDefinition::new("ratio", FieldType::Integer)
                    .with_boxed_validator(ValidatorFactory::range(Some(1i64.into()), None, true)),
            )
            .boxed_entity_validator(ValidatorFactory::custom_entity(
                "never",
                Arc::new(|_: &DataDefinition, _: &Entity| false),
            ))
            .build()
            .unwrap();

        let mut entity = Entity::new(definition.reference().clone());
        entity.set_field("code", "abcd");
        entity.set_field("ratio", "0");
        let outcome = validate_entity(&definition, &mut entity, None, None, "en");

        let keys: Vec<&str> = outcome.field_errors("code").iter().map(|m| m.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "core.validate.field.error.invalidLength.max",
                "core.validate.field.error.invalidFormat"
            ]
        );
        assert_eq!(outcome.field_errors("ratio").len(), 1);
        assert_eq!(outcome.global_errors().len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(ValidatorFactory::regex("([a-z").is_err());
    }
}
