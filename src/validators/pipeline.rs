// ==========================================
// 制造执行系统 - 校验流水线
// ==========================================
// 流程:
// 1. 去掉数据定义中不存在的字段
// 2. 更新时只读字段保留已保存的值
// 3. 按字段类型转换取值（失败记一条错误，该字段不再执行校验器）
// 4. 多对一引用必须指向已存在的实体
// 5. 执行全部字段校验器与实体校验器（互不短路）
// ==========================================

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::model::definition::DataDefinition;
use crate::model::entity::Entity;
use crate::model::outcome::{ErrorMessage, ValidationOutcome};
use crate::model::types::FieldType;
use crate::model::value::FieldValue;
use crate::repository::data_access::DataAccess;
use crate::validators::ValidationContext;

pub const ERROR_REFERENCE_NOT_FOUND: &str = "core.validate.field.error.referenceNotFound";

/// 校验实体并就地完成字段类型转换
pub fn validate_entity(
    definition: &DataDefinition,
    entity: &mut Entity,
    existing: Option<&Entity>,
    access: Option<&dyn DataAccess>,
    locale: &str,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::new();
    let mut failed: HashSet<String> = HashSet::new();

    let unknown: Vec<String> = entity
        .fields()
        .keys()
        .filter(|name| definition.field(name).is_none())
        .cloned()
        .collect();
    for name in unknown {
        debug!(model = %definition.reference(), field = %name, "忽略未定义字段");
        entity.clear_field(&name);
    }

    for field in definition.fields() {
        let name = field.name();

        if field.is_read_only() {
            if let Some(existing) = existing {
                entity.set_field_opt(name, existing.field(name).cloned());
                continue;
            }
        }

        if matches!(field.field_type(), FieldType::HasMany { .. }) {
            continue;
        }

        let Some(raw) = entity.clear_field(name) else {
            continue;
        };
        let before = outcome.field_errors(name).len();
        let converted = field.field_type().to_object(field, &raw, locale, &mut outcome);
        if outcome.field_errors(name).len() > before {
            failed.insert(name.to_string());
        }
        entity.set_field_opt(name, converted);
    }

    if let Some(access) = access {
        check_references(definition, entity, access, &mut outcome, &mut failed);
    }

    let entity: &Entity = entity;
    let mut ctx = ValidationContext::new(definition, entity, locale).with_existing(existing);
    if let Some(access) = access {
        ctx = ctx.with_access(access);
    }

    for field in definition.fields() {
        if failed.contains(field.name()) {
            continue;
        }
        let value = entity.field(field.name());
        for validator in field.validators() {
            validator.validate(field, value, &ctx, &mut outcome);
        }
    }

    for validator in definition.entity_validators() {
        validator.validate(&ctx, &mut outcome);
    }

    if !outcome.is_valid() {
        debug!(
            model = %definition.reference(),
            errors = outcome.error_count(),
            "实体校验未通过"
        );
    }
    outcome
}

fn check_references(
    definition: &DataDefinition,
    entity: &Entity,
    access: &dyn DataAccess,
    outcome: &mut ValidationOutcome,
    failed: &mut HashSet<String>,
) {
    for field in definition.fields() {
        let Some(FieldValue::BelongsTo(reference)) = entity.field(field.name()) else {
            continue;
        };
        match access.get(reference.target(), reference.id()) {
            Ok(Some(_)) => {}
            Ok(None) => {
                outcome.add_error(
                    field.name(),
                    ErrorMessage::with_params(ERROR_REFERENCE_NOT_FOUND, [reference.id().to_string()]),
                );
                failed.insert(field.name().to_string());
            }
            Err(e) => {
                warn!(field = field.name(), error = %e, "关联实体查询失败");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldDefinition;
    use crate::validators::range::{RangeValidator, ERROR_OUT_OF_RANGE_TOO_LARGE};
    use crate::validators::required::ERROR_MISSING;
    use crate::model::types::ERROR_INVALID_NUMERIC_FORMAT;

    fn definition() -> DataDefinition {
        DataDefinition::builder("basic", "product")
            .field(FieldDefinition::new("name", FieldType::String).required())
            .field(
                FieldDefinition::new("quantity", FieldType::Integer)
                    .required()
                    .with_validator(RangeValidator::new(Some(1i64.into()), Some(10i64.into()), true)),
            )
            .field(FieldDefinition::new("code", FieldType::String).read_only())
            .build()
            .unwrap()
    }

    #[test]
    fn test_all_validators_run_without_short_circuit() {
        let definition = definition();
        let mut entity = definition.create();
        entity.set_field("quantity", "11");

        let outcome = validate_entity(&definition, &mut entity, None, None, "en");
        assert_eq!(outcome.field_errors("name")[0].key, ERROR_MISSING);
        assert_eq!(outcome.field_errors("quantity")[0].key, ERROR_OUT_OF_RANGE_TOO_LARGE);
        assert_eq!(entity.integer_field("quantity"), Some(11));
    }

    #[test]
    fn test_conversion_failure_skips_field_validators() {
        let definition = definition();
        let mut entity = definition.create();
        entity.set_field("name", "bolt");
        entity.set_field("quantity", "many");

        let outcome = validate_entity(&definition, &mut entity, None, None, "en");
        let keys: Vec<&str> = outcome
            .field_errors("quantity")
            .iter()
            .map(|m| m.key.as_str())
            .collect();
        assert_eq!(keys, vec![ERROR_INVALID_NUMERIC_FORMAT]);
        assert_eq!(entity.field("quantity"), None);
    }

    #[test]
    fn test_read_only_field_keeps_saved_value() {
        let definition = definition();
        let mut existing = Entity::with_id(definition.reference().clone(), 1);
        existing.set_field("code", "A-1");

        let mut entity = Entity::with_id(definition.reference().clone(), 1);
        entity.set_field("name", "bolt");
        entity.set_field("quantity", 3i64);
        entity.set_field("code", "changed");
        entity.set_field("unknown", "dropped");

        let outcome = validate_entity(&definition, &mut entity, Some(&existing), None, "en");
        assert!(outcome.is_valid());
        assert_eq!(entity.string_field("code"), Some("A-1"));
        assert!(!entity.contains_field("unknown"));
    }
}
