// ==========================================
// 制造执行系统 - 唯一性校验
// ==========================================
// 职责: 同一数据定义下不得存在取值相同的其他实体
// 说明: 需要数据访问句柄；未提供时跳过
// ==========================================

use tracing::{debug, warn};

use crate::model::field::FieldDefinition;
use crate::model::outcome::ValidationOutcome;
use crate::model::value::FieldValue;
use crate::search::criteria::SearchCriteria;
use crate::search::restriction::{Restriction, RestrictionOperator, Restrictions};
use crate::validators::{message_or, FieldValidator, ValidationContext};

pub const ERROR_DUPLICATED: &str = "core.validate.field.error.duplicated";

#[derive(Debug, Clone, Default)]
pub struct UniqueValidator {
    error_message: Option<String>,
}

impl UniqueValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_message(mut self, key: impl Into<String>) -> Self {
        self.error_message = Some(key.into());
        self
    }
}

impl FieldValidator for UniqueValidator {
    fn validate(
        &self,
        field: &FieldDefinition,
        value: Option<&FieldValue>,
        ctx: &ValidationContext<'_>,
        outcome: &mut ValidationOutcome,
    ) -> bool {
        let (Some(value), Some(access)) = (value, ctx.access) else {
            return true;
        };

        let restriction = match value {
            FieldValue::BelongsTo(reference) => Restrictions::belongs_to(field.name(), reference.id()),
            other => Restriction::Compare {
                field: field.name().to_string(),
                operator: RestrictionOperator::Eq,
                value: other.clone(),
            },
        };
        let mut criteria = SearchCriteria::new(ctx.definition.reference().clone())
            .restricted_with(restriction)
            .with_max_results(1);
        if let Some(id) = ctx.entity.id() {
            criteria = criteria.restricted_with(Restrictions::id_restriction(id, RestrictionOperator::Ne));
        }

        match access.execute(&criteria) {
            Ok(result) if result.total_number_of_entities > 0 => {
                debug!(field = field.name(), value = %value, "唯一性校验失败");
                outcome.add_error(field.name(), message_or(&self.error_message, ERROR_DUPLICATED, vec![]));
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(field = field.name(), error = %e, "唯一性校验查询失败，跳过");
                true
            }
        }
    }
}
