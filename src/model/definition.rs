// ==========================================
// 制造执行系统 - 数据定义
// ==========================================
// 职责: 描述一种实体类型（有序字段、实体级校验器、保存钩子）
// 约束: 注册后只读，进程内每种实体类型仅一份（Arc 共享）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::entity::Entity;
use crate::model::error::{ModelError, ModelResult};
use crate::model::field::FieldDefinition;
use crate::model::hooks::SaveHook;
use crate::model::types::FieldType;
use crate::validators::EntityValidator;

// ==========================================
// DataDefinitionRef - 数据定义标识（插件 + 模型名）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataDefinitionRef {
    pub plugin: String,
    pub name: String,
}

impl DataDefinitionRef {
    pub fn new(plugin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DataDefinitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plugin, self.name)
    }
}

// ==========================================
// DataDefinition - 数据定义
// ==========================================
pub struct DataDefinition {
    reference: DataDefinitionRef,
    fields: Vec<FieldDefinition>,
    entity_validators: Vec<Box<dyn EntityValidator>>,
    create_hooks: Vec<SaveHook>,
    update_hooks: Vec<SaveHook>,
    save_hooks: Vec<SaveHook>,
}

impl DataDefinition {
    pub fn builder(plugin: impl Into<String>, name: impl Into<String>) -> DataDefinitionBuilder {
        DataDefinitionBuilder {
            definition: DataDefinition {
                reference: DataDefinitionRef::new(plugin, name),
                fields: Vec::new(),
                entity_validators: Vec::new(),
                create_hooks: Vec::new(),
                update_hooks: Vec::new(),
                save_hooks: Vec::new(),
            },
        }
    }

    pub fn reference(&self) -> &DataDefinitionRef {
        &self.reference
    }

    pub fn plugin_identifier(&self) -> &str {
        &self.reference.plugin
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    /// 字段（按声明顺序）
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub(crate) fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// 查询字段，不存在时返回错误
    pub fn try_field(&self, name: &str) -> ModelResult<&FieldDefinition> {
        self.field(name).ok_or_else(|| ModelError::UnknownField {
            model: self.reference.to_string(),
            field: name.to_string(),
        })
    }

    /// 排序号字段（至多一个）
    pub fn priority_field(&self) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|f| matches!(f.field_type(), FieldType::Priority { .. }))
    }

    /// 持久化列对应的字段
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_stored())
    }

    pub fn entity_validators(&self) -> &[Box<dyn EntityValidator>] {
        &self.entity_validators
    }

    /// 创建新实体（填充默认值）
    pub fn create(&self) -> Entity {
        let mut entity = Entity::new(self.reference.clone());
        for field in &self.fields {
            if let Some(default) = field.default_value() {
                entity.set_field(field.name(), default.clone());
            }
        }
        entity
    }

    // ===== 钩子调用 =====

    pub(crate) fn call_create_hooks(&self, entity: &mut Entity) {
        for hook in &self.create_hooks {
            hook(self, entity);
        }
    }

    pub(crate) fn call_update_hooks(&self, entity: &mut Entity) {
        for hook in &self.update_hooks {
            hook(self, entity);
        }
    }

    pub(crate) fn call_save_hooks(&self, entity: &mut Entity) {
        for hook in &self.save_hooks {
            hook(self, entity);
        }
    }
}

impl fmt::Debug for DataDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataDefinition")
            .field("reference", &self.reference)
            .field("fields", &self.fields)
            .field("entity_validators", &self.entity_validators.len())
            .finish()
    }
}

// ==========================================
// DataDefinitionBuilder
// ==========================================
pub struct DataDefinitionBuilder {
    definition: DataDefinition,
}

impl DataDefinitionBuilder {
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.definition.fields.push(field);
        self
    }

    pub fn entity_validator(mut self, validator: impl EntityValidator + 'static) -> Self {
        self.definition.entity_validators.push(Box::new(validator));
        self
    }

    pub fn boxed_entity_validator(mut self, validator: Box<dyn EntityValidator>) -> Self {
        self.definition.entity_validators.push(validator);
        self
    }

    pub fn on_create(mut self, hook: SaveHook) -> Self {
        self.definition.create_hooks.push(hook);
        self
    }

    pub fn on_update(mut self, hook: SaveHook) -> Self {
        self.definition.update_hooks.push(hook);
        self
    }

    pub fn on_save(mut self, hook: SaveHook) -> Self {
        self.definition.save_hooks.push(hook);
        self
    }

    /// 完成构建
    ///
    /// # 检查
    /// - 字段名不重复，且不得为保留名 `id`
    /// - 排序号字段至多一个，范围字段必须是多对一字段
    pub fn build(self) -> ModelResult<DataDefinition> {
        let definition = self.definition;
        let model = definition.reference.to_string();

        for (index, field) in definition.fields.iter().enumerate() {
            if field.name() == "id" {
                return Err(ModelError::InvalidSchema(format!(
                    "{}: 字段名 id 为保留名",
                    model
                )));
            }
            if definition.fields[..index]
                .iter()
                .any(|f| f.name() == field.name())
            {
                return Err(ModelError::InvalidSchema(format!(
                    "{}: 字段 {} 重复定义",
                    model,
                    field.name()
                )));
            }
        }

        let priorities: Vec<&FieldDefinition> = definition
            .fields
            .iter()
            .filter(|f| matches!(f.field_type(), FieldType::Priority { .. }))
            .collect();
        if priorities.len() > 1 {
            return Err(ModelError::InvalidSchema(format!(
                "{}: 排序号字段至多一个",
                model
            )));
        }
        if let Some(FieldType::Priority { scope: Some(scope) }) =
            priorities.first().map(|f| f.field_type())
        {
            match definition.field(scope).map(FieldDefinition::field_type) {
                Some(FieldType::BelongsTo { .. }) => {}
                _ => {
                    return Err(ModelError::InvalidSchema(format!(
                        "{}: 排序范围字段 {} 必须是多对一字段",
                        model, scope
                    )))
                }
            }
        }

        Ok(definition)
    }
}
