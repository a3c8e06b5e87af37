// ==========================================
// 制造执行系统 - 钩子定义与注册表
// ==========================================
// 职责: 自定义校验钩子、保存钩子的类型与按名注册
// 说明: 声明式模型配置通过名称引用钩子（"plugin.hookName"）
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::definition::DataDefinition;
use crate::model::entity::Entity;
use crate::model::error::{ModelError, ModelResult};
use crate::model::field::FieldDefinition;
use crate::model::value::FieldValue;

/// 字段自定义校验钩子（返回 false 表示校验失败）
pub type FieldHook = Arc<dyn Fn(&FieldDefinition, &FieldValue) -> bool + Send + Sync>;

/// 实体自定义校验钩子（返回 false 表示校验失败）
pub type EntityHook = Arc<dyn Fn(&DataDefinition, &Entity) -> bool + Send + Sync>;

/// 保存钩子（create / update / save 时调用，可修改实体）
pub type SaveHook = Arc<dyn Fn(&DataDefinition, &mut Entity) + Send + Sync>;

// ==========================================
// HookRegistry - 钩子注册表
// ==========================================
#[derive(Default, Clone)]
pub struct HookRegistry {
    field_hooks: HashMap<String, FieldHook>,
    entity_hooks: HashMap<String, EntityHook>,
    save_hooks: HashMap<String, SaveHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_field_hook<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: Fn(&FieldDefinition, &FieldValue) -> bool + Send + Sync + 'static,
    {
        self.field_hooks.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_entity_hook<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: Fn(&DataDefinition, &Entity) -> bool + Send + Sync + 'static,
    {
        self.entity_hooks.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_save_hook<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: Fn(&DataDefinition, &mut Entity) + Send + Sync + 'static,
    {
        self.save_hooks.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn field_hook(&self, name: &str) -> ModelResult<FieldHook> {
        self.field_hooks
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownHook(name.to_string()))
    }

    pub fn entity_hook(&self, name: &str) -> ModelResult<EntityHook> {
        self.entity_hooks
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownHook(name.to_string()))
    }

    pub fn save_hook(&self, name: &str) -> ModelResult<SaveHook> {
        self.save_hooks
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownHook(name.to_string()))
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self
            .field_hooks
            .keys()
            .chain(self.entity_hooks.keys())
            .chain(self.save_hooks.keys())
            .collect();
        names.sort();
        f.debug_struct("HookRegistry").field("hooks", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_hook() {
        let mut registry = HookRegistry::new();
        registry.register_field_hook("basic.positive", |_, value| {
            value.as_integer().map(|v| v > 0).unwrap_or(false)
        });

        assert!(registry.field_hook("basic.positive").is_ok());
        assert!(matches!(
            registry.field_hook("basic.missing"),
            Err(ModelError::UnknownHook(name)) if name == "basic.missing"
        ));
        assert!(registry.entity_hook("basic.positive").is_err());
    }
}
