// ==========================================
// 制造执行系统 - 数据定义注册表
// ==========================================
// 职责: 按 (插件, 模型名) 注册/查找数据定义，校验关联完整性，解析字段路径
// 约束: 构建完成后只读，以 Arc<DataDefinitionService> 在各组件间共享
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::error::{ModelError, ModelResult};
use crate::model::field::FieldDefinition;
use crate::model::types::FieldType;

// ==========================================
// ResolvedPath - 字段路径解析结果
// ==========================================
// "field" 或 "relation.field"（仅支持一层多对一跳转）
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// 跳转所经过的多对一字段
    pub relation: Option<String>,
    /// 最终字段所在的数据定义
    pub definition: Arc<DataDefinition>,
    field_index: usize,
}

impl ResolvedPath {
    pub fn field(&self) -> &FieldDefinition {
        &self.definition.fields()[self.field_index]
    }

    pub fn field_type(&self) -> &FieldType {
        self.field().field_type()
    }
}

// ==========================================
// DataDefinitionService - 注册表
// ==========================================
#[derive(Debug, Default)]
pub struct DataDefinitionService {
    definitions: BTreeMap<DataDefinitionRef, Arc<DataDefinition>>,
}

impl DataDefinitionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册数据定义（同名重复注册报错）
    pub fn register(&mut self, definition: DataDefinition) -> ModelResult<Arc<DataDefinition>> {
        let reference = definition.reference().clone();
        if self.definitions.contains_key(&reference) {
            return Err(ModelError::DuplicateDataDefinition(reference.to_string()));
        }
        debug!(model = %reference, fields = definition.fields().len(), "注册数据定义");
        let definition = Arc::new(definition);
        self.definitions.insert(reference, definition.clone());
        Ok(definition)
    }

    pub fn get(&self, plugin: &str, name: &str) -> ModelResult<Arc<DataDefinition>> {
        self.resolve(&DataDefinitionRef::new(plugin, name))
    }

    pub fn resolve(&self, reference: &DataDefinitionRef) -> ModelResult<Arc<DataDefinition>> {
        self.definitions
            .get(reference)
            .cloned()
            .ok_or_else(|| ModelError::UnknownDataDefinition {
                plugin: reference.plugin.clone(),
                name: reference.name.clone(),
            })
    }

    pub fn contains(&self, reference: &DataDefinitionRef) -> bool {
        self.definitions.contains_key(reference)
    }

    /// 全部数据定义（按插件、模型名排序）
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<DataDefinition>> {
        self.definitions.values()
    }

    /// 校验关联完整性
    ///
    /// # 检查
    /// - 关联字段的目标数据定义已注册
    /// - 一对多字段的 join_field 是目标上指回本定义的多对一字段
    pub fn verify(&self) -> ModelResult<()> {
        for definition in self.definitions.values() {
            for field in definition.fields() {
                match field.field_type() {
                    FieldType::BelongsTo { target, .. } => {
                        self.resolve(target).map_err(|_| {
                            ModelError::InvalidSchema(format!(
                                "{}.{}: 关联目标 {} 未注册",
                                definition.reference(),
                                field.name(),
                                target
                            ))
                        })?;
                    }
                    FieldType::HasMany {
                        target, join_field, ..
                    } => {
                        let child = self.resolve(target).map_err(|_| {
                            ModelError::InvalidSchema(format!(
                                "{}.{}: 关联目标 {} 未注册",
                                definition.reference(),
                                field.name(),
                                target
                            ))
                        })?;
                        let points_back = matches!(
                            child.field(join_field).map(FieldDefinition::field_type),
                            Some(FieldType::BelongsTo { target: back, .. }) if back == definition.reference()
                        );
                        if !points_back {
                            return Err(ModelError::InvalidSchema(format!(
                                "{}.{}: {} 上的 {} 不是指回 {} 的多对一字段",
                                definition.reference(),
                                field.name(),
                                target,
                                join_field,
                                definition.reference()
                            )));
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// 解析字段路径
    ///
    /// # 参数
    /// - path: "field" 或 "relation.field"
    pub fn resolve_path(
        &self,
        definition: &Arc<DataDefinition>,
        path: &str,
    ) -> ModelResult<ResolvedPath> {
        let unknown = |model: &DataDefinition, field: &str| ModelError::UnknownField {
            model: model.reference().to_string(),
            field: field.to_string(),
        };

        match path.split_once('.') {
            None => {
                let field_index = definition
                    .field_index(path)
                    .ok_or_else(|| unknown(definition.as_ref(), path))?;
                Ok(ResolvedPath {
                    relation: None,
                    definition: definition.clone(),
                    field_index,
                })
            }
            Some((relation, field)) => {
                if field.contains('.') {
                    return Err(ModelError::UnsupportedFieldOperation {
                        model: definition.reference().to_string(),
                        field: path.to_string(),
                        message: "仅支持一层关联路径".to_string(),
                    });
                }
                let target = match definition.try_field(relation)?.field_type() {
                    FieldType::BelongsTo { target, .. } => self.resolve(target)?,
                    _ => {
                        return Err(ModelError::UnsupportedFieldOperation {
                            model: definition.reference().to_string(),
                            field: relation.to_string(),
                            message: "关联路径必须经过多对一字段".to_string(),
                        })
                    }
                };
                let field_index = target
                    .field_index(field)
                    .ok_or_else(|| unknown(target.as_ref(), field))?;
                Ok(ResolvedPath {
                    relation: Some(relation.to_string()),
                    definition: target,
                    field_index,
                })
            }
        }
    }

    /// 按路径查询字段类型
    pub fn field_type_by_path(
        &self,
        definition: &Arc<DataDefinition>,
        path: &str,
    ) -> ModelResult<FieldType> {
        Ok(self.resolve_path(definition, path)?.field_type().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Cascade;

    fn product() -> DataDefinition {
        DataDefinition::builder("basic", "product")
            .field(FieldDefinition::new("name", FieldType::String))
            .field(FieldDefinition::new(
                "components",
                FieldType::HasMany {
                    target: DataDefinitionRef::new("basic", "component"),
                    join_field: "product".to_string(),
                    cascade: Cascade::Delete,
                },
            ))
            .build()
            .unwrap()
    }

    fn component() -> DataDefinition {
        DataDefinition::builder("basic", "component")
            .field(FieldDefinition::new("quantity", FieldType::Integer))
            .field(FieldDefinition::new(
                "product",
                FieldType::BelongsTo {
                    target: DataDefinitionRef::new("basic", "product"),
                    lazy: true,
                },
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = DataDefinitionService::new();
        registry.register(product()).unwrap();

        assert!(registry.get("basic", "product").is_ok());
        assert!(matches!(
            registry.get("basic", "missing"),
            Err(ModelError::UnknownDataDefinition { .. })
        ));
        assert!(matches!(
            registry.register(product()),
            Err(ModelError::DuplicateDataDefinition(_))
        ));
    }

    #[test]
    fn test_verify_detects_missing_target() {
        let mut registry = DataDefinitionService::new();
        registry.register(product()).unwrap();
        assert!(matches!(registry.verify(), Err(ModelError::InvalidSchema(_))));

        registry.register(component()).unwrap();
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn test_resolve_one_level_path() {
        let mut registry = DataDefinitionService::new();
        registry.register(product()).unwrap();
        let component = registry.register(component()).unwrap();

        let resolved = registry.resolve_path(&component, "product.name").unwrap();
        assert_eq!(resolved.relation.as_deref(), Some("product"));
        assert_eq!(resolved.field().name(), "name");
        assert_eq!(resolved.definition.name(), "product");

        assert!(registry.resolve_path(&component, "quantity.name").is_err());
        assert!(registry.resolve_path(&component, "product.name.x").is_err());
        assert_eq!(
            registry.field_type_by_path(&component, "quantity").unwrap(),
            FieldType::Integer
        );
    }
}
