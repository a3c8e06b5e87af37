// ==========================================
// 制造执行系统 - 声明式数据模型配置
// ==========================================
// 职责: 从 JSON 描述构建数据定义注册表
// - 字段: 类型、必填、唯一、只读、默认值、枚举取值、关联目标、级联
// - 校验器: length / scale / precision / range / regex / custom
// - 钩子: 按名称引用 HookRegistry 中注册的函数
// 红线: 关联指向未知模型、边界值与字段类型不符时构建失败
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::error::{ModelError, ModelResult};
use crate::model::field::FieldDefinition;
use crate::model::hooks::HookRegistry;
use crate::model::registry::DataDefinitionService;
use crate::model::types::{Cascade, FieldType, ValueClass};
use crate::model::value::FieldValue;
use crate::plugin::{Plugin, PluginResult};
use crate::validators::custom::{CustomEntityValidator, CustomValidator};
use crate::validators::length::{LengthValidator, PrecisionValidator, ScaleValidator};
use crate::validators::pattern::RegexValidator;
use crate::validators::range::RangeValidator;

/// 配置中的取值按此语言解析（与运行语言无关）
const SCHEMA_LOCALE: &str = "en";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub plugins: Vec<PluginSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSchema {
    pub identifier: String,
    #[serde(default = "default_plugin_version")]
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub system: bool,
    /// 依赖插件 -> 版本区间（如 "[1.0,2.0)"）
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub models: Vec<ModelSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    /// 实体级自定义校验（钩子名称）
    #[serde(default)]
    pub validators: Vec<String>,
    #[serde(default)]
    pub hooks: HookSchema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSchema {
    #[serde(default)]
    pub on_create: Vec<String>,
    #[serde(default)]
    pub on_update: Vec<String>,
    #[serde(default)]
    pub on_save: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub required_on_create: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_true")]
    pub persistent: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// enum 取值
    #[serde(default)]
    pub values: Vec<String>,
    /// belongsTo / hasMany 目标: "plugin.model" 或同插件内 "model"
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default = "default_true")]
    pub lazy: bool,
    #[serde(default)]
    pub join_field: Option<String>,
    #[serde(default)]
    pub cascade: Cascade,
    /// priority 排序范围字段
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidatorSchema {
    Length {
        min: Option<u32>,
        is: Option<u32>,
        max: Option<u32>,
        message: Option<String>,
    },
    Scale {
        min: Option<u32>,
        is: Option<u32>,
        max: Option<u32>,
        message: Option<String>,
    },
    Precision {
        min: Option<u32>,
        is: Option<u32>,
        max: Option<u32>,
        message: Option<String>,
    },
    Range {
        from: Option<serde_json::Value>,
        to: Option<serde_json::Value>,
        #[serde(default = "default_true")]
        inclusive: bool,
        message: Option<String>,
    },
    Regex {
        pattern: String,
        message: Option<String>,
    },
    Custom {
        hook: String,
        message: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

fn default_plugin_version() -> String {
    "1.0.0".to_string()
}

impl SchemaConfig {
    pub fn from_json(content: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 构建数据定义注册表（并校验关联完整性）
    pub fn build(&self, hooks: &HookRegistry) -> ModelResult<DataDefinitionService> {
        let known: BTreeSet<DataDefinitionRef> = self
            .plugins
            .iter()
            .flat_map(|p| p.models.iter().map(|m| DataDefinitionRef::new(&p.identifier, &m.name)))
            .collect();

        let mut registry = DataDefinitionService::new();
        for plugin in &self.plugins {
            for model in &plugin.models {
                let definition = build_model(&plugin.identifier, model, &known, hooks)?;
                registry.register(definition)?;
            }
        }
        registry.verify()?;

        info!(models = known.len(), "数据模型配置已构建");
        Ok(registry)
    }

    /// 配置中声明的插件（状态为 Unknown，由 PluginManager 初始化）
    pub fn build_plugins(&self) -> PluginResult<Vec<Plugin>> {
        self.plugins
            .iter()
            .map(|schema| {
                let mut builder = Plugin::builder(&schema.identifier).with_version(&schema.version);
                if let Some(name) = &schema.name {
                    builder = builder.with_name(name);
                }
                for (identifier, range) in &schema.dependencies {
                    builder = builder.with_dependency(identifier, range);
                }
                if schema.system {
                    builder = builder.as_system();
                }
                builder.build()
            })
            .collect()
    }
}

fn invalid(model: &DataDefinitionRef, field: &str, message: impl std::fmt::Display) -> ModelError {
    ModelError::InvalidSchema(format!("{}.{}: {}", model, field, message))
}

fn resolve_target(
    plugin: &str,
    target: &str,
    known: &BTreeSet<DataDefinitionRef>,
) -> Option<DataDefinitionRef> {
    let reference = match target.split_once('.') {
        Some((plugin, name)) => DataDefinitionRef::new(plugin, name),
        None => DataDefinitionRef::new(plugin, target),
    };
    known.contains(&reference).then_some(reference)
}

fn build_model(
    plugin: &str,
    model: &ModelSchema,
    known: &BTreeSet<DataDefinitionRef>,
    hooks: &HookRegistry,
) -> ModelResult<DataDefinition> {
    let reference = DataDefinitionRef::new(plugin, &model.name);
    let mut builder = DataDefinition::builder(plugin, &model.name);

    for field in &model.fields {
        builder = builder.field(build_field(&reference, plugin, field, known, hooks)?);
    }
    for name in &model.validators {
        builder = builder.entity_validator(CustomEntityValidator::new(name.clone(), hooks.entity_hook(name)?));
    }
    for name in &model.hooks.on_create {
        builder = builder.on_create(hooks.save_hook(name)?);
    }
    for name in &model.hooks.on_update {
        builder = builder.on_update(hooks.save_hook(name)?);
    }
    for name in &model.hooks.on_save {
        builder = builder.on_save(hooks.save_hook(name)?);
    }
    builder.build()
}

fn parse_field_type(
    model: &DataDefinitionRef,
    plugin: &str,
    field: &FieldSchema,
    known: &BTreeSet<DataDefinitionRef>,
) -> ModelResult<FieldType> {
    let target = || -> ModelResult<DataDefinitionRef> {
        let target = field
            .target
            .as_deref()
            .ok_or_else(|| invalid(model, &field.name, "缺少关联目标"))?;
        resolve_target(plugin, target, known)
            .ok_or_else(|| invalid(model, &field.name, format!("关联目标不存在: {}", target)))
    };

    Ok(match field.field_type.as_str() {
        "string" => FieldType::String,
        "text" => FieldType::Text,
        "integer" => FieldType::Integer,
        "decimal" => FieldType::Decimal,
        "boolean" => FieldType::Boolean,
        "date" => FieldType::Date,
        "datetime" => FieldType::DateTime,
        "enum" => {
            if field.values.is_empty() {
                return Err(invalid(model, &field.name, "枚举取值为空"));
            }
            FieldType::Enum(field.values.clone())
        }
        "belongsTo" => FieldType::BelongsTo {
            target: target()?,
            lazy: field.lazy,
        },
        "hasMany" => FieldType::HasMany {
            target: target()?,
            join_field: field
                .join_field
                .clone()
                .ok_or_else(|| invalid(model, &field.name, "缺少 joinField"))?,
            cascade: field.cascade,
        },
        "priority" => FieldType::Priority {
            scope: field.scope.clone(),
        },
        other => return Err(invalid(model, &field.name, format!("未知字段类型: {}", other))),
    })
}

/// 配置取值转换为字段类型的值
fn config_value(
    model: &DataDefinitionRef,
    field: &str,
    field_type: &FieldType,
    value: &serde_json::Value,
) -> ModelResult<Option<FieldValue>> {
    let raw: FieldValue = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Bool(b) => (*b).into(),
        serde_json::Value::String(s) => s.as_str().into(),
        serde_json::Value::Number(n) => n.to_string().into(),
        other => return Err(invalid(model, field, format!("不支持的取值: {}", other))),
    };
    field_type
        .coerce(&raw, SCHEMA_LOCALE)
        .map_err(|e| invalid(model, field, format!("取值 {} 与字段类型不符 ({})", value, e.key)))
}

fn build_field(
    model: &DataDefinitionRef,
    plugin: &str,
    schema: &FieldSchema,
    known: &BTreeSet<DataDefinitionRef>,
    hooks: &HookRegistry,
) -> ModelResult<FieldDefinition> {
    let field_type = parse_field_type(model, plugin, schema, known)?;
    let mut field = FieldDefinition::new(&schema.name, field_type.clone());

    if schema.required {
        field = field.required();
    }
    if schema.required_on_create {
        field = field.required_on_create();
    }
    if schema.unique {
        field = field.unique();
    }
    if schema.read_only {
        field = field.read_only();
    }
    if !schema.persistent {
        field = field.transient();
    }
    if let Some(default) = &schema.default {
        if let Some(value) = config_value(model, &schema.name, &field_type, default)? {
            field = field.with_default(value);
        }
    }

    for validator in &schema.validators {
        field = match validator {
            ValidatorSchema::Length { min, is, max, message } => {
                let mut v = LengthValidator::new(*min, *is, *max);
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
            ValidatorSchema::Scale { min, is, max, message } => {
                let mut v = ScaleValidator::new(*min, *is, *max);
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
            ValidatorSchema::Precision { min, is, max, message } => {
                let mut v = PrecisionValidator::new(*min, *is, *max);
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
            ValidatorSchema::Range {
                from,
                to,
                inclusive,
                message,
            } => {
                if !matches!(
                    field_type.value_class(),
                    ValueClass::Text | ValueClass::Number | ValueClass::Date
                ) {
                    return Err(invalid(model, &schema.name, "该字段类型不支持范围校验"));
                }
                let bound = |value: &Option<serde_json::Value>| -> ModelResult<Option<FieldValue>> {
                    match value {
                        Some(value) => config_value(model, &schema.name, &field_type, value),
                        None => Ok(None),
                    }
                };
                let mut v = RangeValidator::new(bound(from)?, bound(to)?, *inclusive);
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
            ValidatorSchema::Regex { pattern, message } => {
                let mut v = RegexValidator::new(pattern)?;
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
            ValidatorSchema::Custom { hook, message } => {
                let mut v = CustomValidator::new(hook.clone(), hooks.field_hook(hook)?);
                if let Some(message) = message {
                    v = v.with_error_message(message.clone());
                }
                field.with_validator(v)
            }
        };
    }
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{
        "plugins": [{
            "identifier": "basic",
            "version": "1.2.0",
            "system": true,
            "models": [
                {
                    "name": "product",
                    "fields": [
                        { "name": "number", "type": "string", "required": true, "unique": true,
                          "validators": [{ "type": "length", "max": 10 }] },
                        { "name": "quantity", "type": "integer",
                          "validators": [{ "type": "range", "from": 1, "to": "10" }] },
                        { "name": "kind", "type": "enum", "values": ["01component", "02intermediate"],
                          "default": "01component" },
                        { "name": "unit", "type": "belongsTo", "target": "unit" },
                        { "name": "components", "type": "hasMany", "target": "basic.component",
                          "joinField": "product", "cascade": "delete" }
                    ],
                    "validators": ["checkProduct"],
                    "hooks": { "onSave": ["stamp"] }
                },
                { "name": "unit", "fields": [{ "name": "name", "type": "string" }] },
                {
                    "name": "component",
                    "fields": [
                        { "name": "product", "type": "belongsTo", "target": "product" },
                        { "name": "priority", "type": "priority", "scope": "product" }
                    ]
                }
            ]
        }]
    }"#;

    fn hooks() -> HookRegistry {
        let mut hooks = HookRegistry::new();
        hooks
            .register_entity_hook("checkProduct", |_, _| true)
            .register_save_hook("stamp", |_, _| {});
        hooks
    }

    #[test]
    fn test_build_registry() {
        let registry = SchemaConfig::from_json(SCHEMA).unwrap().build(&hooks()).unwrap();

        let product = registry.get("basic", "product").unwrap();
        assert!(product.field("number").unwrap().is_required());
        assert!(product.field("number").unwrap().is_unique());
        assert_eq!(product.field("quantity").unwrap().validators().len(), 1);
        assert_eq!(
            product.field("kind").unwrap().default_value(),
            Some(&FieldValue::Text("01component".to_string()))
        );
        assert_eq!(product.entity_validators().len(), 1);

        let component = registry.get("basic", "component").unwrap();
        assert!(component.priority_field().is_some());
    }

    #[test]
    fn test_build_plugins() {
        let plugins = SchemaConfig::from_json(SCHEMA).unwrap().build_plugins().unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].identifier(), "basic");
        assert_eq!(plugins[0].version().to_string(), "1.2.0");
        assert!(plugins[0].is_system());
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let schema = SCHEMA.replace(r#""target": "unit""#, r#""target": "warehouse""#);
        let err = SchemaConfig::from_json(&schema).unwrap().build(&hooks()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSchema(_)));
    }

    #[test]
    fn test_bound_must_match_field_type() {
        let schema = SCHEMA.replace(r#""to": "10""#, r#""to": "ten""#);
        let err = SchemaConfig::from_json(&schema).unwrap().build(&hooks()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSchema(_)));
    }

    #[test]
    fn test_unknown_hook_is_rejected() {
        let err = SchemaConfig::from_json(SCHEMA)
            .unwrap()
            .build(&HookRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownHook(_)));
    }

    #[test]
    fn test_unknown_field_type() {
        let schema = SCHEMA.replace(r#""type": "priority""#, r#""type": "blob""#);
        let err = SchemaConfig::from_json(&schema).unwrap().build(&hooks()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidSchema(_)));
    }
}
