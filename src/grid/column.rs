// ==========================================
// 制造执行系统 - 表格列
// ==========================================
// 列 -> 字段路径:
// - 表达式 #rel['field'] -> "rel.field"（仅一层关联）
// - 无表达式且恰好绑定一个字段 -> 该字段
// - 其余情况无字段（不可过滤、不可排序）
// ==========================================

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::model::definition::DataDefinition;
use crate::model::entity::Entity;
use crate::model::error::ModelResult;
use crate::model::types::FieldType;
use crate::repository::data_access::DataAccess;

fn expression_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^#(\w+)\['(\w+)'\]$").ok())
        .as_ref()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridColumn {
    name: String,
    fields: Vec<String>,
    expression: Option<String>,
}

impl GridColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            expression: None,
        }
    }

    /// 单字段列（列名与字段名相同）
    pub fn for_field(field: &str) -> Self {
        Self::new(field).with_field(field)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// 过滤/排序使用的字段路径
    pub fn field_path(&self) -> Option<String> {
        match self.expression.as_deref().map(str::trim) {
            Some(expression) if !expression.is_empty() => {
                let captures = expression_pattern()?.captures(expression)?;
                Some(format!("{}.{}", &captures[1], &captures[2]))
            }
            _ if self.fields.len() == 1 => Some(self.fields[0].clone()),
            _ => None,
        }
    }

    /// 渲染单元格显示值
    ///
    /// 表达式列显示关联实体的字段；多字段列以 ", " 连接各字段显示值
    pub fn value(
        &self,
        access: &dyn DataAccess,
        definition: &DataDefinition,
        entity: &Entity,
        locale: &str,
    ) -> ModelResult<String> {
        if self.expression.as_deref().map(|e| !e.trim().is_empty()).unwrap_or(false) {
            let Some(path) = self.field_path() else {
                debug!(column = %self.name, "不支持的列表达式，显示为空");
                return Ok(String::new());
            };
            return display_path(access, definition, entity, &path, locale);
        }

        let values = self
            .fields
            .iter()
            .map(|field| display_path(access, definition, entity, field, locale))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(values
            .into_iter()
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(", "))
    }
}

/// 按路径（"field" 或 "rel.field"）取字段显示值，空值为 ""
fn display_path(
    access: &dyn DataAccess,
    definition: &DataDefinition,
    entity: &Entity,
    path: &str,
    locale: &str,
) -> ModelResult<String> {
    match path.split_once('.') {
        None => {
            let field = definition.try_field(path)?;
            Ok(entity
                .field(path)
                .map(|value| field.field_type().to_display_string(value, locale))
                .unwrap_or_default())
        }
        Some((relation, field_name)) => {
            let FieldType::BelongsTo { target, .. } = definition.try_field(relation)?.field_type() else {
                return Ok(String::new());
            };
            let Some(reference) = entity.belongs_to_field(relation) else {
                return Ok(String::new());
            };
            let target_definition = access.definition(target)?;
            let field = target_definition.try_field(field_name)?;
            let related = match reference.get()? {
                Some(related) => related,
                None => return Ok(String::new()),
            };
            Ok(related
                .field(field_name)
                .map(|value| field.field_type().to_display_string(value, locale))
                .unwrap_or_default())
        }
    }
}
