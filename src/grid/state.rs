// ==========================================
// 制造执行系统 - 表格组件状态
// ==========================================
// 职责: 单一实体集合上的过滤/排序/分页视图，可按父实体限定范围
// - 状态从 JSON 恢复（initialize_context / initialize_content）
// - 渲染时按需查询（render_content）
// - 事件: refresh / select / remove / moveUp / moveDown
// 红线: 有范围字段但未设置父实体ID时不查询，表格禁用
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::grid::column::GridColumn;
use crate::i18n;
use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::entity::Entity;
use crate::model::error::{ModelError, ModelResult};
use crate::model::types::FieldType;
use crate::repository::data_access::DataAccess;
use crate::search::criteria::SearchCriteriaBuilder;
use crate::search::restriction::Restrictions;
use crate::search::result::corrected_first_result;

pub const JSON_SELECTED_ENTITY_ID: &str = "selectedEntityId";
pub const JSON_BELONGS_TO_ENTITY_ID: &str = "belongsToEntityId";
pub const JSON_FIRST_ENTITY: &str = "firstEntity";
pub const JSON_MAX_ENTITIES: &str = "maxEntities";
pub const JSON_TOTAL_ENTITIES: &str = "totalEntities";
pub const JSON_ORDER: &str = "order";
pub const JSON_ORDER_COLUMN: &str = "column";
pub const JSON_ORDER_DIRECTION: &str = "direction";
pub const JSON_FILTERS: &str = "filters";
pub const JSON_FILTERS_ENABLED: &str = "filtersEnabled";
pub const JSON_ENTITIES: &str = "entities";

pub const EVENT_REFRESH: &str = "refresh";
pub const EVENT_SELECT: &str = "select";
pub const EVENT_REMOVE: &str = "remove";
pub const EVENT_MOVE_UP: &str = "moveUp";
pub const EVENT_MOVE_DOWN: &str = "moveDown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMessage {
    pub message: String,
    pub message_type: MessageType,
}

pub struct GridState {
    access: Arc<dyn DataAccess>,
    definition: Arc<DataDefinition>,
    translation_path: String,
    locale: String,
    scope_field: Option<String>,
    columns: BTreeMap<String, GridColumn>,

    selected_entity_id: Option<i64>,
    scope_entity_id: Option<i64>,
    first_result: usize,
    max_results: usize,
    filters_enabled: bool,
    order_column: Option<String>,
    order_direction: Option<String>,
    filters: BTreeMap<String, String>,
    enabled: bool,

    entities: Option<Vec<Entity>>,
    total_entities: usize,
    messages: Vec<GridMessage>,
}

impl GridState {
    pub fn new(
        access: Arc<dyn DataAccess>,
        reference: &DataDefinitionRef,
        columns: Vec<GridColumn>,
    ) -> ModelResult<Self> {
        let definition = access.definition(reference)?;
        let locale = access.locale().to_string();
        Ok(Self {
            translation_path: format!("{}.{}.grid", reference.plugin, reference.name),
            access,
            definition,
            locale,
            scope_field: None,
            columns: columns.into_iter().map(|c| (c.name().to_string(), c)).collect(),
            selected_entity_id: None,
            scope_entity_id: None,
            first_result: 0,
            max_results: usize::MAX,
            filters_enabled: true,
            order_column: None,
            order_direction: None,
            filters: BTreeMap::new(),
            enabled: true,
            entities: None,
            total_entities: 0,
            messages: Vec::new(),
        })
    }

    /// 设置范围字段（必须为多对一字段）
    pub fn with_scope_field(mut self, field: &str) -> ModelResult<Self> {
        match self.definition.try_field(field)?.field_type() {
            FieldType::BelongsTo { .. } => {
                self.scope_field = Some(field.to_string());
                Ok(self)
            }
            _ => Err(ModelError::UnsupportedFieldOperation {
                model: self.definition.reference().to_string(),
                field: field.to_string(),
                message: "表格范围字段必须为多对一字段".to_string(),
            }),
        }
    }

    /// 默认排序
    pub fn with_order(mut self, column: &str, direction: &str) -> Self {
        self.order_column = Some(column.to_string());
        self.order_direction = Some(direction.to_string());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_translation_path(mut self, path: &str) -> Self {
        self.translation_path = path.to_string();
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    // ===== 读取状态 =====

    pub fn selected_entity_id(&self) -> Option<i64> {
        self.selected_entity_id
    }

    pub fn set_selected_entity_id(&mut self, id: Option<i64>) {
        self.selected_entity_id = id;
    }

    pub fn scope_entity_id(&self) -> Option<i64> {
        self.scope_entity_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn total_entities(&self) -> usize {
        self.total_entities
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn entities(&self) -> Option<&[Entity]> {
        self.entities.as_deref()
    }

    pub fn messages(&self) -> &[GridMessage] {
        &self.messages
    }

    // ===== JSON 状态恢复 =====

    /// 恢复上下文（父实体ID）
    pub fn initialize_context(&mut self, json: &Value) -> ModelResult<()> {
        let object = as_object(json)?;
        if object.contains_key(JSON_BELONGS_TO_ENTITY_ID) {
            let id = read_i64(object, JSON_BELONGS_TO_ENTITY_ID)?;
            self.on_scope_entity_id_change(id)?;
        }
        Ok(())
    }

    /// 恢复内容状态（选中、分页、过滤、排序）
    pub fn initialize_content(&mut self, json: &Value) -> ModelResult<()> {
        let object = as_object(json)?;

        if let Some(id) = read_i64(object, JSON_SELECTED_ENTITY_ID)? {
            self.selected_entity_id = Some(id);
        }
        if let Some(id) = read_i64(object, JSON_BELONGS_TO_ENTITY_ID)? {
            self.scope_entity_id = Some(id);
        }
        if let Some(first) = read_usize(object, JSON_FIRST_ENTITY)? {
            self.first_result = first;
        }
        if let Some(max) = read_usize(object, JSON_MAX_ENTITIES)? {
            self.max_results = max;
        }
        if let Some(enabled) = read_bool(object, JSON_FILTERS_ENABLED)? {
            self.filters_enabled = enabled;
        }
        if let Some(order) = object.get(JSON_ORDER).filter(|v| !v.is_null()) {
            let order = as_object(order)?;
            if let (Some(column), Some(direction)) = (
                read_string(order, JSON_ORDER_COLUMN)?,
                read_string(order, JSON_ORDER_DIRECTION)?,
            ) {
                self.order_column = Some(column);
                self.order_direction = Some(direction);
            }
        }
        // 带 filters 键时整体替换（null 或 {} 清空过滤）
        if let Some(filters) = object.get(JSON_FILTERS) {
            self.filters.clear();
            let empty = Map::new();
            let filters = if filters.is_null() { &empty } else { as_object(filters)? };
            for column in filters.keys() {
                if let Some(value) = read_string(filters, column)? {
                    self.filters.insert(column.clone(), value);
                }
            }
        }

        if self.scope_field.is_some() && self.scope_entity_id.is_none() {
            self.enabled = false;
        }
        self.entities = None;
        Ok(())
    }

    /// 父实体变化: 设置范围ID，有ID时启用表格
    pub fn on_scope_entity_id_change(&mut self, scope_entity_id: Option<i64>) -> ModelResult<()> {
        if self.scope_field.is_none() {
            return Err(ModelError::MissingScopeField);
        }
        self.scope_entity_id = scope_entity_id;
        self.enabled = scope_entity_id.is_some();
        self.entities = None;
        Ok(())
    }

    // ===== 查询 =====

    /// 列对应字段的类型（列不可解析时为 None）
    fn field_type(&self, path: &str) -> ModelResult<Option<FieldType>> {
        match path.split_once('.') {
            None => Ok(self.definition.field(path).map(|f| f.field_type().clone())),
            Some((relation, field)) => {
                let Some(FieldType::BelongsTo { target, .. }) =
                    self.definition.field(relation).map(|f| f.field_type())
                else {
                    return Ok(None);
                };
                let target = self.access.definition(target)?;
                Ok(target.field(field).map(|f| f.field_type().clone()))
            }
        }
    }

    fn add_filters(&self, mut criteria: SearchCriteriaBuilder) -> ModelResult<SearchCriteriaBuilder> {
        for (column, value) in &self.filters {
            let Some(path) = self.columns.get(column).and_then(GridColumn::field_path) else {
                debug!(column = %column, "过滤列无对应字段，忽略");
                continue;
            };
            let restriction = match self.field_type(&path)? {
                Some(field_type) if field_type.is_string_like() => {
                    Restrictions::eq(&path, format!("{}*", value))
                }
                Some(FieldType::Boolean) => Restrictions::eq(&path, value == "1"),
                Some(_) => Restrictions::eq(&path, value.as_str()),
                None => {
                    debug!(column = %column, path = %path, "过滤字段不存在，忽略");
                    continue;
                }
            };
            criteria = criteria.restricted_with(restriction);
        }
        Ok(criteria)
    }

    fn add_order(&self, criteria: SearchCriteriaBuilder) -> ModelResult<SearchCriteriaBuilder> {
        let Some(column) = &self.order_column else {
            return Ok(criteria);
        };
        let Some(path) = self.columns.get(column).and_then(GridColumn::field_path) else {
            return Ok(criteria);
        };
        match self.field_type(&path)? {
            Some(field_type) if field_type.is_orderable() => {
                if self.order_direction.as_deref() == Some("asc") {
                    Ok(criteria.order_asc_by(&path))
                } else {
                    Ok(criteria.order_desc_by(&path))
                }
            }
            _ => {
                debug!(column = %column, "排序列不可排序，忽略");
                Ok(criteria)
            }
        }
    }

    /// 重新查询当前页
    pub fn reload(&mut self) -> ModelResult<()> {
        if self.scope_field.is_some() && self.scope_entity_id.is_none() {
            self.entities = Some(Vec::new());
            self.total_entities = 0;
            return Ok(());
        }

        let mut criteria = SearchCriteriaBuilder::new(self.access.clone(), self.definition.reference().clone());
        if let (Some(scope), Some(id)) = (&self.scope_field, self.scope_entity_id) {
            criteria = criteria.restricted_with(Restrictions::belongs_to(scope, id));
        }
        if self.filters_enabled {
            criteria = self.add_filters(criteria)?;
        }
        criteria = self.add_order(criteria)?;

        let mut result = criteria
            .clone()
            .with_first_result(self.first_result)
            .with_max_results(self.max_results)
            .list()?;

        if result.needs_page_correction() {
            let corrected = corrected_first_result(self.first_result, self.max_results, result.total_number_of_entities);
            warn!(
                model = %self.definition.reference(),
                first = self.first_result,
                corrected,
                total = result.total_number_of_entities,
                "分页超出结果范围，修正起始位置后重新查询"
            );
            self.first_result = corrected;
            result = criteria
                .with_first_result(self.first_result)
                .with_max_results(self.max_results)
                .list()?;
        }

        self.total_entities = result.total_number_of_entities;
        self.entities = Some(result.entities);
        Ok(())
    }

    /// 渲染内容 JSON（未加载时先查询）
    pub fn render_content(&mut self) -> ModelResult<Value> {
        if self.entities.is_none() {
            self.reload()?;
        }
        let entities = self
            .entities
            .as_deref()
            .ok_or_else(|| ModelError::InvalidComponentState("表格实体未加载".to_string()))?;

        let mut rendered = Vec::with_capacity(entities.len());
        for entity in entities {
            let mut fields = Map::new();
            for column in self.columns.values() {
                let value = column.value(self.access.as_ref(), &self.definition, entity, &self.locale)?;
                fields.insert(column.name().to_string(), Value::String(value));
            }
            rendered.push(json!({ "id": entity.id(), "fields": fields }));
        }

        let mut content = Map::new();
        content.insert(JSON_SELECTED_ENTITY_ID.to_string(), json!(self.selected_entity_id));
        content.insert(JSON_BELONGS_TO_ENTITY_ID.to_string(), json!(self.scope_entity_id));
        content.insert(JSON_FIRST_ENTITY.to_string(), json!(self.first_result));
        content.insert(JSON_MAX_ENTITIES.to_string(), json!(self.max_results));
        content.insert(JSON_FILTERS_ENABLED.to_string(), json!(self.filters_enabled));
        content.insert(JSON_TOTAL_ENTITIES.to_string(), json!(self.total_entities));
        if let Some(column) = &self.order_column {
            content.insert(
                JSON_ORDER.to_string(),
                json!({ JSON_ORDER_COLUMN: column, JSON_ORDER_DIRECTION: self.order_direction }),
            );
        }
        content.insert(JSON_FILTERS.to_string(), json!(self.filters));
        content.insert(JSON_ENTITIES.to_string(), Value::Array(rendered));
        Ok(Value::Object(content))
    }

    // ===== 事件 =====

    pub fn perform_event(&mut self, event: &str, args: &[String]) -> ModelResult<()> {
        debug!(model = %self.definition.reference(), event, "表格事件");
        match event {
            EVENT_REFRESH => {
                self.entities = None;
                Ok(())
            }
            EVENT_SELECT => {
                if let Some(id) = args.first().and_then(|a| a.trim().parse::<i64>().ok()) {
                    self.selected_entity_id = Some(id);
                }
                Ok(())
            }
            EVENT_REMOVE => self.remove_selected_entity(),
            EVENT_MOVE_UP => self.move_selected_entity(-1),
            EVENT_MOVE_DOWN => self.move_selected_entity(1),
            other => Err(ModelError::UnknownEvent(other.to_string())),
        }
    }

    fn remove_selected_entity(&mut self) -> ModelResult<()> {
        let reference = self.definition.reference().clone();
        let existing = match self.selected_entity_id {
            Some(id) => self.access.get(&reference, id)?,
            None => None,
        };
        match existing.and_then(|entity| entity.id()) {
            Some(id) => {
                self.access.delete(&reference, id)?;
                info!(model = %reference, id, "表格删除选中实体");
                self.add_message("deleteMessage", MessageType::Success);
            }
            None => self.add_message("entityNotFound", MessageType::Failure),
        }
        self.selected_entity_id = None;
        self.entities = None;
        Ok(())
    }

    fn move_selected_entity(&mut self, offset: i64) -> ModelResult<()> {
        let Some(id) = self.selected_entity_id else {
            self.add_message("entityNotFound", MessageType::Failure);
            return Ok(());
        };
        let moved = self.access.move_entity(self.definition.reference(), id, offset);
        match moved {
            Ok(()) => self.add_message("moveMessage", MessageType::Success),
            Err(ModelError::EntityNotFound { .. }) => self.add_message("entityNotFound", MessageType::Failure),
            Err(e) => return Err(e),
        }
        self.entities = None;
        Ok(())
    }

    /// 消息键依次尝试 {translation_path}.{key} 与 core.message.{key}
    fn add_message(&mut self, key: &str, message_type: MessageType) {
        let own = format!("{}.{}", self.translation_path, key);
        let core = format!("core.message.{}", key);
        let message = i18n::translate_first(&[own.as_str(), core.as_str()], &self.locale);
        self.messages.push(GridMessage { message, message_type });
    }
}

// ===== JSON 读取辅助 =====

fn as_object(json: &Value) -> ModelResult<&Map<String, Value>> {
    json.as_object()
        .ok_or_else(|| ModelError::InvalidComponentState(format!("表格状态必须为 JSON 对象: {}", json)))
}

fn invalid(key: &str, value: &Value) -> ModelError {
    ModelError::InvalidComponentState(format!("{} 取值无效: {}", key, value))
}

/// 读取整数（接受数字或数字字符串；缺失或 null 为 None）
fn read_i64(object: &Map<String, Value>, key: &str) -> ModelResult<Option<i64>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(key, &Value::Number(n.clone()))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| invalid(key, &Value::String(s.clone()))),
        Some(other) => Err(invalid(key, other)),
    }
}

/// 读取非负整数（分页参数）
fn read_usize(object: &Map<String, Value>, key: &str) -> ModelResult<Option<usize>> {
    let parsed = match object.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match parsed {
        Some(n) => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
        None => Err(invalid(key, object.get(key).unwrap_or(&Value::Null))),
    }
}

fn read_bool(object: &Map<String, Value>, key: &str) -> ModelResult<Option<bool>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s == "true" => Ok(Some(true)),
        Some(Value::String(s)) if s == "false" => Ok(Some(false)),
        Some(other) => Err(invalid(key, other)),
    }
}

/// 读取字符串（数字按文本处理）
fn read_string(object: &Map<String, Value>, key: &str) -> ModelResult<Option<String>> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if *b { "1" } else { "0" }.to_string())),
        Some(other) => Err(invalid(key, other)),
    }
}
