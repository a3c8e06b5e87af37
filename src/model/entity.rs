// ==========================================
// 制造执行系统 - 动态实体
// ==========================================
// 职责: 字段名 -> 取值 的动态实体，以及多对一关联引用
// 说明: 实体不保存校验错误，校验结果由 ValidationOutcome 返回
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::model::definition::DataDefinitionRef;
use crate::model::entity_list::EntityList;
use crate::model::error::{ModelError, ModelResult};
use crate::model::value::FieldValue;
use crate::repository::data_access::DataAccess;

// ==========================================
// Entity - 动态实体
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: Option<i64>,
    definition: DataDefinitionRef,
    fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    /// 创建未保存的空实体
    pub fn new(definition: DataDefinitionRef) -> Self {
        Self {
            id: None,
            definition,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_id(definition: DataDefinitionRef, id: i64) -> Self {
        Self {
            id: Some(id),
            definition,
            fields: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    pub fn definition(&self) -> &DataDefinitionRef {
        &self.definition
    }

    // ===== 字段读写 =====

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// 设置可空字段（None 清空字段）
    pub fn set_field_opt(&mut self, name: &str, value: Option<FieldValue>) {
        match value {
            Some(value) => {
                self.fields.insert(name.to_string(), value);
            }
            None => {
                self.fields.remove(name);
            }
        }
    }

    pub fn clear_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    // ===== 类型化读取 =====

    pub fn string_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    pub fn integer_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(FieldValue::as_integer)
    }

    pub fn decimal_field(&self, name: &str) -> Option<Decimal> {
        self.field(name).and_then(FieldValue::as_decimal)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(FieldValue::as_bool)
    }

    pub fn date_field(&self, name: &str) -> Option<NaiveDate> {
        self.field(name).and_then(FieldValue::as_date)
    }

    pub fn date_time_field(&self, name: &str) -> Option<NaiveDateTime> {
        self.field(name).and_then(FieldValue::as_date_time)
    }

    /// 多对一字段的引用
    pub fn belongs_to_field(&self, name: &str) -> Option<&EntityRef> {
        self.field(name).and_then(FieldValue::as_entity_ref)
    }

    /// 多对一字段的外键ID
    pub fn belongs_to_id(&self, name: &str) -> Option<i64> {
        self.belongs_to_field(name).map(EntityRef::id)
    }

    /// 一对多字段的子实体列表
    pub fn has_many_field(&self, name: &str) -> Option<&EntityList> {
        self.field(name).and_then(FieldValue::as_entity_list)
    }

    /// 复制为未保存实体（去掉ID与一对多字段）
    pub fn copy(&self) -> Entity {
        Entity {
            id: None,
            definition: self.definition.clone(),
            fields: self
                .fields
                .iter()
                .filter(|(_, v)| !matches!(v, FieldValue::HasMany(_)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// 转为 JSON 对象（id + 各字段）
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "id".to_string(),
            self.id.map(serde_json::Value::from).unwrap_or_default(),
        );
        for (name, value) in &self.fields {
            if !matches!(value, FieldValue::HasMany(_)) {
                map.insert(name.clone(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }
}

// ==========================================
// EntityRef - 多对一关联引用（延迟加载）
// ==========================================
// 首次读取时通过 DataAccess 加载，结果在克隆间共享
#[derive(Clone)]
pub struct EntityRef {
    target: DataDefinitionRef,
    id: i64,
    access: Option<Arc<dyn DataAccess>>,
    loaded: Arc<OnceLock<Option<Entity>>>,
}

impl EntityRef {
    /// 创建未绑定数据访问的引用（仅携带外键）
    pub fn new(target: DataDefinitionRef, id: i64) -> Self {
        Self {
            target,
            id,
            access: None,
            loaded: Arc::new(OnceLock::new()),
        }
    }

    /// 创建绑定数据访问的引用
    pub fn attached(target: DataDefinitionRef, id: i64, access: Arc<dyn DataAccess>) -> Self {
        Self {
            target,
            id,
            access: Some(access),
            loaded: Arc::new(OnceLock::new()),
        }
    }

    /// 绑定数据访问（保留已加载的缓存）
    pub fn with_access(mut self, access: Arc<dyn DataAccess>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn target(&self) -> &DataDefinitionRef {
        &self.target
    }

    pub fn is_attached(&self) -> bool {
        self.access.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// 读取被引用实体（首次读取触发加载）
    ///
    /// 被引用实体已删除时返回 Ok(None)
    pub fn get(&self) -> ModelResult<Option<Entity>> {
        if let Some(cached) = self.loaded.get() {
            return Ok(cached.clone());
        }
        let access = self
            .access
            .as_ref()
            .ok_or_else(|| ModelError::DetachedReference {
                model: self.target.to_string(),
                id: self.id,
            })?;
        let entity = access.get(&self.target, self.id)?;
        Ok(self.loaded.get_or_init(|| entity).clone())
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.id == other.id
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("target", &self.target)
            .field("id", &self.id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_ref() -> DataDefinitionRef {
        DataDefinitionRef::new("basic", "product")
    }

    #[test]
    fn test_typed_getters() {
        let mut entity = Entity::new(product_ref());
        entity.set_field("name", "bolt");
        entity.set_field("quantity", 5i64);
        entity.set_field("active", true);

        assert_eq!(entity.string_field("name"), Some("bolt"));
        assert_eq!(entity.integer_field("quantity"), Some(5));
        assert_eq!(entity.decimal_field("quantity"), Some(Decimal::from(5)));
        assert_eq!(entity.bool_field("active"), Some(true));
        assert_eq!(entity.string_field("quantity"), None);
    }

    #[test]
    fn test_set_field_opt_none_clears() {
        let mut entity = Entity::new(product_ref());
        entity.set_field("name", "bolt");
        entity.set_field_opt("name", None);
        assert!(!entity.contains_field("name"));
    }

    #[test]
    fn test_detached_reference_cannot_load() {
        let reference = EntityRef::new(product_ref(), 3);
        assert!(matches!(
            reference.get(),
            Err(ModelError::DetachedReference { id: 3, .. })
        ));
        assert!(!reference.is_loaded());
    }

    #[test]
    fn test_copy_drops_id() {
        let mut entity = Entity::with_id(product_ref(), 9);
        entity.set_field("name", "bolt");
        let copy = entity.copy();
        assert_eq!(copy.id(), None);
        assert_eq!(copy.string_field("name"), Some("bolt"));
    }

    #[test]
    fn test_to_json() {
        let mut entity = Entity::with_id(product_ref(), 2);
        entity.set_field("name", "bolt");
        entity.set_field("parent", EntityRef::new(product_ref(), 1));
        assert_eq!(
            entity.to_json(),
            serde_json::json!({"id": 2, "name": "bolt", "parent": 1})
        );
    }
}
