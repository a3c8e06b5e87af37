// ==========================================
// 制造执行系统 - 数据访问服务
// ==========================================
// 职责: 注册表 + 存储之上的实体读写入口
// - 保存: 类型转换 -> 校验 -> 钩子 -> 排序号分配 -> 持久化 -> 重新加载
// - 删除: 一对多级联（删除子实体或清空外键），排序号前移
// - 查询: 条件取值按字段类型转换，返回的实体绑定延迟加载句柄
// ==========================================

use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::model::definition::{DataDefinition, DataDefinitionRef};
use crate::model::entity::{Entity, EntityRef};
use crate::model::entity_list::EntityList;
use crate::model::error::{ModelError, ModelResult};
use crate::model::outcome::ValidationOutcome;
use crate::model::registry::DataDefinitionService;
use crate::model::types::{Cascade, FieldType};
use crate::model::value::FieldValue;
use crate::repository::store::EntityStore;
use crate::search::criteria::{Order, SearchCriteria, SearchCriteriaBuilder};
use crate::search::restriction::{Restriction, RestrictionOperator, Restrictions};
use crate::search::result::SearchResult;
use crate::validators::pipeline::validate_entity;

// ==========================================
// SaveOutcome - 保存结果
// ==========================================
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// 校验通过时为重新加载的实体，否则为转换后的待保存实体
    pub entity: Entity,
    pub validation: ValidationOutcome,
}

impl SaveOutcome {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }
}

// ==========================================
// DataAccess - 数据访问接口
// ==========================================
pub trait DataAccess: Send + Sync {
    fn definition(&self, reference: &DataDefinitionRef) -> ModelResult<Arc<DataDefinition>>;

    fn get(&self, reference: &DataDefinitionRef, id: i64) -> ModelResult<Option<Entity>>;

    fn execute(&self, criteria: &SearchCriteria) -> ModelResult<SearchResult>;

    /// 保存实体（无ID新建，有ID更新）；校验失败不报错，结果见 SaveOutcome
    fn save(&self, entity: Entity) -> ModelResult<SaveOutcome>;

    /// 删除实体，返回是否存在并已删除
    fn delete(&self, reference: &DataDefinitionRef, id: i64) -> ModelResult<bool>;

    /// 在排序范围内移动实体（offset 为负上移，为正下移）
    fn move_entity(&self, reference: &DataDefinitionRef, id: i64, offset: i64) -> ModelResult<()>;

    fn locale(&self) -> &str;
}

// ==========================================
// DataAccessService
// ==========================================
pub struct DataAccessService {
    registry: Arc<DataDefinitionService>,
    store: Arc<dyn EntityStore>,
    locale: String,
    me: Weak<DataAccessService>,
}

impl DataAccessService {
    pub fn new(
        registry: Arc<DataDefinitionService>,
        store: Arc<dyn EntityStore>,
        locale: impl Into<String>,
    ) -> Arc<Self> {
        let locale = locale.into();
        Arc::new_cyclic(|me| Self {
            registry,
            store,
            locale,
            me: me.clone(),
        })
    }

    pub fn registry(&self) -> &Arc<DataDefinitionService> {
        &self.registry
    }

    /// 校验关联完整性并为全部数据定义准备存储
    pub fn initialize(&self) -> ModelResult<()> {
        self.registry.verify()?;
        for definition in self.registry.definitions() {
            self.store.ensure_schema(definition)?;
        }
        info!(models = self.registry.definitions().count(), "数据访问服务初始化完成");
        Ok(())
    }

    /// 查询构建器
    pub fn find(&self, reference: &DataDefinitionRef) -> ModelResult<SearchCriteriaBuilder> {
        self.registry.resolve(reference)?;
        Ok(SearchCriteriaBuilder::new(self.handle()?, reference.clone()))
    }

    fn handle(&self) -> ModelResult<Arc<dyn DataAccess>> {
        let me: Arc<dyn DataAccess> = self
            .me
            .upgrade()
            .ok_or_else(|| ModelError::InvalidComponentState("数据访问服务已释放".to_string()))?;
        Ok(me)
    }

    /// 为存储返回的实体绑定延迟加载句柄，并补齐一对多列表
    fn hydrate(&self, definition: &DataDefinition, mut entity: Entity) -> Entity {
        let Some(handle) = self.me.upgrade() else {
            return entity;
        };
        let handle: Arc<dyn DataAccess> = handle;
        for field in definition.fields() {
            match field.field_type() {
                FieldType::BelongsTo { .. } => {
                    if let Some(reference) = entity.belongs_to_field(field.name()) {
                        let attached = EntityRef::attached(reference.target().clone(), reference.id(), handle.clone());
                        entity.set_field(field.name(), attached);
                    }
                }
                FieldType::HasMany {
                    target, join_field, ..
                } => {
                    let list = EntityList::new(target.clone(), join_field.clone(), entity.id())
                        .with_access(handle.clone());
                    entity.set_field(field.name(), list);
                }
                _ => {}
            }
        }
        entity
    }

    /// 校验限制条件字段，并把条件取值转换为字段类型
    ///
    /// 取值无法转换时返回 None（查询结果为空）
    fn coerce_criteria(
        &self,
        definition: &Arc<DataDefinition>,
        criteria: &SearchCriteria,
    ) -> ModelResult<Option<SearchCriteria>> {
        let mut coerced = Vec::with_capacity(criteria.restrictions().len());
        for restriction in criteria.restrictions() {
            let Some(path) = restriction.field() else {
                coerced.push(restriction.clone());
                continue;
            };
            let field_type = if path == "id" {
                FieldType::Integer
            } else {
                self.registry.field_type_by_path(definition, path)?
            };
            if !field_type.is_searchable() {
                return Err(ModelError::UnsupportedFieldOperation {
                    model: definition.reference().to_string(),
                    field: path.to_string(),
                    message: "字段不可检索".to_string(),
                });
            }
            if let Restriction::BelongsTo { .. } = restriction {
                if !matches!(field_type, FieldType::BelongsTo { .. }) {
                    return Err(ModelError::UnsupportedFieldOperation {
                        model: definition.reference().to_string(),
                        field: path.to_string(),
                        message: "belongsTo 条件只能用于多对一字段".to_string(),
                    });
                }
            }
            match restriction.clone().coerce(&field_type, &self.locale) {
                Some(restriction) => coerced.push(restriction),
                None => {
                    debug!(restriction = %restriction, "条件取值无法转换，结果为空");
                    return Ok(None);
                }
            }
        }

        if let Some(order) = criteria.order() {
            if order.field != "id" {
                let field_type = self.registry.field_type_by_path(definition, &order.field)?;
                if !field_type.is_orderable() {
                    return Err(ModelError::UnsupportedFieldOperation {
                        model: definition.reference().to_string(),
                        field: order.field.clone(),
                        message: "字段不可排序".to_string(),
                    });
                }
            }
        }

        Ok(Some(criteria.clone().with_restrictions(coerced)))
    }

    // ===== 排序号 =====

    /// 排序范围限制条件（范围字段为空时限定为空值）
    fn priority_scope(scope: &Option<String>, entity: &Entity) -> Option<Restriction> {
        let scope = scope.as_ref()?;
        Some(match entity.belongs_to_id(scope) {
            Some(id) => Restrictions::belongs_to(scope, id),
            None => Restrictions::is_null(scope),
        })
    }

    fn scoped_criteria(definition: &DataDefinition, scope: &Option<String>, entity: &Entity) -> SearchCriteria {
        let criteria = SearchCriteria::new(definition.reference().clone());
        match Self::priority_scope(scope, entity) {
            Some(restriction) => criteria.restricted_with(restriction),
            None => criteria,
        }
    }

    /// 范围内的最大排序号（无记录时为 0）
    fn last_priority(
        &self,
        definition: &Arc<DataDefinition>,
        field: &str,
        scope: &Option<String>,
        entity: &Entity,
    ) -> ModelResult<i64> {
        let criteria = Self::scoped_criteria(definition, scope, entity)
            .restricted_with(Restrictions::is_not_null(field))
            .order_by(Order::desc(field))
            .with_max_results(1);
        let result = self.store.search(definition, &criteria)?;
        Ok(result
            .entities
            .first()
            .and_then(|e| e.integer_field(field))
            .unwrap_or(0))
    }

    /// 新建实体分配排序号: 范围内最大值 + 1
    fn prioritize(&self, definition: &Arc<DataDefinition>, entity: &mut Entity) -> ModelResult<()> {
        let Some(field) = definition.priority_field() else {
            return Ok(());
        };
        let FieldType::Priority { scope } = field.field_type() else {
            return Ok(());
        };
        if entity.field(field.name()).is_some() {
            return Ok(());
        }
        let last = self.last_priority(definition, field.name(), scope, entity)?;
        entity.set_field(field.name(), last + 1);
        Ok(())
    }

    /// 删除实体后，范围内排在其后的实体排序号减一
    fn deprioritize(&self, definition: &Arc<DataDefinition>, removed: &Entity) -> ModelResult<()> {
        let Some(field) = definition.priority_field() else {
            return Ok(());
        };
        let FieldType::Priority { scope } = field.field_type() else {
            return Ok(());
        };
        let Some(priority) = removed.integer_field(field.name()) else {
            return Ok(());
        };
        let criteria = Self::scoped_criteria(definition, scope, removed)
            .restricted_with(Restrictions::gt(field.name(), priority));
        for mut entity in self.store.search(definition, &criteria)?.entities {
            if let Some(p) = entity.integer_field(field.name()) {
                entity.set_field(field.name(), p - 1);
                self.store.update(definition, &entity)?;
            }
        }
        Ok(())
    }

    // ===== 删除 =====

    fn delete_cascade(&self, definition: &Arc<DataDefinition>, id: i64) -> ModelResult<bool> {
        let Some(existing) = self.store.get(definition, id)? else {
            return Ok(false);
        };

        for field in definition.fields() {
            let FieldType::HasMany {
                target,
                join_field,
                cascade,
            } = field.field_type()
            else {
                continue;
            };
            let child_definition = self.registry.resolve(target)?;
            let criteria = SearchCriteria::new(target.clone()).restricted_with(Restrictions::belongs_to(join_field, id));
            let children = self.store.search(&child_definition, &criteria)?.entities;
            for mut child in children {
                let Some(child_id) = child.id() else {
                    continue;
                };
                match cascade {
                    Cascade::Delete => {
                        self.delete_cascade(&child_definition, child_id)?;
                    }
                    Cascade::Nullify => {
                        child.clear_field(join_field);
                        self.store.update(&child_definition, &child)?;
                    }
                }
            }
        }

        let deleted = self.store.delete(definition, id)?;
        if deleted {
            self.deprioritize(definition, &existing)?;
            info!(model = %definition.reference(), id, "实体已删除");
        }
        Ok(deleted)
    }
}

impl DataAccess for DataAccessService {
    fn definition(&self, reference: &DataDefinitionRef) -> ModelResult<Arc<DataDefinition>> {
        self.registry.resolve(reference)
    }

    fn get(&self, reference: &DataDefinitionRef, id: i64) -> ModelResult<Option<Entity>> {
        let definition = self.registry.resolve(reference)?;
        Ok(self
            .store
            .get(&definition, id)?
            .map(|entity| self.hydrate(&definition, entity)))
    }

    fn execute(&self, criteria: &SearchCriteria) -> ModelResult<SearchResult> {
        let definition = self.registry.resolve(criteria.target())?;
        let Some(coerced) = self.coerce_criteria(&definition, criteria)? else {
            return Ok(SearchResult::empty());
        };
        let result = self.store.search(&definition, &coerced)?;
        let entities = result
            .entities
            .into_iter()
            .map(|entity| self.hydrate(&definition, entity))
            .collect();
        Ok(SearchResult::new(entities, result.total_number_of_entities))
    }

    fn save(&self, mut entity: Entity) -> ModelResult<SaveOutcome> {
        let definition = self.registry.resolve(entity.definition())?;

        let existing = match entity.id() {
            Some(id) => Some(self.store.get(&definition, id)?.ok_or_else(|| ModelError::EntityNotFound {
                model: definition.reference().to_string(),
                id,
            })?),
            None => None,
        };

        let access: &dyn DataAccess = self;
        let validation = validate_entity(&definition, &mut entity, existing.as_ref(), Some(access), &self.locale);
        if !validation.is_valid() {
            warn!(
                model = %definition.reference(),
                id = ?entity.id(),
                errors = validation.error_count(),
                "实体校验未通过，未保存"
            );
            return Ok(SaveOutcome { entity, validation });
        }

        let id = match entity.id() {
            None => {
                definition.call_create_hooks(&mut entity);
                definition.call_save_hooks(&mut entity);
                self.prioritize(&definition, &mut entity)?;
                let id = self.store.insert(&definition, &entity)?;
                info!(model = %definition.reference(), id, "实体已创建");
                id
            }
            Some(id) => {
                definition.call_update_hooks(&mut entity);
                definition.call_save_hooks(&mut entity);
                self.store.update(&definition, &entity)?;
                info!(model = %definition.reference(), id, "实体已更新");
                id
            }
        };

        let saved = self
            .store
            .get(&definition, id)?
            .ok_or_else(|| ModelError::EntityNotFound {
                model: definition.reference().to_string(),
                id,
            })?;
        Ok(SaveOutcome {
            entity: self.hydrate(&definition, saved),
            validation,
        })
    }

    fn delete(&self, reference: &DataDefinitionRef, id: i64) -> ModelResult<bool> {
        let definition = self.registry.resolve(reference)?;
        self.delete_cascade(&definition, id)
    }

    fn move_entity(&self, reference: &DataDefinitionRef, id: i64, offset: i64) -> ModelResult<()> {
        let definition = self.registry.resolve(reference)?;
        let field = definition
            .priority_field()
            .ok_or_else(|| ModelError::MissingPriorityField(reference.to_string()))?;
        let FieldType::Priority { scope } = field.field_type() else {
            return Err(ModelError::MissingPriorityField(reference.to_string()));
        };
        let name = field.name();

        let mut entity = self
            .store
            .get(&definition, id)?
            .ok_or_else(|| ModelError::EntityNotFound {
                model: reference.to_string(),
                id,
            })?;
        let Some(current) = entity.integer_field(name) else {
            warn!(model = %reference, id, "实体没有排序号，忽略移动");
            return Ok(());
        };

        let last = self.last_priority(&definition, name, scope, &entity)?;
        let target = (current + offset).clamp(1, last.max(1));
        if target == current {
            return Ok(());
        }

        let (low, high, shift) = if target > current {
            (current + 1, target, -1)
        } else {
            (target, current - 1, 1)
        };
        let criteria = Self::scoped_criteria(&definition, scope, &entity)
            .restricted_with(Restrictions::ge(name, low))
            .restricted_with(Restrictions::le(name, high))
            .restricted_with(Restrictions::id_restriction(id, RestrictionOperator::Ne));
        for mut other in self.store.search(&definition, &criteria)?.entities {
            if let Some(p) = other.integer_field(name) {
                other.set_field(name, p + shift);
                self.store.update(&definition, &other)?;
            }
        }

        entity.set_field(name, FieldValue::Integer(target));
        self.store.update(&definition, &entity)?;
        info!(model = %reference, id, from = current, to = target, "实体排序已移动");
        Ok(())
    }

    fn locale(&self) -> &str {
        &self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldDefinition;
    use crate::repository::memory_store::MemoryEntityStore;
    use crate::validators::range::RangeValidator;

    fn setup() -> Arc<DataAccessService> {
        let mut registry = DataDefinitionService::new();
        registry
            .register(
                DataDefinition::builder("basic", "product")
                    .field(FieldDefinition::new("name", FieldType::String).required().unique())
                    .field(
                        FieldDefinition::new("quantity", FieldType::Integer)
                            .with_validator(RangeValidator::new(Some(1i64.into()), Some(10i64.into()), true)),
                    )
                    .field(FieldDefinition::new(
                        "operations",
                        FieldType::HasMany {
                            target: DataDefinitionRef::new("basic", "operation"),
                            join_field: "product".to_string(),
                            cascade: Cascade::Delete,
                        },
                    ))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                DataDefinition::builder("basic", "operation")
                    .field(FieldDefinition::new("name", FieldType::String))
                    .field(FieldDefinition::new(
                        "product",
                        FieldType::BelongsTo {
                            target: DataDefinitionRef::new("basic", "product"),
                            lazy: true,
                        },
                    ))
                    .field(FieldDefinition::new(
                        "priority",
                        FieldType::Priority {
                            scope: Some("product".to_string()),
                        },
                    ))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let registry = Arc::new(registry);
        let store = Arc::new(MemoryEntityStore::new(registry.clone()));
        let service = DataAccessService::new(registry, store, "en");
        service.initialize().unwrap();
        service
    }

    fn product_ref() -> DataDefinitionRef {
        DataDefinitionRef::new("basic", "product")
    }

    fn operation_ref() -> DataDefinitionRef {
        DataDefinitionRef::new("basic", "operation")
    }

    fn save_product(service: &DataAccessService, name: &str) -> Entity {
        let mut product = Entity::new(product_ref());
        product.set_field("name", name);
        product.set_field("quantity", "5");
        let outcome = service.save(product).unwrap();
        assert!(outcome.is_valid(), "{:?}", outcome.validation);
        outcome.entity
    }

    fn save_operation(service: &DataAccessService, product_id: i64, name: &str) -> i64 {
        let mut operation = Entity::new(operation_ref());
        operation.set_field("name", name);
        operation.set_field("product", product_id);
        service.save(operation).unwrap().entity.id().unwrap()
    }

    #[test]
    fn test_save_converts_and_reloads() {
        let service = setup();
        let product = save_product(&service, "bolt");

        assert!(product.id().is_some());
        assert_eq!(product.integer_field("quantity"), Some(5));
        let operations = product.has_many_field("operations").unwrap();
        assert!(operations.is_empty().unwrap());
    }

    #[test]
    fn test_invalid_entity_is_not_persisted() {
        let service = setup();
        let mut product = Entity::new(product_ref());
        product.set_field("quantity", "11");

        let outcome = service.save(product).unwrap();
        assert!(!outcome.is_valid());
        assert_eq!(outcome.validation.field_errors("name").len(), 1);
        assert_eq!(outcome.validation.field_errors("quantity").len(), 1);
        assert_eq!(
            service.find(&product_ref()).unwrap().list().unwrap().total_number_of_entities,
            0
        );
    }

    #[test]
    fn test_unique_field() {
        let service = setup();
        let first = save_product(&service, "bolt");

        let mut duplicate = Entity::new(product_ref());
        duplicate.set_field("name", "bolt");
        let outcome = service.save(duplicate).unwrap();
        assert_eq!(
            outcome.validation.field_errors("name")[0].key,
            "core.validate.field.error.duplicated"
        );

        let mut same = first.clone();
        same.set_field("quantity", 6i64);
        assert!(service.save(same).unwrap().is_valid());
    }

    #[test]
    fn test_lazy_relations_and_priorities() {
        let service = setup();
        let product = save_product(&service, "bolt");
        let product_id = product.id().unwrap();
        let first = save_operation(&service, product_id, "cut");
        let second = save_operation(&service, product_id, "drill");

        let loaded = service.get(&operation_ref(), second).unwrap().unwrap();
        assert_eq!(loaded.integer_field("priority"), Some(2));
        let parent = loaded.belongs_to_field("product").unwrap().get().unwrap().unwrap();
        assert_eq!(parent.string_field("name"), Some("bolt"));

        let list = product.has_many_field("operations").unwrap();
        assert_eq!(list.len().unwrap(), 2);

        service.move_entity(&operation_ref(), second, -1).unwrap();
        let moved = service.get(&operation_ref(), second).unwrap().unwrap();
        let other = service.get(&operation_ref(), first).unwrap().unwrap();
        assert_eq!(moved.integer_field("priority"), Some(1));
        assert_eq!(other.integer_field("priority"), Some(2));
    }

    #[test]
    fn test_missing_reference_is_rejected() {
        let service = setup();
        let mut operation = Entity::new(operation_ref());
        operation.set_field("product", 77i64);

        let outcome = service.save(operation).unwrap();
        assert_eq!(
            outcome.validation.field_errors("product")[0].key,
            "core.validate.field.error.referenceNotFound"
        );
    }

    #[test]
    fn test_delete_cascades_children() {
        let service = setup();
        let product = save_product(&service, "bolt");
        let product_id = product.id().unwrap();
        save_operation(&service, product_id, "cut");
        save_operation(&service, product_id, "drill");

        assert!(service.delete(&product_ref(), product_id).unwrap());
        assert_eq!(
            service.find(&operation_ref()).unwrap().list().unwrap().total_number_of_entities,
            0
        );
        assert!(!service.delete(&product_ref(), product_id).unwrap());
    }

    #[test]
    fn test_uncoercible_restriction_yields_empty_result() {
        let service = setup();
        save_product(&service, "bolt");

        let result = service
            .find(&product_ref())
            .unwrap()
            .restricted_with(Restrictions::eq("quantity", "abc"))
            .list()
            .unwrap();
        assert_eq!(result.total_number_of_entities, 0);

        let unknown = service
            .find(&product_ref())
            .unwrap()
            .restricted_with(Restrictions::eq("missing", "abc"))
            .list();
        assert!(matches!(unknown, Err(ModelError::UnknownField { .. })));
    }
}
